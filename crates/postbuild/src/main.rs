use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = postbuild::cli::Cli::parse();
    postbuild::init(cli.log_level());

    cli.run()
}
