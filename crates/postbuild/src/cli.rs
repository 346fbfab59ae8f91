//! Command-line entry point.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::Level;

use crate::app::pipeline::Pipeline;
use crate::domain::model::RunConfig;
use crate::infra::config::Config;
use crate::infra::git;

/// Inject assets, strip environment blocks and stamp the git revision into built HTML.
#[derive(Debug, Parser)]
#[command(name = "postbuild", author, version, about, long_about = None)]
pub struct Cli {
    /// HTML document to process.
    #[arg(short = 'i', long = "input", value_name = "PATH")]
    pub input: PathBuf,

    /// Where to write the processed document.
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: PathBuf,

    /// Stylesheets for inject:css: a file, a directory, or a glob. Repeatable.
    #[arg(short = 'c', long = "css", value_name = "SPEC")]
    pub css: Vec<String>,

    /// Scripts for inject:js: a file, a directory, or a glob. Repeatable.
    #[arg(short = 'j', long = "js", value_name = "SPEC")]
    pub js: Vec<String>,

    /// Prefix stripped from injected paths; switches injection to a quoted file list.
    #[arg(short = 'g', long = "ignore", value_name = "PREFIX")]
    pub ignore: Option<String>,

    /// Environment label selecting which remove/keep blocks apply.
    #[arg(short = 'r', long = "environment", value_name = "LABEL")]
    pub environment: Option<String>,

    /// Replace inject:git-hash markers with the HEAD revision.
    #[arg(short = 'H', long = "git-hash")]
    pub git_hash: bool,

    /// Log more; repeat for debug output.
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Maximum level passed to the log subscriber.
    pub fn log_level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::ERROR,
            (false, 0) => Level::WARN,
            (false, 1) => Level::INFO,
            (false, _) => Level::DEBUG,
        }
    }

    /// Process the input document and write the result.
    pub fn run(self) -> Result<()> {
        let config = Config::load()?;
        let root = env::current_dir().context("unable to determine working directory")?;
        let run = self.run_config(&config, &root)?;

        let document = fs::read_to_string(&self.input)
            .with_context(|| format!("failed to read input {}", self.input.display()))?;

        let pipeline = Pipeline::from_config(root, &config)?;
        let output = pipeline
            .process(&document, &run)
            .with_context(|| format!("failed to process {}", self.input.display()))?;

        write_output(&self.output, &output)?;
        tracing::info!(output = %self.output.display(), "wrote document");
        Ok(())
    }

    /// Combine flags with configuration defaults. The revision is looked up here, once.
    pub fn run_config(&self, config: &Config, root: &Path) -> Result<RunConfig> {
        let revision = if self.git_hash {
            Some(git::revision_for_path(root, config.defaults.revision.as_deref())?)
        } else {
            None
        };

        Ok(RunConfig {
            css: self.css.clone(),
            js: self.js.clone(),
            ignore_prefix: self.ignore.clone(),
            environment: self
                .environment
                .clone()
                .or_else(|| config.defaults.environment.clone()),
            revision,
        })
    }
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory: {}", parent.display()))?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write output to {}", path.display()))
}
