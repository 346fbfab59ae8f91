use std::fs;

use anyhow::Result;
use insta::assert_snapshot;
use postbuild::app::pipeline::Pipeline;
use postbuild::domain::model::RunConfig;
use postbuild::infra::config::Config;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>Replacer</title>
    <!-- inject:css -->
    <link rel="stylesheet" href="/client/css/styles.css">
    <!-- endinject -->
  </head>
  <body>
<!-- remove:development -->
    <script src="lib/profiler.js"></script>
<!-- endremove -->
<!-- keep:development -->
    <script src="lib/dev_profiler.js"></script>
<!-- endkeep -->
    <!-- inject:js -->
    <script src="/client/js/build.js"></script>
    <!-- endinject -->
<!-- remove:production -->
    <script src="http://localhost:35729/livereload.js"></script>
<!-- endremove -->
<!-- keep:production -->
    <meta name="build" content="production">
<!-- endkeep -->
  </body>
</html>
<!-- inject:git-hash -->"#;

#[test]
fn production_build_renders() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path();
    fs::create_dir_all(root.join("static/css"))?;
    fs::create_dir_all(root.join("static/js/vendor"))?;
    fs::write(root.join("static/css/b.css"), "")?;
    fs::write(root.join("static/css/a.css"), "")?;
    fs::write(root.join("static/js/app.js"), "")?;
    fs::write(root.join("static/js/vendor/lib.js"), "")?;

    let pipeline = Pipeline::from_config(root.to_path_buf(), &Config::default())?;
    let run = RunConfig {
        css: vec!["static/css".into()],
        js: vec!["static/js/**/*.js".into()],
        environment: Some("production".into()),
        revision: Some("4b825dc642cb6eb9a060e54bf8d69288fbee4904".into()),
        ..RunConfig::default()
    };

    let output = pipeline.process(TEMPLATE, &run)?;
    assert_snapshot!("production_build", output);
    Ok(())
}
