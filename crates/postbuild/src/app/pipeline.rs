//! End-to-end processing of one document.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::app::render::Renderer;
use crate::app::resolve::{AssetResolver, ResolverConfig};
use crate::app::rewrite::{RewriteContext, rewrite};
use crate::app::scan::scan;
use crate::domain::errors::DomainError;
use crate::domain::model::{AssetKind, AssetSpec, Directive, DirectiveKind, RunConfig};
use crate::infra::config::Config;

/// Asset lists resolved for one run; `None` for a kind with no specs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAssets {
    pub css: Option<AssetSpec>,
    pub js: Option<AssetSpec>,
}

/// Resolves assets, scans the document, and rewrites it.
pub struct Pipeline {
    resolver: AssetResolver,
    renderer: Renderer,
}

impl Pipeline {
    pub fn new(resolver: AssetResolver, renderer: Renderer) -> Self {
        Self { resolver, renderer }
    }

    /// Build a pipeline resolving relative specs against `root`.
    pub fn from_config(root: PathBuf, config: &Config) -> Result<Self> {
        let resolver = AssetResolver::new(ResolverConfig::from_root(root, config))
            .context("invalid [ignore] configuration")?;
        let renderer = Renderer::from_config(config).context("invalid [render] configuration")?;
        Ok(Self::new(resolver, renderer))
    }

    /// Resolve the CSS and JS specs of `run`.
    pub fn resolve_assets(&self, run: &RunConfig) -> Result<ResolvedAssets, DomainError> {
        Ok(ResolvedAssets {
            css: self.resolve_kind(run, AssetKind::Stylesheet)?,
            js: self.resolve_kind(run, AssetKind::Script)?,
        })
    }

    fn resolve_kind(
        &self,
        run: &RunConfig,
        kind: AssetKind,
    ) -> Result<Option<AssetSpec>, DomainError> {
        let specs = run.specs(kind);
        if specs.is_empty() {
            return Ok(None);
        }
        let spec = self
            .resolver
            .resolve_all(specs, kind, run.ignore_prefix.as_deref())?;
        Ok(Some(spec))
    }

    /// Rewrite `document` for `run`. Nothing is returned unless every step succeeds.
    pub fn process(&self, document: &str, run: &RunConfig) -> Result<String, DomainError> {
        let assets = self.resolve_assets(run)?;
        self.process_resolved(document, run, &assets)
    }

    /// Rewrite `document` with assets that were already resolved.
    pub fn process_resolved(
        &self,
        document: &str,
        run: &RunConfig,
        assets: &ResolvedAssets,
    ) -> Result<String, DomainError> {
        let directives = scan(document)?;
        warn_unused_assets(&directives, assets);

        let ctx = RewriteContext {
            css: assets.css.as_ref(),
            js: assets.js.as_ref(),
            environment: run.environment.as_deref(),
            revision: run.revision.as_deref(),
            renderer: &self.renderer,
        };
        let output = rewrite(document, &directives, &ctx)?;

        tracing::info!(
            directives = directives.len(),
            stylesheets = assets.css.as_ref().map_or(0, |spec| spec.entries.len()),
            scripts = assets.js.as_ref().map_or(0, |spec| spec.entries.len()),
            environment = run.environment.as_deref().unwrap_or("-"),
            "document rewritten"
        );
        Ok(output)
    }
}

fn warn_unused_assets(directives: &[Directive], assets: &ResolvedAssets) {
    let has = |kind: &DirectiveKind| directives.iter().any(|d| &d.kind == kind);
    if assets.css.is_some() && !has(&DirectiveKind::InjectCss) {
        tracing::warn!("stylesheets were resolved but the document has no inject:css region");
    }
    if assets.js.is_some() && !has(&DirectiveKind::InjectJs) {
        tracing::warn!("scripts were resolved but the document has no inject:js region");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{ResolutionError, ScanError};
    use std::fs;

    const DOCUMENT: &str = "<head>\n  <!-- inject:css -->\n  <!-- endinject -->\n</head>\n<body>\n  <!-- inject:js -->\n  <script src=\"/client/js/build.js\"></script>\n  <!-- endinject -->\n</body>\n<!-- inject:git-hash -->\n";

    fn workspace() -> Result<(tempfile::TempDir, Pipeline)> {
        let temp = tempfile::tempdir()?;
        fs::create_dir_all(temp.path().join("dist"))?;
        fs::write(temp.path().join("dist/app.css"), "")?;
        fs::write(temp.path().join("dist/app.js"), "")?;
        fs::write(temp.path().join("dist/vendor.js"), "")?;
        let pipeline = Pipeline::from_config(temp.path().to_path_buf(), &Config::default())?;
        Ok((temp, pipeline))
    }

    #[test]
    fn unconfigured_kinds_resolve_to_none() -> Result<()> {
        let (_temp, pipeline) = workspace()?;
        let run = RunConfig {
            js: vec!["dist".into()],
            ..RunConfig::default()
        };
        let assets = pipeline.resolve_assets(&run)?;
        assert!(assets.css.is_none());
        assert_eq!(
            assets.js.map(|spec| spec.entries),
            Some(vec!["dist/app.js".to_string(), "dist/vendor.js".to_string()])
        );
        Ok(())
    }

    #[test]
    fn processes_full_document() -> Result<()> {
        let (_temp, pipeline) = workspace()?;
        let run = RunConfig {
            css: vec!["dist".into()],
            js: vec!["dist/*.js".into()],
            revision: Some("abc123".into()),
            ..RunConfig::default()
        };
        let output = pipeline.process(DOCUMENT, &run)?;
        assert_eq!(
            output,
            "<head>\n  <!-- inject:css -->\n  <link rel=\"stylesheet\" href=\"dist/app.css\">\n  <!-- endinject -->\n</head>\n<body>\n  <!-- inject:js -->\n  <script src=\"dist/app.js\"></script>\n  <script src=\"dist/vendor.js\"></script>\n  <!-- endinject -->\n</body>\nabc123\n"
        );
        Ok(())
    }

    #[test]
    fn resolution_failure_aborts() -> Result<()> {
        let (_temp, pipeline) = workspace()?;
        let run = RunConfig {
            css: vec!["missing.css".into()],
            ..RunConfig::default()
        };
        assert!(matches!(
            pipeline.process(DOCUMENT, &run),
            Err(DomainError::Resolution(ResolutionError::NotFound { .. }))
        ));
        Ok(())
    }

    #[test]
    fn scan_failure_aborts() -> Result<()> {
        let (_temp, pipeline) = workspace()?;
        let run = RunConfig::default();
        assert!(matches!(
            pipeline.process("<!-- keep:prod -->", &run),
            Err(DomainError::Scan(ScanError::UnterminatedDirective { .. }))
        ));
        Ok(())
    }

    #[test]
    fn stamps_revision_inside_kept_region() -> Result<()> {
        let (_temp, pipeline) = workspace()?;
        let run = RunConfig {
            environment: Some("production".into()),
            revision: Some("abc123".into()),
            ..RunConfig::default()
        };
        let output = pipeline.process(
            "<!-- keep:production --><meta content=\"x\"><!-- inject:git-hash --><!-- endkeep -->",
            &run,
        )?;
        assert_eq!(
            output,
            "<!-- keep:production --><meta content=\"x\">abc123<!-- endkeep -->"
        );
        Ok(())
    }

    #[test]
    fn output_is_deterministic() -> Result<()> {
        let (_temp, pipeline) = workspace()?;
        let run = RunConfig {
            css: vec!["**/*.css".into()],
            js: vec!["dist".into(), "dist/app.js".into()],
            environment: Some("production".into()),
            ..RunConfig::default()
        };
        let first = pipeline.process(DOCUMENT, &run)?;
        let second = pipeline.process(DOCUMENT, &run)?;
        assert_eq!(first, second);
        assert_eq!(first.matches("dist/app.js").count(), 1);
        Ok(())
    }
}
