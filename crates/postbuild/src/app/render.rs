//! Markup rendering for resolved asset lists.

use minijinja::{Environment, context};

use crate::domain::errors::RenderError;
use crate::domain::model::{AssetKind, AssetSpec};
use crate::infra::config::{Config, Render};

/// Line break and indentation of the region being filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout<'a> {
    pub line_break: &'a str,
    pub indent: &'a str,
}

impl Default for Layout<'_> {
    fn default() -> Self {
        Self {
            line_break: "\n",
            indent: "",
        }
    }
}

/// Turns an [`AssetSpec`] into the fragment injected between `inject:*` markers.
pub struct Renderer {
    env: Environment<'static>,
    stylesheet: String,
    script: String,
}

impl Renderer {
    /// Create a renderer with the built-in tag templates.
    pub fn new() -> Result<Self, RenderError> {
        Self::with_templates(Render::DEFAULT_STYLESHEET, Render::DEFAULT_SCRIPT)
    }

    /// Create a renderer using the templates from `[render]`.
    pub fn from_config(config: &Config) -> Result<Self, RenderError> {
        Self::with_templates(config.render.stylesheet(), config.render.script())
    }

    fn with_templates(stylesheet: &str, script: &str) -> Result<Self, RenderError> {
        let renderer = Self {
            env: Environment::new(),
            stylesheet: stylesheet.to_owned(),
            script: script.to_owned(),
        };
        for kind in [AssetKind::Stylesheet, AssetKind::Script] {
            renderer
                .render_entry(kind, "")
                .map_err(|source| RenderError::InvalidTemplate { kind, source })?;
        }
        Ok(renderer)
    }

    fn render_entry(&self, kind: AssetKind, entry: &str) -> Result<String, minijinja::Error> {
        self.env.render_str(
            self.template(kind),
            context! { path => entry, kind => kind.as_str() },
        )
    }

    fn template(&self, kind: AssetKind) -> &str {
        match kind {
            AssetKind::Stylesheet => &self.stylesheet,
            AssetKind::Script => &self.script,
        }
    }

    /// Render `spec` for a region laid out as `layout`.
    ///
    /// Tags are emitted one per line. A spec whose ignore-prefix was stripped renders as a
    /// comma-joined list of quoted file names instead.
    pub fn render(&self, spec: &AssetSpec, layout: &Layout<'_>) -> Result<String, RenderError> {
        if spec.stripped_prefix {
            return Ok(quoted_list(&spec.entries));
        }

        let mut lines = Vec::with_capacity(spec.entries.len());
        for entry in &spec.entries {
            let line = self
                .render_entry(spec.kind, entry)
                .map_err(|source| RenderError::Template {
                    kind: spec.kind,
                    entry: entry.clone(),
                    source,
                })?;
            lines.push(line);
        }

        let separator = format!("{}{}", layout.line_break, layout.indent);
        Ok(lines.join(&separator))
    }
}

fn quoted_list(entries: &[String]) -> String {
    entries
        .iter()
        .map(|entry| serde_json::Value::from(entry.as_str()).to_string())
        .collect::<Vec<_>>()
        .join(",")
}
