//! Configuration management utilities.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".postbuild/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub ignore: Ignore,
    #[serde(default)]
    pub resolve: Resolve,
    #[serde(default)]
    pub render: Render,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Defaults {
    /// Environment label used when `-r` is not given.
    #[serde(default)]
    pub environment: Option<String>,
    /// Revision stamped by `-H` instead of asking git for HEAD.
    #[serde(default)]
    pub revision: Option<String>,
}

/// Paths and globs pruned from directory and glob expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ignore {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub globs: Vec<String>,
}

impl Default for Ignore {
    fn default() -> Self {
        Self {
            paths: vec![".git/".into()],
            globs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Resolve {
    #[serde(default)]
    include_hidden: Option<bool>,
    #[serde(default)]
    respect_gitignore: Option<bool>,
}

impl Resolve {
    pub fn include_hidden(&self) -> bool {
        self.include_hidden.unwrap_or(false)
    }

    pub fn respect_gitignore(&self) -> bool {
        self.respect_gitignore.unwrap_or(false)
    }
}

/// Tag templates, rendered once per injected asset with `path` in scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Render {
    #[serde(default)]
    stylesheet: Option<String>,
    #[serde(default)]
    script: Option<String>,
}

impl Render {
    pub const DEFAULT_STYLESHEET: &'static str = r#"<link rel="stylesheet" href="{{ path }}">"#;
    pub const DEFAULT_SCRIPT: &'static str = r#"<script src="{{ path }}"></script>"#;

    pub fn stylesheet(&self) -> &str {
        self.stylesheet
            .as_deref()
            .unwrap_or(Self::DEFAULT_STYLESHEET)
    }

    pub fn script(&self) -> &str {
        self.script.as_deref().unwrap_or(Self::DEFAULT_SCRIPT)
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    environment: Option<String>,
    revision: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            environment: env::var("POSTBUILD_ENV").ok().filter(|v| !v.is_empty()),
            revision: env::var("POSTBUILD_REVISION").ok().filter(|v| !v.is_empty()),
        }
    }

    #[cfg(test)]
    fn for_tests(environment: &str, revision: &str) -> Self {
        Self {
            environment: Some(environment.to_owned()),
            revision: Some(revision.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            tracing::debug!(path = %global_path.display(), "loading global config");
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            tracing::debug!(path = %workspace_path.display(), "loading workspace config");
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data).with_context(|| format!("in config file {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            defaults: merge_defaults(self.defaults, other.defaults),
            ignore: merge_ignore(self.ignore, other.ignore),
            resolve: merge_resolve(self.resolve, other.resolve),
            render: merge_render(self.render, other.render),
        }
    }
}

fn merge_defaults(base: Defaults, overlay: Defaults) -> Defaults {
    Defaults {
        environment: overlay.environment.or(base.environment),
        revision: overlay.revision.or(base.revision),
    }
}

fn merge_ignore(base: Ignore, overlay: Ignore) -> Ignore {
    let mut paths: BTreeSet<String> = base.paths.into_iter().collect();
    paths.extend(overlay.paths);

    let mut globs: BTreeSet<String> = base.globs.into_iter().collect();
    globs.extend(overlay.globs);

    Ignore {
        paths: paths.into_iter().collect(),
        globs: globs.into_iter().collect(),
    }
}

fn merge_resolve(mut base: Resolve, overlay: Resolve) -> Resolve {
    if let Some(value) = overlay.include_hidden {
        base.include_hidden = Some(value);
    }
    if let Some(value) = overlay.respect_gitignore {
        base.respect_gitignore = Some(value);
    }
    base
}

fn merge_render(mut base: Render, overlay: Render) -> Render {
    if let Some(value) = overlay.stylesheet {
        base.stylesheet = Some(value);
    }
    if let Some(value) = overlay.script {
        base.script = Some(value);
    }
    base
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("postbuild/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(environment) = env.environment {
        config.defaults.environment = Some(environment);
    }
    if let Some(revision) = env.revision {
        config.defaults.revision = Some(revision);
    }
    config
}
