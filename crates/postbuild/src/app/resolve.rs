//! Asset resolution: turning file, directory, and glob specs into ordered references.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::domain::errors::ResolutionError;
use crate::domain::model::{AssetKind, AssetSpec};
use crate::infra::config::{Config, Ignore};

const GLOB_METACHARS: &[char] = &['*', '?', '[', '{'];

/// Configuration inputs for the resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Directory relative specs are resolved against.
    pub root: PathBuf,
    pub include_hidden: bool,
    pub respect_gitignore: bool,
    pub ignore: Ignore,
}

impl ResolverConfig {
    pub fn from_root(root: PathBuf, config: &Config) -> Self {
        Self {
            root,
            include_hidden: config.resolve.include_hidden(),
            respect_gitignore: config.resolve.respect_gitignore(),
            ignore: config.ignore.clone(),
        }
    }
}

/// Resolves asset specs against the filesystem in a deterministic order.
#[derive(Debug)]
pub struct AssetResolver {
    cfg: ResolverConfig,
    matcher: IgnoreMatcher,
}

impl AssetResolver {
    pub fn new(cfg: ResolverConfig) -> Result<Self> {
        let matcher = build_ignore_matcher(&cfg.ignore)?;
        Ok(Self { cfg, matcher })
    }

    /// Resolve a single spec. See [`AssetResolver::resolve_all`].
    pub fn resolve(
        &self,
        spec: &str,
        kind: AssetKind,
        ignore_prefix: Option<&str>,
    ) -> Result<AssetSpec, ResolutionError> {
        self.resolve_all(&[spec], kind, ignore_prefix)
    }

    /// Resolve every spec in order and concatenate the matches.
    ///
    /// Directories expand to the files beneath them carrying `kind`'s extension, globs expand to
    /// every file they match, anything else must be an existing file. Duplicates keep their first
    /// position. When `ignore_prefix` is given it is stripped from the entries that start with it.
    pub fn resolve_all<S: AsRef<str>>(
        &self,
        specs: &[S],
        kind: AssetKind,
        ignore_prefix: Option<&str>,
    ) -> Result<AssetSpec, ResolutionError> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for spec in specs {
            let spec = spec.as_ref();
            let matched = self.expand(spec, kind)?;
            if matched.is_empty() {
                return Err(ResolutionError::NoMatches {
                    spec: spec.to_owned(),
                    kind,
                });
            }
            tracing::debug!(%spec, %kind, count = matched.len(), "resolved asset spec");
            for entry in matched {
                if seen.insert(entry.clone()) {
                    entries.push(entry);
                }
            }
        }

        let (entries, stripped_prefix) = match ignore_prefix {
            Some(prefix) => strip_ignore_prefix(entries, prefix),
            None => (entries, false),
        };
        if let Some(prefix) = ignore_prefix
            && !stripped_prefix
        {
            tracing::warn!(%prefix, %kind, "ignore prefix matched no resolved asset");
        }

        Ok(AssetSpec {
            kind,
            entries,
            stripped_prefix,
        })
    }

    fn expand(&self, spec: &str, kind: AssetKind) -> Result<Vec<String>, ResolutionError> {
        let path = self.cfg.root.join(spec);
        if path.is_dir() {
            return self.expand_directory(spec, &path, kind);
        }
        if spec.contains(GLOB_METACHARS) {
            return self.expand_glob(spec);
        }
        if path.is_file() {
            return Ok(vec![spec.to_owned()]);
        }
        Err(ResolutionError::NotFound {
            spec: spec.to_owned(),
        })
    }

    fn expand_directory(
        &self,
        spec: &str,
        dir: &Path,
        kind: AssetKind,
    ) -> Result<Vec<String>, ResolutionError> {
        let mut matched = Vec::new();
        self.walk(spec, spec, dir, |display| {
            if has_extension(&display, kind.extension()) {
                matched.push(display);
            }
        })?;
        Ok(matched)
    }

    fn expand_glob(&self, spec: &str) -> Result<Vec<String>, ResolutionError> {
        let glob = GlobBuilder::new(spec)
            .literal_separator(true)
            .build()
            .map_err(|source| ResolutionError::InvalidGlob {
                spec: spec.to_owned(),
                source,
            })?
            .compile_matcher();

        let base = glob_base(spec);
        let dir = if base.is_empty() {
            self.cfg.root.clone()
        } else {
            self.cfg.root.join(&base)
        };
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut matched = Vec::new();
        self.walk(spec, &base, &dir, |display| {
            if glob.is_match(&display) {
                matched.push(display);
            }
        })?;
        Ok(matched)
    }

    /// Visit every file below `dir` depth-first, siblings in file name order.
    ///
    /// Files are reported as `base` joined with their `/`-separated path relative to `dir`. Ignore
    /// patterns are matched against that relative path too, so a named directory is never pruned
    /// because of its own ancestors.
    fn walk(
        &self,
        spec: &str,
        base: &str,
        dir: &Path,
        mut visit: impl FnMut(String),
    ) -> Result<(), ResolutionError> {
        let mut builder = WalkBuilder::new(dir);
        builder
            .standard_filters(false)
            .hidden(!self.cfg.include_hidden)
            .git_ignore(self.cfg.respect_gitignore)
            .sort_by_file_name(|a, b| a.cmp(b));

        let walk_root = dir.to_path_buf();
        let matcher = self.matcher.clone();
        builder.filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let rel = entry.path().strip_prefix(&walk_root).unwrap_or(entry.path());
            !matcher.should_skip(rel)
        });

        for result in builder.build() {
            let entry = result.map_err(|source| ResolutionError::Inaccessible {
                spec: spec.to_owned(),
                source,
            })?;
            if entry.depth() == 0 || !entry.path().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            visit(join_display(base, rel));
        }
        Ok(())
    }
}

/// Leading components of a glob that contain no metacharacters, e.g. `dist/js` for
/// `dist/js/**/*.js`.
fn glob_base(spec: &str) -> String {
    let components: Vec<&str> = spec.split('/').collect();
    let literal = components
        .iter()
        .take(components.len().saturating_sub(1))
        .take_while(|component| !component.contains(GLOB_METACHARS))
        .copied()
        .collect::<Vec<_>>();
    match literal.as_slice() {
        [""] => "/".to_owned(),
        parts => parts.join("/"),
    }
}

fn join_display(base: &str, rel: &Path) -> String {
    let rel = rel
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if base.is_empty() {
        rel
    } else if base.ends_with('/') {
        format!("{base}{rel}")
    } else {
        format!("{base}/{rel}")
    }
}

fn has_extension(display: &str, extension: &str) -> bool {
    Path::new(display)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

fn strip_ignore_prefix(entries: Vec<String>, prefix: &str) -> (Vec<String>, bool) {
    let mut stripped = false;
    let entries = entries
        .into_iter()
        .map(|entry| match entry.strip_prefix(prefix) {
            Some(rest) if !prefix.is_empty() && !rest.is_empty() => {
                stripped = true;
                rest.to_owned()
            }
            _ => entry,
        })
        .collect();
    (entries, stripped)
}

#[derive(Debug, Clone)]
struct IgnoreMatcher {
    globs: Option<GlobSet>,
}

impl IgnoreMatcher {
    fn should_skip(&self, rel: &Path) -> bool {
        self.globs.as_ref().is_some_and(|set| set.is_match(rel))
    }
}

fn build_ignore_matcher(ignore: &Ignore) -> Result<IgnoreMatcher> {
    let mut builder = GlobSetBuilder::new();

    for pattern in &ignore.paths {
        for expanded in expand_dir_pattern(pattern) {
            let glob = Glob::new(&expanded).context("invalid ignore path pattern")?;
            builder.add(glob);
        }
    }

    for glob in &ignore.globs {
        let glob = Glob::new(glob).context("invalid ignore glob")?;
        builder.add(glob);
    }

    let globs = builder.build().context("failed to build ignore matcher")?;

    Ok(IgnoreMatcher { globs: Some(globs) })
}

fn expand_dir_pattern(raw: &str) -> Vec<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    vec![
        trimmed.to_owned(),
        format!("{trimmed}/**"),
        format!("**/{trimmed}"),
        format!("**/{trimmed}/**"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> Result<tempfile::TempDir> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::create_dir_all(root.join("tests/tmp/nested"))?;
        fs::create_dir_all(root.join("node_modules/pkg"))?;
        for name in ["styles2.css", "styles1.css", "styles3.css"] {
            fs::write(root.join("tests/tmp").join(name), "body {}")?;
        }
        for name in ["script1.js", "script3.js", "script2.js"] {
            fs::write(root.join("tests/tmp").join(name), "console.log(1);")?;
        }
        fs::write(root.join("tests/tmp/nested/deep.css"), "a {}")?;
        fs::write(root.join("tests/tmp/index.html"), "<html></html>")?;
        fs::write(root.join("node_modules/pkg/index.js"), "module.exports = 1;")?;
        Ok(temp)
    }

    fn resolver(root: &Path) -> Result<AssetResolver> {
        AssetResolver::new(ResolverConfig::from_root(
            root.to_path_buf(),
            &Config::default(),
        ))
    }

    #[test]
    fn directory_expands_to_matching_extension_in_name_order() -> Result<()> {
        let temp = fixture()?;
        let resolver = resolver(temp.path())?;

        let css = resolver.resolve("tests/tmp", AssetKind::Stylesheet, None)?;
        assert_eq!(
            css.entries,
            vec![
                "tests/tmp/nested/deep.css",
                "tests/tmp/styles1.css",
                "tests/tmp/styles2.css",
                "tests/tmp/styles3.css",
            ]
        );
        assert!(!css.stripped_prefix);

        let js = resolver.resolve("tests/tmp/", AssetKind::Script, None)?;
        assert_eq!(
            js.entries,
            vec![
                "tests/tmp/script1.js",
                "tests/tmp/script2.js",
                "tests/tmp/script3.js",
            ]
        );
        Ok(())
    }

    #[test]
    fn glob_expands_from_root() -> Result<()> {
        let temp = fixture()?;
        let resolver = resolver(temp.path())?;

        let js = resolver.resolve("**/*.js", AssetKind::Script, None)?;
        assert_eq!(
            js.entries,
            vec![
                "node_modules/pkg/index.js",
                "tests/tmp/script1.js",
                "tests/tmp/script2.js",
                "tests/tmp/script3.js",
            ]
        );
        Ok(())
    }

    #[test]
    fn configured_ignore_paths_prune_expansion() -> Result<()> {
        let temp = fixture()?;
        let mut config = Config::default();
        config.ignore.paths.push("node_modules/".into());
        config.ignore.globs.push("**/script2.js".into());
        let resolver = AssetResolver::new(ResolverConfig::from_root(
            temp.path().to_path_buf(),
            &config,
        ))?;

        let js = resolver.resolve("**/*.js", AssetKind::Script, None)?;
        assert_eq!(js.entries, vec!["tests/tmp/script1.js", "tests/tmp/script3.js"]);
        Ok(())
    }

    #[test]
    fn named_directory_is_not_pruned_by_its_ancestors() -> Result<()> {
        let temp = fixture()?;
        fs::create_dir_all(temp.path().join("node_modules/lib/dist"))?;
        fs::write(temp.path().join("node_modules/lib/dist/lib.js"), "")?;

        let js = resolver(temp.path())?.resolve("node_modules/lib/dist", AssetKind::Script, None)?;
        assert_eq!(js.entries, vec!["node_modules/lib/dist/lib.js"]);

        let mut config = Config::default();
        config.ignore.paths.push("node_modules/".into());
        let strict = AssetResolver::new(ResolverConfig::from_root(
            temp.path().to_path_buf(),
            &config,
        ))?;
        let js = strict.resolve("node_modules/lib/dist", AssetKind::Script, None)?;
        assert_eq!(js.entries, vec!["node_modules/lib/dist/lib.js"]);
        Ok(())
    }

    #[test]
    fn single_star_does_not_cross_directories() -> Result<()> {
        let temp = fixture()?;
        let resolver = resolver(temp.path())?;

        let css = resolver.resolve("tests/tmp/*.css", AssetKind::Stylesheet, None)?;
        assert_eq!(
            css.entries,
            vec![
                "tests/tmp/styles1.css",
                "tests/tmp/styles2.css",
                "tests/tmp/styles3.css",
            ]
        );
        Ok(())
    }

    #[test]
    fn literal_file_is_the_sole_entry() -> Result<()> {
        let temp = fixture()?;
        let resolver = resolver(temp.path())?;

        let css = resolver.resolve("tests/tmp/styles2.css", AssetKind::Stylesheet, None)?;
        assert_eq!(css.entries, vec!["tests/tmp/styles2.css"]);
        Ok(())
    }

    #[test]
    fn missing_literal_is_not_found() -> Result<()> {
        let temp = fixture()?;
        let resolver = resolver(temp.path())?;

        let err = resolver
            .resolve("tests/tmp/missing.css", AssetKind::Stylesheet, None)
            .unwrap_err();
        assert!(matches!(err, ResolutionError::NotFound { ref spec } if spec == "tests/tmp/missing.css"));
        Ok(())
    }

    #[test]
    fn empty_expansion_is_an_error() -> Result<()> {
        let temp = fixture()?;
        fs::create_dir_all(temp.path().join("empty"))?;
        let resolver = resolver(temp.path())?;

        assert!(matches!(
            resolver.resolve("empty", AssetKind::Script, None),
            Err(ResolutionError::NoMatches { .. })
        ));
        assert!(matches!(
            resolver.resolve("**/*.scss", AssetKind::Stylesheet, None),
            Err(ResolutionError::NoMatches { .. })
        ));
        assert!(matches!(
            resolver.resolve("nowhere/*.css", AssetKind::Stylesheet, None),
            Err(ResolutionError::NoMatches { .. })
        ));
        Ok(())
    }

    #[test]
    fn invalid_glob_is_reported() -> Result<()> {
        let temp = fixture()?;
        let resolver = resolver(temp.path())?;

        assert!(matches!(
            resolver.resolve("tests/[*.css", AssetKind::Stylesheet, None),
            Err(ResolutionError::InvalidGlob { .. })
        ));
        Ok(())
    }

    #[test]
    fn ignore_prefix_is_stripped_and_flagged() -> Result<()> {
        let temp = fixture()?;
        let resolver = resolver(temp.path())?;

        let js = resolver.resolve("tests/tmp", AssetKind::Script, Some("tests/tmp/"))?;
        assert_eq!(js.entries, vec!["script1.js", "script2.js", "script3.js"]);
        assert!(js.stripped_prefix);

        let untouched = resolver.resolve("tests/tmp", AssetKind::Script, Some("dist/"))?;
        assert_eq!(untouched.entries[0], "tests/tmp/script1.js");
        assert!(!untouched.stripped_prefix);
        Ok(())
    }

    #[test]
    fn repeated_specs_are_deduplicated_in_first_seen_order() -> Result<()> {
        let temp = fixture()?;
        let resolver = resolver(temp.path())?;

        let css = resolver.resolve_all(
            &["tests/tmp/styles3.css", "tests/tmp/*.css"],
            AssetKind::Stylesheet,
            None,
        )?;
        assert_eq!(
            css.entries,
            vec![
                "tests/tmp/styles3.css",
                "tests/tmp/styles1.css",
                "tests/tmp/styles2.css",
            ]
        );
        Ok(())
    }

    #[test]
    fn resolution_is_repeatable() -> Result<()> {
        let temp = fixture()?;
        let resolver = resolver(temp.path())?;

        let first = resolver.resolve("**/*.css", AssetKind::Stylesheet, None)?;
        let second = resolver.resolve("**/*.css", AssetKind::Stylesheet, None)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn hidden_files_are_opt_in() -> Result<()> {
        let temp = fixture()?;
        fs::write(temp.path().join("tests/tmp/.hidden.js"), "x")?;

        let default = resolver(temp.path())?.resolve("tests/tmp", AssetKind::Script, None)?;
        assert!(!default.entries.iter().any(|e| e.ends_with(".hidden.js")));

        let mut cfg = ResolverConfig::from_root(temp.path().to_path_buf(), &Config::default());
        cfg.include_hidden = true;
        let with_hidden = AssetResolver::new(cfg)?.resolve("tests/tmp", AssetKind::Script, None)?;
        assert_eq!(with_hidden.entries[0], "tests/tmp/.hidden.js");
        Ok(())
    }

    #[test]
    fn glob_base_keeps_literal_leading_directories() {
        assert_eq!(glob_base("**/*.js"), "");
        assert_eq!(glob_base("*.css"), "");
        assert_eq!(glob_base("dist/js/**/*.js"), "dist/js");
        assert_eq!(glob_base("./dist/*.css"), "./dist");
        assert_eq!(glob_base("/srv/app/*.css"), "/srv/app");
        assert_eq!(glob_base("/*.css"), "/");
    }
}
