//! Domain models for directives, resolved assets, and run configuration.

use std::fmt;
use std::ops::Range;

/// Kind of asset an `inject:*` region receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Stylesheets, injected as `<link>` tags.
    Stylesheet,
    /// Scripts, injected as `<script>` tags.
    Script,
}

impl AssetKind {
    /// File extension collected when a directory is expanded.
    pub fn extension(&self) -> &'static str {
        match self {
            AssetKind::Stylesheet => "css",
            AssetKind::Script => "js",
        }
    }

    /// Stable identifier used in templates and log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Stylesheet => "stylesheet",
            AssetKind::Script => "script",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered, de-duplicated asset references ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
    pub kind: AssetKind,
    pub entries: Vec<String>,
    /// Set when the ignore-prefix was stripped from at least one entry.
    pub stripped_prefix: bool,
}

/// Marker family; a closing marker only ends a region of its own family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveFamily {
    Inject,
    Remove,
    Keep,
}

impl DirectiveFamily {
    /// Closing marker token for this family.
    pub fn closer(&self) -> &'static str {
        match self {
            DirectiveFamily::Inject => "endinject",
            DirectiveFamily::Remove => "endremove",
            DirectiveFamily::Keep => "endkeep",
        }
    }
}

/// What a directive asks the rewriter to do.
///
/// `Remove` and `Keep` are deliberately separate variants: a `remove` region survives unless its
/// label is the active environment, a `keep` region is dropped unless it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveKind {
    InjectCss,
    InjectJs,
    InjectGitHash,
    Remove { label: String },
    Keep { label: String },
}

impl DirectiveKind {
    /// Family of a paired directive, `None` for the unpaired git-hash marker.
    pub fn family(&self) -> Option<DirectiveFamily> {
        match self {
            DirectiveKind::InjectCss | DirectiveKind::InjectJs => Some(DirectiveFamily::Inject),
            DirectiveKind::InjectGitHash => None,
            DirectiveKind::Remove { .. } => Some(DirectiveFamily::Remove),
            DirectiveKind::Keep { .. } => Some(DirectiveFamily::Keep),
        }
    }

    /// Marker token as written in the document, e.g. `keep:production`.
    pub fn token(&self) -> String {
        match self {
            DirectiveKind::InjectCss => "inject:css".into(),
            DirectiveKind::InjectJs => "inject:js".into(),
            DirectiveKind::InjectGitHash => "inject:git-hash".into(),
            DirectiveKind::Remove { label } => format!("remove:{label}"),
            DirectiveKind::Keep { label } => format!("keep:{label}"),
        }
    }
}

/// A marker region located in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// Byte span of the whole region, comment delimiters included.
    pub span: Range<usize>,
    /// Byte span between the opening and closing markers of a paired directive.
    pub inner: Option<Range<usize>>,
    /// 1-based line of the opening marker.
    pub line: usize,
    /// `inject:git-hash` markers inside the interior, in document order.
    pub nested: Vec<Directive>,
}

/// Immutable settings for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Stylesheet specs; empty leaves `inject:css` regions untouched.
    pub css: Vec<String>,
    /// Script specs; empty leaves `inject:js` regions untouched.
    pub js: Vec<String>,
    pub ignore_prefix: Option<String>,
    pub environment: Option<String>,
    /// Revision substituted for `inject:git-hash`; `None` when the flag is off.
    pub revision: Option<String>,
}

impl RunConfig {
    /// Specs configured for the given asset kind.
    pub fn specs(&self, kind: AssetKind) -> &[String] {
        match kind {
            AssetKind::Stylesheet => &self.css,
            AssetKind::Script => &self.js,
        }
    }
}
