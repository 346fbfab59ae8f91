//! Domain-specific errors.

use thiserror::Error;

use crate::domain::model::AssetKind;

/// Malformed marker structure found while scanning a document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("`{marker}` opened on line {line} is never closed")]
    UnterminatedDirective { marker: String, line: usize },
    #[error("`{inner}` on line {inner_line} opens inside `{outer}` from line {outer_line}")]
    OverlappingDirectives {
        outer: String,
        outer_line: usize,
        inner: String,
        inner_line: usize,
    },
    #[error("`{marker}` on line {line} cannot close `{open}` from line {open_line}")]
    UnexpectedCloser {
        marker: String,
        line: usize,
        open: String,
        open_line: usize,
    },
}

/// An asset spec that could not be turned into a file list.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("asset spec '{spec}' does not name an existing file or directory")]
    NotFound { spec: String },
    #[error("asset spec '{spec}' is not a valid glob")]
    InvalidGlob {
        spec: String,
        #[source]
        source: globset::Error,
    },
    #[error("asset spec '{spec}' matched no {kind} files")]
    NoMatches { spec: String, kind: AssetKind },
    #[error("failed to read '{spec}'")]
    Inaccessible {
        spec: String,
        #[source]
        source: ignore::Error,
    },
}

/// Failure turning an asset list into markup.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid {kind} template")]
    InvalidTemplate {
        kind: AssetKind,
        #[source]
        source: minijinja::Error,
    },
    #[error("failed to render {kind} template for '{entry}'")]
    Template {
        kind: AssetKind,
        entry: String,
        #[source]
        source: minijinja::Error,
    },
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Render(#[from] RenderError),
}
