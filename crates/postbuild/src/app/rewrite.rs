//! Applying scanned directives to produce the output document.

use crate::app::render::{Layout, Renderer};
use crate::domain::errors::RenderError;
use crate::domain::model::{AssetSpec, Directive, DirectiveKind};

/// Values substituted into a document during one rewrite.
pub struct RewriteContext<'a> {
    /// Stylesheets for `inject:css`; `None` leaves those regions untouched.
    pub css: Option<&'a AssetSpec>,
    /// Scripts for `inject:js`; `None` leaves those regions untouched.
    pub js: Option<&'a AssetSpec>,
    /// Active environment; `None` leaves every remove/keep region untouched.
    pub environment: Option<&'a str>,
    /// Revision for `inject:git-hash`; `None` leaves the marker in place.
    pub revision: Option<&'a str>,
    pub renderer: &'a Renderer,
}

enum Action<'a> {
    Retain,
    Delete,
    Replace(&'a str),
    Fill(&'a AssetSpec),
}

/// Produce a new document from `document` and its `directives`.
///
/// Directives must be in document order and non-overlapping, as returned by
/// [`crate::app::scan::scan`]. Text outside directive spans is copied byte for byte.
pub fn rewrite(
    document: &str,
    directives: &[Directive],
    ctx: &RewriteContext<'_>,
) -> Result<String, RenderError> {
    let line_break = detect_line_break(document);
    let mut output = String::with_capacity(document.len());
    let mut cursor = 0;

    for directive in directives {
        let span = directive.span.clone();
        output.push_str(&document[cursor..span.start]);
        cursor = span.end;

        match action_for(directive, ctx) {
            Action::Retain => push_retained(&mut output, document, directive, ctx.revision),
            Action::Delete => {
                tracing::debug!(marker = %directive.kind.token(), line = directive.line, "dropping region");
            }
            Action::Replace(text) => output.push_str(text),
            Action::Fill(spec) => {
                let Some(inner) = directive.inner.clone() else {
                    output.push_str(&document[span]);
                    continue;
                };
                let indent = indent_before(document, span.start);
                let fragment = ctx.renderer.render(spec, &Layout { line_break, indent })?;

                output.push_str(&document[span.start..inner.start]);
                output.push_str(line_break);
                output.push_str(indent);
                output.push_str(&fragment);
                output.push_str(line_break);
                output.push_str(indent);
                output.push_str(&document[inner.end..span.end]);
            }
        }
    }

    output.push_str(&document[cursor..]);
    Ok(output)
}

/// Copy a region verbatim, stamping the revision over any nested `inject:git-hash` marker.
fn push_retained(
    output: &mut String,
    document: &str,
    directive: &Directive,
    revision: Option<&str>,
) {
    let Some(revision) = revision else {
        output.push_str(&document[directive.span.clone()]);
        return;
    };
    let mut cursor = directive.span.start;
    for marker in &directive.nested {
        output.push_str(&document[cursor..marker.span.start]);
        output.push_str(revision);
        cursor = marker.span.end;
    }
    output.push_str(&document[cursor..directive.span.end]);
}

fn action_for<'a>(directive: &Directive, ctx: &RewriteContext<'a>) -> Action<'a> {
    match &directive.kind {
        DirectiveKind::InjectCss => ctx.css.map_or(Action::Retain, Action::Fill),
        DirectiveKind::InjectJs => ctx.js.map_or(Action::Retain, Action::Fill),
        DirectiveKind::InjectGitHash => ctx.revision.map_or(Action::Retain, Action::Replace),
        DirectiveKind::Remove { label } => {
            if removes(label, ctx.environment) {
                Action::Delete
            } else {
                Action::Retain
            }
        }
        DirectiveKind::Keep { label } => {
            if keeps(label, ctx.environment) {
                Action::Retain
            } else {
                Action::Delete
            }
        }
    }
}

/// A `remove:<label>` region disappears only in its own environment.
fn removes(label: &str, environment: Option<&str>) -> bool {
    environment == Some(label)
}

/// A `keep:<label>` region survives only in its own environment, or when no environment is set.
fn keeps(label: &str, environment: Option<&str>) -> bool {
    environment.is_none_or(|env| env == label)
}

fn detect_line_break(document: &str) -> &'static str {
    if document.contains("\r\n") { "\r\n" } else { "\n" }
}

/// Horizontal whitespace between the start of the line and `offset`, if nothing else precedes it.
fn indent_before(document: &str, offset: usize) -> &str {
    let line_start = document[..offset].rfind('\n').map_or(0, |idx| idx + 1);
    let prefix = &document[line_start..offset];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix
    } else {
        ""
    }
}
