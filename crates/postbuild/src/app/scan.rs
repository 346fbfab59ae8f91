//! Directive scanning over raw document text.
//!
//! The document is never parsed as HTML. Markers are HTML comments such as
//! `<!-- inject:css -->`, located with a single linear pass that records byte offsets.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::domain::errors::ScanError;
use crate::domain::model::{Directive, DirectiveFamily, DirectiveKind};

static MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"<!--\s*(inject:css|inject:js|inject:git-hash|endinject|endremove|endkeep|remove:(\S+?)|keep:(\S+?))\s*-->",
    )
    .expect("invalid marker regex")
});

#[derive(Debug)]
enum Marker {
    Open(DirectiveKind),
    Close(DirectiveFamily),
    GitHash,
}

impl Marker {
    fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        if let Some(label) = caps.get(2) {
            return Some(Marker::Open(DirectiveKind::Remove {
                label: label.as_str().to_owned(),
            }));
        }
        if let Some(label) = caps.get(3) {
            return Some(Marker::Open(DirectiveKind::Keep {
                label: label.as_str().to_owned(),
            }));
        }
        match caps.get(1)?.as_str() {
            "inject:css" => Some(Marker::Open(DirectiveKind::InjectCss)),
            "inject:js" => Some(Marker::Open(DirectiveKind::InjectJs)),
            "inject:git-hash" => Some(Marker::GitHash),
            "endinject" => Some(Marker::Close(DirectiveFamily::Inject)),
            "endremove" => Some(Marker::Close(DirectiveFamily::Remove)),
            "endkeep" => Some(Marker::Close(DirectiveFamily::Keep)),
            _ => None,
        }
    }
}

/// A paired region whose closing marker has not been seen yet.
struct OpenRegion {
    kind: DirectiveKind,
    family: DirectiveFamily,
    start: usize,
    inner_start: usize,
    line: usize,
    nested: Vec<Directive>,
}

/// Counts lines incrementally as the scan moves forward through the document.
struct LineCounter<'a> {
    text: &'a str,
    offset: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> usize {
        self.line += self.text[self.offset..offset].matches('\n').count();
        self.offset = offset;
        self.line
    }
}

/// Locate every directive in `document`, in document order.
///
/// Paired regions never overlap. An `inject:git-hash` marker inside a paired region is recorded
/// in that region's `nested` list. A closing marker with no open region is left as text.
pub fn scan(document: &str) -> Result<Vec<Directive>, ScanError> {
    let mut directives = Vec::new();
    let mut lines = LineCounter::new(document);
    let mut open: Option<OpenRegion> = None;

    for caps in MARKER_REGEX.captures_iter(document) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let Some(marker) = Marker::from_captures(&caps) else {
            continue;
        };
        let line = lines.line_at(whole.start());

        match (marker, open.take()) {
            (Marker::GitHash, None) => directives.push(git_hash(whole.range(), line)),
            (Marker::GitHash, Some(mut region)) => {
                region.nested.push(git_hash(whole.range(), line));
                open = Some(region);
            }
            (Marker::Open(kind), None) => {
                let Some(family) = kind.family() else {
                    continue;
                };
                open = Some(OpenRegion {
                    kind,
                    family,
                    start: whole.start(),
                    inner_start: whole.end(),
                    line,
                    nested: Vec::new(),
                });
            }
            (Marker::Open(kind), Some(region)) => {
                return Err(ScanError::OverlappingDirectives {
                    outer: region.kind.token(),
                    outer_line: region.line,
                    inner: kind.token(),
                    inner_line: line,
                });
            }
            (Marker::Close(family), Some(region)) if region.family == family => {
                directives.push(Directive {
                    kind: region.kind,
                    span: region.start..whole.end(),
                    inner: Some(region.inner_start..whole.start()),
                    line: region.line,
                    nested: region.nested,
                });
            }
            (Marker::Close(family), Some(region)) => {
                return Err(ScanError::UnexpectedCloser {
                    marker: family.closer().to_owned(),
                    line,
                    open: region.kind.token(),
                    open_line: region.line,
                });
            }
            (Marker::Close(family), None) => {
                tracing::warn!(
                    marker = family.closer(),
                    line,
                    "closing marker without an open region left as text"
                );
            }
        }
    }

    if let Some(region) = open {
        return Err(ScanError::UnterminatedDirective {
            marker: region.kind.token(),
            line: region.line,
        });
    }

    tracing::debug!(count = directives.len(), "scanned directives");
    Ok(directives)
}

fn git_hash(span: Range<usize>, line: usize) -> Directive {
    Directive {
        kind: DirectiveKind::InjectGitHash,
        span,
        inner: None,
        line,
        nested: Vec::new(),
    }
}
