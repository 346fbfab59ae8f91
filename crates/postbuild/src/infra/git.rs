//! Git integration utilities.

use std::path::Path;

use anyhow::{Context, Result};

/// Lightweight wrapper around [`gix::Repository`] discovery for revision lookup.
#[derive(Default)]
pub struct GitClient {
    repo: Option<gix::Repository>,
}

impl GitClient {
    /// Attempt to locate a git repository starting from `path`.
    pub fn discover(path: impl AsRef<Path>) -> Self {
        let repo = gix::discover(path).ok();
        Self { repo }
    }

    /// Whether discovery found a repository.
    pub fn is_repository(&self) -> bool {
        self.repo.is_some()
    }

    /// Full hex id of the commit HEAD points at, if any.
    pub fn head_revision(&self) -> Option<String> {
        let repo = self.repo.as_ref()?;
        repo.head_id().ok().map(|id| id.detach().to_string())
    }
}

/// Resolve the revision stamped into `inject:git-hash` markers.
///
/// A pinned revision wins; otherwise HEAD of the repository containing `path` is used.
pub fn revision_for_path(path: &Path, pinned: Option<&str>) -> Result<String> {
    if let Some(revision) = pinned {
        tracing::debug!(%revision, "using pinned revision");
        return Ok(revision.to_owned());
    }

    let client = GitClient::discover(path);
    if !client.is_repository() {
        anyhow::bail!(
            "no git repository found from {}; set POSTBUILD_REVISION to stamp a revision",
            path.display()
        );
    }
    client
        .head_revision()
        .with_context(|| format!("repository at {} has no HEAD commit", path.display()))
}
