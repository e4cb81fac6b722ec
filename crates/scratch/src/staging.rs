use crate::error::{ErrorKind, Result};
use std::fs::{remove_dir_all, rename};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Prefix for in-progress workspaces inside the scratch root. Digest-keyed
/// workspaces are plain hex, so the two can never collide.
pub(crate) const STAGING_PREFIX: &str = ".staging-";

/// A workspace under construction.
///
/// Lives under a temporary name inside the scratch root and only appears
/// under its digest-keyed name once [`commit`](Self::commit) succeeds.
/// Dropping it without committing deletes everything written so far, so a
/// failed extraction never looks like a cached one.
pub struct Staging {
    dir: TempDir,
    target: PathBuf,
}

/// Outcome of [`Staging::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// The staged tree now lives at the workspace path.
    Committed(PathBuf),
    /// Another writer completed the same workspace first; the staged copy was
    /// discarded in favour of theirs.
    AlreadyPresent(PathBuf),
}
impl Commit {
    pub fn path(&self) -> &Path {
        match self {
            Self::Committed(path) | Self::AlreadyPresent(path) => path,
        }
    }
}

impl Staging {
    pub(crate) fn new(root: &Path, digest_hex: &str, target: PathBuf) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("{STAGING_PREFIX}{digest_hex}-"))
            .tempdir_in(root)
            .map_err(|e| ErrorKind::from_io(e, root))?;
        Ok(Self { dir, target })
    }

    /// Directory to extract into.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Atomically publishes the staged tree under its digest-keyed name.
    pub fn commit(self) -> Result<Commit> {
        let staged = self.dir.keep();
        match rename(&staged, &self.target) {
            Ok(()) => Ok(Commit::Committed(self.target)),
            Err(_) if self.target.is_dir() => {
                tracing::debug!(workspace = %self.target.display(), "Workspace completed elsewhere; discarding staged copy");
                if let Err(err) = remove_dir_all(&staged) {
                    tracing::warn!(path = %staged.display(), error = %err, "Could not remove discarded staging directory");
                }
                Ok(Commit::AlreadyPresent(self.target))
            },
            Err(err) => {
                let _ = remove_dir_all(&staged);
                exn::bail!(ErrorKind::from_io(err, &self.target))
            },
        }
    }
}
