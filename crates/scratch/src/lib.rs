//! Process-scoped scratch space for extracted archives.
//!
//! A [`ScratchStore`] owns one uniquely named root directory. Below it, every
//! distinct archive [`Digest`] gets at most one workspace,
//! `<root>/<digest-hex>`, holding the archive's extracted and normalized tree.
//! A workspace only appears under that name once it is complete (see
//! [`Staging`]), so existence alone marks a valid cache entry for the rest of
//! the process lifetime. Workspaces are never evicted or refreshed.

mod digest;
pub mod error;
mod lock;
mod staging;

pub use crate::digest::Digest;
use crate::error::{ErrorKind, Result};
pub use crate::lock::DigestGuard;
use crate::lock::DigestLocks;
pub use crate::staging::{Commit, Staging};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ROOT_PREFIX: &str = "crunch-";

pub struct ScratchStore {
    root: PathBuf,
    // Removes the root (and every workspace) when the store is dropped.
    cleanup: Option<TempDir>,
    locks: DigestLocks,
}

impl ScratchStore {
    /// Creates a fresh scratch root in the system temporary directory.
    pub fn create() -> Result<Self> {
        Self::create_in(std::env::temp_dir())
    }

    /// Creates a fresh scratch root inside `parent`, creating `parent` if needed.
    pub fn create_in(parent: impl AsRef<Path>) -> Result<Self> {
        let requested = parent.as_ref();
        // Verbatim long paths on Windows only work with absolute paths.
        let parent = std::path::absolute(requested).map_err(|e| ErrorKind::from_io(e, requested))?;
        if parent.exists() && !parent.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(parent));
        }
        std::fs::create_dir_all(&parent).map_err(|e| ErrorKind::from_io(e, &parent))?;
        let dir = tempfile::Builder::new()
            .prefix(ROOT_PREFIX)
            .tempdir_in(&parent)
            .map_err(|e| ErrorKind::from_io(e, &parent))?;
        let root = dir.path().to_path_buf();
        tracing::debug!(root = %root.display(), "Created scratch root");
        Ok(Self { root, cleanup: Some(dir), locks: DigestLocks::default() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the workspace for `digest` lives (whether or not it exists yet).
    #[must_use]
    pub fn workspace_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(digest.to_hex())
    }

    /// Returns `true` if a completed workspace exists for `digest`.
    #[must_use]
    pub fn exists(&self, digest: &Digest) -> bool {
        self.workspace_path(digest).is_dir()
    }

    /// Starts building the workspace for `digest`.
    pub fn stage(&self, digest: &Digest) -> Result<Staging> {
        let hex = digest.to_hex();
        Staging::new(&self.root, &hex, self.root.join(&hex))
    }

    /// Blocks until no one else holds `digest`, then claims it.
    ///
    /// Concurrent callers working on the *same* archive bytes must hold this
    /// while checking for and building its workspace. Claims on different
    /// digests never block each other.
    pub fn lock(&self, digest: Digest) -> DigestGuard<'_> {
        self.locks.acquire(digest)
    }

    /// Leaves the scratch root on disk after the store is dropped, returning
    /// its path.
    pub fn keep(mut self) -> PathBuf {
        if let Some(dir) = self.cleanup.take() {
            let _ = dir.keep();
        }
        self.root.clone()
    }
}
