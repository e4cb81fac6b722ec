//! The recompression pipeline.
//!
//! [`recompress`] takes an archive on disk and returns a smaller archive with
//! the same observable contents:
//!
//! 1. The source bytes are fingerprinted. If the [`ScratchStore`] already holds
//!    a finished workspace for that digest, steps 2 and 3 are skipped.
//! 2. The archive is extracted into a staging directory.
//! 3. A single walk over the tree recompresses nested archives (recursively,
//!    depth-first), re-indents JSON metadata and hands images to the
//!    optimizer. The staged tree is then published as the digest's workspace.
//! 4. The workspace is repacked: `STORE` for nested archives, maximum
//!    `DEFLATE` at the top level.
//!
//! Only the extraction and normalization work is cached; repacking happens on
//! every call, so the same workspace can be serialized in either mode.

mod descend;
mod entry;
pub mod error;
pub mod normalize;
mod recompress;

pub use crate::descend::Normalization;
pub use crate::entry::EntryKind;
pub use crate::recompress::{Effort, Nesting, Recompressed, recompress};
use crunch_optimize::OptimizerHandle;
use crunch_scratch::ScratchStore;

pub const DEFAULT_ARCHIVE_SUFFIX: &str = ".jar";

/// Everything a [`recompress`] call needs, shared by every archive in a run.
pub struct Context {
    store: ScratchStore,
    optimizer: Option<OptimizerHandle>,
    archive_suffix: String,
}

impl Context {
    /// A context with no image optimizer that treats `.jar` files as archives.
    pub fn new(store: ScratchStore) -> Self {
        Self { store, optimizer: None, archive_suffix: DEFAULT_ARCHIVE_SUFFIX.to_string() }
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerHandle) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    /// Changes which file-name suffix marks a nested archive.
    pub fn with_archive_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.archive_suffix = suffix.into();
        self
    }

    pub fn store(&self) -> &ScratchStore {
        &self.store
    }

    pub fn optimizer(&self) -> Option<&OptimizerHandle> {
        self.optimizer.as_ref()
    }

    pub fn archive_suffix(&self) -> &str {
        &self.archive_suffix
    }

    /// Gives back the scratch store, e.g. to [`keep`](ScratchStore::keep) it.
    pub fn into_store(self) -> ScratchStore {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crunch_optimize::MockOptimizer;
    use std::sync::Arc;

    #[test]
    fn test_context_builder() {
        let scratch = tempfile::tempdir().unwrap();
        let ctx = Context::new(ScratchStore::create_in(scratch.path()).unwrap());
        assert_eq!(ctx.archive_suffix(), ".jar");
        assert!(ctx.optimizer().is_none());

        let ctx = ctx.with_archive_suffix(".zip").with_optimizer(Arc::new(MockOptimizer::new()));
        assert_eq!(ctx.archive_suffix(), ".zip");
        assert_eq!(ctx.optimizer().map(|o| o.name()), Some("mock"));
        assert!(ctx.into_store().root().starts_with(scratch.path()));
    }
}
