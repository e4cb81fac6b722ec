use crate::Optimizer;
use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

type Rewrite = Box<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;

enum Behaviour {
    Rewrite(Rewrite),
    /// Scribbles over the file, then reports the error.
    Fail(ErrorKind),
}

/// In-process optimizer for tests. Records every path it is asked to optimize.
pub struct MockOptimizer {
    behaviour: Behaviour,
    calls: Mutex<Vec<PathBuf>>,
}

impl MockOptimizer {
    /// Succeeds without touching the file.
    pub fn new() -> Self {
        Self::rewriting(<[u8]>::to_vec)
    }

    /// Replaces each file's contents with `rewrite(contents)`.
    pub fn rewriting(rewrite: impl Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static) -> Self {
        Self { behaviour: Behaviour::Rewrite(Box::new(rewrite)), calls: Mutex::default() }
    }

    /// Corrupts each file and then fails with `kind`.
    pub fn failing(kind: ErrorKind) -> Self {
        Self { behaviour: Behaviour::Fail(kind), calls: Mutex::default() }
    }

    /// Paths passed to [`Optimizer::optimize`], in call order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Default for MockOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for MockOptimizer {
    fn name(&self) -> &str {
        "mock"
    }

    fn optimize(&self, path: &Path) -> Result<()> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(path.to_path_buf());
        match &self.behaviour {
            Behaviour::Rewrite(rewrite) => {
                let contents = std::fs::read(path).map_err(|_| ErrorKind::Spawn)?;
                std::fs::write(path, rewrite(&contents)).map_err(|_| ErrorKind::Spawn)?;
                Ok(())
            },
            Behaviour::Fail(kind) => {
                let _ = std::fs::write(path, b"corrupted by a failing optimizer");
                exn::bail!(kind.clone())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewriting_records_calls() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.png");
        std::fs::write(&image, b"abcdef").unwrap();
        let optimizer = MockOptimizer::rewriting(|bytes| bytes[..3].to_vec());
        optimizer.optimize(&image).unwrap();
        assert_eq!(std::fs::read(&image).unwrap(), b"abc");
        assert_eq!(optimizer.calls(), [image]);
    }

    #[test]
    fn test_failing_corrupts_then_errors() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.png");
        std::fs::write(&image, b"abcdef").unwrap();
        let err = MockOptimizer::failing(ErrorKind::Failed(2)).optimize(&image).unwrap_err();
        assert_eq!(*err, ErrorKind::Failed(2));
        assert_ne!(std::fs::read(&image).unwrap(), b"abcdef");
    }
}
