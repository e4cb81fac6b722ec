//! Lossless image optimization.
//!
//! Optimizers rewrite a single image file in place. The pipeline treats them
//! as best-effort: a failure is reported to the caller, who decides whether to
//! keep or restore the original bytes.

pub mod error;
mod external;
#[cfg(any(test, feature = "mock"))]
mod mock;

use crate::error::Result;
pub use crate::external::External;
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::MockOptimizer;
use std::path::Path;
use std::sync::Arc;

pub trait Optimizer {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Optimizes the image at `path` in place.
    ///
    /// On error the file may have been partially rewritten.
    fn optimize(&self, path: &Path) -> Result<()>;
}

pub type OptimizerHandle = Arc<dyn Optimizer + Send + Sync>;
