//! In-place rewriting of recognized workspace entries.
//!
//! Every rewrite keeps the file's modification time, so a normalized
//! workspace repacks to the same bytes no matter how often it is reused.

use crate::error::{ErrorKind, Result};
use crunch_archive::{long_path, modified, overwrite, restamp};
use crunch_optimize::Optimizer;
use exn::ResultExt;
use std::path::Path;

/// What happened to a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The file now holds new bytes.
    Rewritten,
    /// The file was already in its final form.
    Unchanged,
    /// The file could not be processed and was left exactly as it was.
    Skipped,
}

/// Re-serializes a JSON document with two-space indentation, keeping key
/// order and the exact textual form of numbers.
pub fn canonicalize_json(bytes: &[u8]) -> serde_json::Result<String> {
    let document: serde_json::Value = serde_json::from_slice(bytes)?;
    serde_json::to_string_pretty(&document)
}

/// Rewrites a structured-text metadata file in canonical form.
///
/// A document that does not parse is left untouched with a warning.
pub fn normalize_metadata(path: &Path) -> Result<Outcome> {
    let original = std::fs::read(long_path(path)).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    let canonical = match canonicalize_json(&original) {
        Ok(canonical) => canonical,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Malformed metadata left unchanged");
            return Ok(Outcome::Skipped);
        },
    };
    if canonical.as_bytes() == original {
        return Ok(Outcome::Unchanged);
    }
    overwrite(path, &canonical).or_raise(|| ErrorKind::Normalize(path.to_path_buf()))?;
    tracing::debug!(path = %path.display(), before = original.len(), after = canonical.len(), "Normalized metadata");
    Ok(Outcome::Rewritten)
}

/// Runs `optimizer` over an image in place.
///
/// If the optimizer fails, or produces something larger than it was given,
/// the original bytes are put back and the failure is only logged.
pub fn optimize_image(optimizer: &dyn Optimizer, path: &Path) -> Result<Outcome> {
    let normalize = || ErrorKind::Normalize(path.to_path_buf());
    let stamp = modified(path).or_raise(normalize)?;
    let original = std::fs::read(long_path(path)).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;

    let outcome = match optimizer.optimize(&long_path(path)) {
        Ok(()) => {
            let optimized = std::fs::read(long_path(path)).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
            if optimized.len() < original.len() {
                tracing::debug!(path = %path.display(), before = original.len(), after = optimized.len(), "Optimized image");
                Outcome::Rewritten
            } else {
                if optimized != original {
                    std::fs::write(long_path(path), &original).or_raise(normalize)?;
                }
                Outcome::Unchanged
            }
        },
        Err(err) => {
            tracing::warn!(path = %path.display(), optimizer = optimizer.name(), error = ?err, "Image optimization failed; keeping original");
            std::fs::write(long_path(path), &original).or_raise(normalize)?;
            Outcome::Skipped
        },
    };
    restamp(path, stamp).or_raise(normalize)?;
    Ok(outcome)
}
