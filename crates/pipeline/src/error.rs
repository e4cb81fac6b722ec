//! Pipeline Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Every variant is fatal to the archive being processed, never to a batch. A
/// nested archive failing with [`Extract`](Self::Extract) or
/// [`Recursive`](Self::Recursive) is kept as it was instead.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source archive could not be read to compute its digest.
    #[display("could not fingerprint source archive")]
    Digest,
    /// The scratch store could not provide or publish a workspace.
    #[display("scratch store failure")]
    Scratch,
    /// The source is not a readable archive, or could not be unpacked.
    #[display("extraction failed")]
    Extract,
    /// The workspace could not be read back or serialized.
    #[display("repacking failed")]
    Repack,
    /// A recognized entry could not be rewritten in place.
    #[display("could not normalize {}", _0.display())]
    Normalize(#[error(not(source))] PathBuf),
    /// Recompressing an archive nested inside the current one failed.
    #[display("nested archive failed: {}", _0.display())]
    Nested(#[error(not(source))] PathBuf),
    /// The archive contains itself, directly or further down.
    #[display("archive contains itself: {}", _0.display())]
    Recursive(#[error(not(source))] PathBuf),
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}
