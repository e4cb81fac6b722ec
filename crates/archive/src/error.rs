//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Data is not a readable archive, or one of its entries is corrupt.
    /// Don't retry with the same input.
    #[display("invalid or corrupted archive")]
    InvalidArchive,
    /// An entry name is unsafe to materialize on disk (escapes the
    /// destination, is absolute, or contains a NUL byte).
    #[display("invalid entry path: {_0}")]
    InvalidPath(#[error(not(source))] String),
    /// A filesystem operation on the given path failed.
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// Serializing the archive failed.
    #[display("failed to write archive")]
    Write,
}
