//! Optimizer Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::time::Duration;

/// An optimizer error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for optimizer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("optimizer `{_0}` not found on your system")]
    NotFound(#[error(not(source))] String),
    /// The optimizer process could not be started.
    #[display("failed to start optimizer")]
    Spawn,
    /// The optimizer exited with a non-zero exit code.
    #[display("optimizer exited with code: {_0}")]
    Failed(#[error(not(source))] i32),
    /// The optimizer was terminated by a signal (or crashed) without an exit code.
    #[display("optimizer was killed")]
    Killed,
    /// The optimizer did not finish in time and was killed.
    #[display("optimizer timed out after {_0:?}")]
    Timeout(#[error(not(source))] Duration),
}
