//! Command Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A command error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for command operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("could not create scratch directory")]
    Scratch,
    /// The input path given on the command line could not be listed.
    #[display("cannot read input: {}", _0.display())]
    Input(#[error(not(source))] PathBuf),
    #[display("failed to recompress {}", _0.display())]
    Recompress(#[error(not(source))] PathBuf),
    /// The result was computed but could not be written.
    #[display("failed to write {}", _0.display())]
    Output(#[error(not(source))] PathBuf),
}
