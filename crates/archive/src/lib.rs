//! Extraction and repacking of ZIP-based containers (JAR files).
//!
//! This crate moves archives between their packed form and a plain directory
//! tree, and back again:
//!
//! - **Extraction** ([`extract`]) writes every entry of an archive below a
//!   destination directory, validating entry names so nothing escapes it.
//! - **Repacking** ([`repack`]) walks a directory tree and produces an
//!   [`ArchiveBuilder`], which is serialized with a [`CompressionMode`].
//!
//! Entry modification times survive the trip: extraction stamps them onto the
//! written files and repacking reads them back, so a tree that was not touched
//! in between repacks to the same bytes every time. Use [`overwrite`] to
//! change a file inside an extracted tree without losing its timestamp.
//!
//! All compression uses the highest available DEFLATE level; this crate
//! prioritizes output size over speed.

pub mod error;
mod extract;
mod longpath;
mod mode;
mod mtime;
mod path;
mod repack;

pub use crate::extract::{Extraction, extract, extract_file, is_archive};
pub use crate::longpath::{for_fs as long_path, escape as escape_long_path};
pub use crate::mtime::{modified, overwrite, restamp};
pub use crate::path::validate as validate_entry_name;
pub use crate::repack::{ArchiveBuilder, Entry, EntryData, repack};

/// Media type conventionally associated with the containers this crate writes.
pub const MEDIA_TYPE: &str = "application/java-archive";

/// How the entries of a serialized archive are compressed.
///
/// Defaults to [`DeflateMax`](Self::DeflateMax).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompressionMode {
    /// Entries are stored as-is. Used for archives nested inside another
    /// archive, so their consumer does not pay for a second decode.
    Store,
    /// DEFLATE at the highest compression level.
    #[default]
    DeflateMax,
}
