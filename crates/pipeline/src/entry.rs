use std::path::Path;

/// Suffixes of the structured-text metadata formats that get re-indented.
pub const METADATA_SUFFIXES: [&str; 2] = [".json", ".mcmeta"];
pub const IMAGE_SUFFIX: &str = ".png";

/// How a file found inside a workspace is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// An archive nested inside the one being processed.
    Archive,
    Metadata,
    Image,
    /// Anything else is repacked untouched.
    Other,
}

impl EntryKind {
    /// Classifies `path` by file-name suffix (case-sensitive).
    pub fn classify(path: &Path, archive_suffix: &str) -> Self {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Self::Other;
        };
        if name.ends_with(archive_suffix) {
            Self::Archive
        } else if METADATA_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            Self::Metadata
        } else if name.ends_with(IMAGE_SUFFIX) {
            Self::Image
        } else {
            Self::Other
        }
    }
}
