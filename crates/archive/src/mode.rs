use crate::CompressionMode;
use flate2::Compression as DeflateLevel;
use std::fmt::{Display, Formatter, Result as FmtResult};
use zip::CompressionMethod;

impl Display for CompressionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl AsRef<str> for CompressionMode {
    fn as_ref(&self) -> &'static str {
        self.as_str()
    }
}

impl CompressionMode {
    /// Returns the short name (for displaying to user).
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionMode::Store => "store",
            CompressionMode::DeflateMax => "deflate-max",
        }
    }

    /// The per-entry compression method written into the archive.
    #[inline]
    #[must_use]
    pub fn method(&self) -> CompressionMethod {
        match self {
            CompressionMode::Store => CompressionMethod::Stored,
            CompressionMode::DeflateMax => CompressionMethod::Deflated,
        }
    }

    /// The compression level handed to the encoder, if the method takes one.
    #[must_use]
    pub fn level(&self) -> Option<i64> {
        match self {
            CompressionMode::Store => None,
            // Same ceiling as zlib's `-9`.
            CompressionMode::DeflateMax => Some(i64::from(DeflateLevel::best().level())),
        }
    }
}
