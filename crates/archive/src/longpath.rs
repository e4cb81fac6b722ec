//! Windows path-length workaround.
//!
//! Win32 file APIs refuse paths of `MAX_PATH` (260) UTF-16 units or more
//! unless they use the verbatim `\\?\` prefix, which in turn only accepts
//! backslash separators. Deeply nested archive entries hit this quickly. The
//! rewrite only affects the path handed to the filesystem call; entry names
//! recorded anywhere else stay untouched.

use std::borrow::Cow;
use std::path::Path;

/// Path length (in UTF-16 code units) at which Windows needs the verbatim prefix.
pub const MAX_PATH: usize = 260;
const VERBATIM_PREFIX: &str = r"\\?\";

/// Rewrites `path` into its verbatim form if it is at or over [`MAX_PATH`].
///
/// Returns `None` when the path is short enough or already verbatim. This is
/// the platform-independent half of [`for_fs`]; it is exposed so the rewrite
/// can be checked on any host.
///
/// ```
/// use crunch_archive::escape_long_path;
///
/// assert_eq!(escape_long_path("C:/short/path"), None);
/// let long = format!("C:/{}", "a".repeat(257));
/// assert_eq!(escape_long_path(&long).unwrap(), format!(r"\\?\C:\{}", "a".repeat(257)));
/// ```
#[must_use]
pub fn escape(path: &str) -> Option<String> {
    if path.starts_with(VERBATIM_PREFIX) || path.encode_utf16().count() < MAX_PATH {
        return None;
    }
    Some(format!("{VERBATIM_PREFIX}{}", path.replace('/', "\\")))
}

/// Returns the path to hand to filesystem calls for `path`.
///
/// On Windows, long paths are rewritten with [`escape`]. Everywhere else this
/// is a no-op.
#[must_use]
pub fn for_fs(path: &Path) -> Cow<'_, Path> {
    #[cfg(windows)]
    {
        if let Some(escaped) = path.to_str().and_then(escape) {
            tracing::debug!(path = %path.display(), "Found a long path; using verbatim prefix");
            return Cow::Owned(std::path::PathBuf::from(escaped));
        }
    }
    Cow::Borrowed(path)
}
