//! Entry name validation.
//!
//! Archive entry names are untrusted input; they are resolved into relative
//! paths that can never escape the extraction destination.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates an archive entry name and resolves it to a relative path.
/// Ensures that names don't escape the destination root (no `..` traversal).
///
/// > **Note:** entry names always use `/` as the separator. Backslashes are
/// >           only separators on platforms that treat them as such.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use crunch_archive::validate_entry_name;
/// // Valid names
/// assert!(validate_entry_name("META-INF/MANIFEST.MF").is_ok());
/// assert!(validate_entry_name("assets/../pack.mcmeta").is_ok()); // (never leaves root)
/// // Invalid names
/// assert!(validate_entry_name("../../etc/passwd").is_err());
/// assert!(validate_entry_name("/etc/passwd").is_err());
/// assert!(validate_entry_name("a\0b").is_err());
/// // Names get resolved
/// assert_eq!(
///     validate_entry_name("assets/./minecraft//lang/").unwrap(),
///     Path::new("assets/minecraft/lang")
/// );
/// ```
pub fn validate(name: &str) -> Result<PathBuf> {
    let invalid = || ErrorKind::InvalidPath(name.to_string());
    // Null bytes cause truncation in C-based syscalls.
    if name.contains('\0') {
        exn::bail!(invalid());
    }
    let mut components = Vec::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(s) => components.push(s),
            Component::CurDir => {},
            Component::RootDir | Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(invalid()),
        false => Ok(components.into_iter().collect()),
    }
}

/// Returns `true` if `name` resolves to the destination root itself, as the
/// `./` and `/` directory markers some tools write do.
pub(crate) fn is_root(name: &str) -> bool {
    Path::new(name).components().all(|component| matches!(component, Component::CurDir | Component::RootDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("fabric.mod.json", "fabric.mod.json")]
    #[case("META-INF/MANIFEST.MF", "META-INF/MANIFEST.MF")]
    #[case("META-INF/jars/", "META-INF/jars")]
    #[case("a//b//c", "a/b/c")]
    #[case("a/./b/./c", "a/b/c")]
    #[case("a/b/..", "a")]
    fn test_valid_names(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(validate(name).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("../etc/passwd")]
    #[case("a/../../b")]
    #[case("..")]
    #[case("/etc/passwd")]
    #[case("a\0b")]
    #[case("")]
    #[case("./")]
    #[case("//")]
    fn test_invalid_names(#[case] name: &str) {
        assert!(validate(name).is_err());
    }

    #[rstest]
    #[case("./", true)]
    #[case("/", true)]
    #[case(".//./", true)]
    #[case("a/", false)]
    #[case("../", false)]
    #[case("./a/", false)]
    fn test_is_root(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_root(name), expected);
    }
}
