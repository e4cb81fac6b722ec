use crate::error::{ErrorKind, Result};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// BLAKE3 fingerprint of an archive's exact bytes.
///
/// The sole cache key of the [`ScratchStore`](crate::ScratchStore): archives
/// with identical bytes share a digest regardless of their file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Digest(blake3::Hash);

impl Digest {
    #[must_use]
    pub fn of_bytes(bytes: impl AsRef<[u8]>) -> Self {
        Self(blake3::hash(bytes.as_ref()))
    }

    pub fn of_reader(reader: impl Read) -> std::io::Result<Self> {
        let mut hasher = blake3::Hasher::new();
        hasher.update_reader(reader)?;
        Ok(Self(hasher.finalize()))
    }

    /// Hashes the current contents of the file at `path`.
    pub fn of_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ErrorKind::from_io(e, path))?;
        Ok(Self::of_reader(file).map_err(|e| ErrorKind::from_io(e, path))?)
    }

    /// Lowercase hex form, used as the workspace directory name.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_bytes_same_digest() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jar");
        let b = dir.path().join("renamed copy.jar");
        std::fs::write(&a, b"PK\x05\x06").unwrap();
        std::fs::write(&b, b"PK\x05\x06").unwrap();
        assert_eq!(Digest::of_file(&a).unwrap(), Digest::of_file(&b).unwrap());
        assert_eq!(Digest::of_file(&a).unwrap(), Digest::of_bytes(b"PK\x05\x06"));
        assert_ne!(Digest::of_bytes(b"one"), Digest::of_bytes(b"two"));
    }

    #[test]
    fn test_hex() {
        let digest = Digest::of_bytes(b"");
        assert_eq!(digest.to_hex().len(), 64);
        assert_eq!(digest.to_string(), digest.to_hex());
        assert!(digest.to_hex().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Digest::of_file(dir.path().join("missing.jar")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }
}
