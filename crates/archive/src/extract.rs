use crate::error::{ErrorKind, Result};
use crate::longpath::for_fs;
use crate::mtime;
use crate::path::{is_root, validate};
use exn::ResultExt;
use std::fs::{File, create_dir_all};
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;
use tracing::instrument;
use zip::ZipArchive;

/// Most bytes reserved up front for a single entry. Declared sizes come from
/// the archive itself, so anything beyond this grows as it is actually read.
const MAX_PREALLOCATION: u64 = 1 << 20;

/// Summary of a completed extraction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Extraction {
    /// Number of file entries written.
    pub files: usize,
    /// Number of directory-marker entries created.
    pub directories: usize,
    /// Total uncompressed payload bytes written.
    pub bytes: u64,
}

/// Returns `true` if the file at `path` opens as an archive.
///
/// Only the central directory is read; entry payloads are not verified.
#[must_use]
pub fn is_archive(path: impl AsRef<Path>) -> bool {
    File::open(for_fs(path.as_ref())).is_ok_and(|file| ZipArchive::new(BufReader::new(file)).is_ok())
}

/// Extracts the archive at `archive` below `destination`.
pub fn extract_file(archive: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<Extraction> {
    let archive = archive.as_ref();
    let file = File::open(for_fs(archive)).or_raise(|| ErrorKind::Io(archive.to_path_buf()))?;
    extract(BufReader::new(file), destination.as_ref())
}

/// Extracts every entry of an archive below `destination`.
///
/// Directory markers create their directory (and all ancestors); a marker for
/// the destination itself is skipped. Files create their parent directories
/// themselves, so entries are handled correctly in whatever order the archive
/// lists them. Each file's modification time is set
/// from its entry timestamp.
///
/// If this fails partway the destination holds a partial tree; callers must
/// discard it.
#[instrument(skip_all, fields(destination = %destination.display(), files, bytes))]
pub fn extract<R: Read + Seek>(reader: R, destination: &Path) -> Result<Extraction> {
    let mut archive = ZipArchive::new(reader).or_raise(|| ErrorKind::InvalidArchive)?;
    let mut report = Extraction::default();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).or_raise(|| ErrorKind::InvalidArchive)?;
        if entry.is_dir() && is_root(entry.name()) {
            tracing::debug!(entry = entry.name(), "Skipping root directory marker");
            continue;
        }
        let target = destination.join(validate(entry.name())?);
        let io = || ErrorKind::Io(target.clone());
        if entry.is_dir() {
            create_dir_all(for_fs(&target)).or_raise(io)?;
            report.directories += 1;
            continue;
        }
        if let Some(parent) = target.parent() {
            create_dir_all(for_fs(parent)).or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
        }
        let mut contents = Vec::with_capacity(preallocation(entry.size()));
        entry.read_to_end(&mut contents).or_raise(|| ErrorKind::InvalidArchive)?;
        let mut file = File::create(for_fs(&target)).or_raise(io)?;
        file.write_all(&contents).or_raise(io)?;
        mtime::set_modified(&file, mtime::extracted(entry.last_modified()), &target)?;
        tracing::trace!(entry = entry.name(), size = contents.len(), "Extracted entry");
        report.files += 1;
        report.bytes += contents.len() as u64;
    }
    tracing::Span::current().record("files", report.files).record("bytes", report.bytes);
    Ok(report)
}

fn preallocation(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOCATION)).unwrap_or_default()
}
