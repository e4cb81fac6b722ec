use crate::CompressionMode;
use crate::error::{ErrorKind, Result};
use crate::longpath::for_fs;
use crate::mtime;
use exn::{OptionExt, ResultExt};
use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Component, Path};
use tracing::instrument;
use walkdir::{DirEntry, WalkDir};
use zip::write::SimpleFileOptions;
use zip::{DateTime, ZipWriter};

const MANIFEST_DIR: &str = "META-INF";
const MANIFEST_FILE: &str = "MANIFEST.MF";

/// Payload of a single archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryData {
    Directory,
    File(Vec<u8>),
}

/// A single entry waiting to be serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Slash-delimited path inside the archive (no trailing slash).
    pub name: String,
    pub data: EntryData,
    pub modified: DateTime,
}

/// An ordered collection of entries, serialized on demand with a
/// [`CompressionMode`].
///
/// Building and serializing are separate steps so the same tree can be written
/// in different modes without walking it twice.
///
/// ```
/// use crunch_archive::{ArchiveBuilder, CompressionMode};
///
/// let bytes = ArchiveBuilder::new()
///     .with_directory("assets")
///     .with_file("assets/pack.mcmeta", br#"{"pack":{}}"#)
///     .write(CompressionMode::DeflateMax)
///     .unwrap();
/// assert!(bytes.starts_with(b"PK"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct ArchiveBuilder {
    entries: Vec<Entry>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a directory marker stamped with the container epoch.
    pub fn with_directory(mut self, name: impl Into<String>) -> Self {
        self.push(Entry { name: name.into(), data: EntryData::Directory, modified: DateTime::default() });
        self
    }

    /// Appends a file stamped with the container epoch.
    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.push(Entry {
            name: name.into(),
            data: EntryData::File(contents.into()),
            modified: DateTime::default(),
        });
        self
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes every entry, in insertion order, compressing file payloads
    /// according to `mode`.
    #[instrument(skip_all, fields(mode = %mode, entries = self.entries.len(), output_size))]
    pub fn write(&self, mode: CompressionMode) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in &self.entries {
            let options = SimpleFileOptions::default()
                .compression_method(mode.method())
                .compression_level(mode.level())
                .last_modified_time(entry.modified);
            match &entry.data {
                EntryData::Directory => {
                    writer.add_directory(entry.name.as_str(), options).or_raise(|| ErrorKind::Write)?;
                },
                EntryData::File(contents) => {
                    let options = options.large_file(contents.len() as u64 >= u64::from(u32::MAX));
                    writer.start_file(entry.name.as_str(), options).or_raise(|| ErrorKind::Write)?;
                    writer.write_all(contents).or_raise(|| ErrorKind::Write)?;
                },
            }
        }
        let output = writer.finish().or_raise(|| ErrorKind::Write)?.into_inner();
        tracing::Span::current().record("output_size", output.len());
        Ok(output)
    }
}

/// Walks the tree below `root` and collects it into an [`ArchiveBuilder`].
///
/// Every directory except `root` itself becomes a directory marker; every
/// file becomes a file entry holding its current bytes and modification time.
/// Names are relative to `root` and always use `/` separators. Entries are
/// sorted by name, parents before children, except that the manifest
/// directory and manifest file come first. Anything that is neither a file
/// nor a directory (such as a symlink) is skipped.
#[instrument(skip_all, fields(root = %root.display(), entries))]
pub fn repack(root: &Path) -> Result<ArchiveBuilder> {
    let mut builder = ArchiveBuilder::new();
    for entry in WalkDir::new(root).sort_by(manifest_first) {
        let entry = entry.or_raise(|| ErrorKind::Io(root.to_path_buf()))?;
        if entry.depth() == 0 {
            continue;
        }
        let name = entry_name(root, entry.path())?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            builder.push(Entry { name, data: EntryData::Directory, modified: DateTime::default() });
        } else if file_type.is_file() {
            let io = || ErrorKind::Io(entry.path().to_path_buf());
            let mut file = File::open(for_fs(entry.path())).or_raise(io)?;
            let modified = file.metadata().and_then(|m| m.modified()).or_raise(io)?;
            let mut contents = Vec::new();
            file.read_to_end(&mut contents).or_raise(io)?;
            builder.push(Entry {
                name,
                data: EntryData::File(contents),
                modified: mtime::from_system_time(modified),
            });
        } else {
            tracing::debug!(path = %entry.path().display(), "Skipping entry that is neither file nor directory");
        }
    }
    tracing::Span::current().record("entries", builder.len());
    Ok(builder)
}

fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let invalid = || ErrorKind::InvalidPath(path.display().to_string());
    let relative = path.strip_prefix(root).or_raise(invalid)?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().ok_or_raise(invalid)?),
            _ => exn::bail!(invalid()),
        }
    }
    Ok(parts.join("/"))
}

fn is_manifest(entry: &DirEntry) -> bool {
    match entry.depth() {
        1 => entry.file_name() == MANIFEST_DIR,
        2 => {
            entry.file_name() == MANIFEST_FILE
                && entry.path().parent().and_then(Path::file_name) == Some(OsStr::new(MANIFEST_DIR))
        },
        _ => false,
    }
}

fn manifest_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    is_manifest(b).cmp(&is_manifest(a)).then_with(|| a.file_name().cmp(b.file_name()))
}
