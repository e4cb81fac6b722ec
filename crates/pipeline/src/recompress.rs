use crate::Context;
use crate::descend::{Normalization, descend};
use crate::error::{ErrorKind, Result};
use crunch_archive::{CompressionMode, MEDIA_TYPE, extract_file, long_path, repack};
use crunch_scratch::{Commit, Digest};
use derive_more::Display;
use exn::ResultExt;
use std::path::Path;
use tracing::instrument;

/// Where in the archive hierarchy a [`recompress`] call sits.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    /// The archive the caller asked for; its bytes are written to disk.
    #[display("top-level")]
    TopLevel,
    /// An archive found inside another one; its bytes replace the entry.
    #[display("nested")]
    Nested,
}

impl Nesting {
    /// Nested archives are stored so their consumer can read them without a
    /// second inflate; everything else is compressed as hard as possible.
    pub fn mode(self) -> CompressionMode {
        match self {
            Self::TopLevel => CompressionMode::DeflateMax,
            Self::Nested => CompressionMode::Store,
        }
    }
}

/// Whether the extraction and normalization work was done by this call.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Effort {
    /// A workspace for the same bytes already existed and was repacked as is.
    #[display("cached")]
    Cached,
    #[display("processed")]
    Processed,
}

/// The result of recompressing one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recompressed {
    pub bytes: Vec<u8>,
    /// Digest of the source bytes, which keys the workspace that was used.
    pub digest: Digest,
    pub media_type: &'static str,
    pub mode: CompressionMode,
    pub effort: Effort,
    /// What the pass over the workspace did; `None` when it was reused.
    pub normalization: Option<Normalization>,
}

/// Recompresses the archive at `source`, returning the new bytes.
///
/// The extracted and normalized tree is cached in the scratch store under the
/// digest of the source bytes, so identical archives (under any name) are
/// only ever extracted once per store. Repacking happens on every call.
/// `source` itself is never written to.
pub fn recompress(ctx: &Context, source: &Path, nesting: Nesting) -> Result<Recompressed> {
    recompress_within(ctx, source, nesting, &[])
}

/// [`recompress`] for an archive found while processing the archives whose
/// digests are in `ancestors`, outermost first.
///
/// An archive that contains itself, at any depth, fails with
/// [`ErrorKind::Recursive`] before its workspace lock is taken.
#[instrument(
    skip_all,
    fields(source = %source.display(), nesting = %nesting, depth = ancestors.len(), digest, effort, input_size, output_size)
)]
pub(crate) fn recompress_within(
    ctx: &Context,
    source: &Path,
    nesting: Nesting,
    ancestors: &[Digest],
) -> Result<Recompressed> {
    let span = tracing::Span::current();
    let digest = Digest::of_file(long_path(source)).or_raise(|| ErrorKind::Digest)?;
    let input_size = std::fs::metadata(long_path(source)).or_raise(|| ErrorKind::Io(source.to_path_buf()))?.len();
    span.record("digest", tracing::field::display(&digest)).record("input_size", input_size);
    if ancestors.contains(&digest) {
        exn::bail!(ErrorKind::Recursive(source.to_path_buf()));
    }

    let (workspace, effort, normalization) = {
        let _guard = ctx.store().lock(digest);
        if ctx.store().exists(&digest) {
            tracing::info!("Reusing cached workspace");
            (ctx.store().workspace_path(&digest), Effort::Cached, None)
        } else {
            let mut lineage = ancestors.to_vec();
            lineage.push(digest);
            let (commit, report) = build_workspace(ctx, source, &digest, &lineage)?;
            (commit.path().to_path_buf(), Effort::Processed, Some(report))
        }
    };
    span.record("effort", tracing::field::display(effort));

    let mode = nesting.mode();
    let bytes = repack(&workspace)
        .and_then(|builder| builder.write(mode))
        .or_raise(|| ErrorKind::Repack)?;
    span.record("output_size", bytes.len());
    tracing::info!(input_size, output_size = bytes.len(), "Compression done");
    Ok(Recompressed { bytes, digest, media_type: MEDIA_TYPE, mode, effort, normalization })
}

/// Extracts `source` into a staging directory, processes it, and publishes it
/// as the workspace for `digest`. A failure at any step discards the staged
/// tree, so nothing half-finished is ever picked up as cached.
fn build_workspace(
    ctx: &Context,
    source: &Path,
    digest: &Digest,
    lineage: &[Digest],
) -> Result<(Commit, Normalization)> {
    let staging = ctx.store().stage(digest).or_raise(|| ErrorKind::Scratch)?;
    let extraction = extract_file(source, staging.path()).or_raise(|| ErrorKind::Extract)?;
    tracing::debug!(files = extraction.files, directories = extraction.directories, bytes = extraction.bytes, "Extracted");
    let report = descend(ctx, staging.path(), lineage)?;
    tracing::debug!(
        nested = report.nested,
        metadata = report.metadata,
        images = report.images,
        skipped = report.skipped,
        "Normalized"
    );
    let commit = staging.commit().or_raise(|| ErrorKind::Scratch)?;
    Ok((commit, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crunch_archive::ArchiveBuilder;
    use crunch_optimize::MockOptimizer;
    use crunch_scratch::ScratchStore;
    use std::fs::{read_dir, write};
    use std::io::{Cursor, Read};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;
    use zip::{CompressionMethod, ZipArchive};

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n pretend this is a rather wasteful image";

    struct Fixture {
        _scratch: TempDir,
        inputs: TempDir,
        ctx: Context,
        optimizer: Arc<MockOptimizer>,
    }

    impl Fixture {
        fn new() -> Self {
            let scratch = tempfile::tempdir().unwrap();
            // Stands in for a lossless optimizer that always finds something to drop.
            let optimizer = Arc::new(MockOptimizer::rewriting(|bytes| bytes[..8].to_vec()));
            let ctx = Context::new(ScratchStore::create_in(scratch.path()).unwrap()).with_optimizer(optimizer.clone());
            Self { _scratch: scratch, inputs: tempfile::tempdir().unwrap(), ctx, optimizer }
        }

        fn input(&self, name: &str, bytes: &[u8]) -> PathBuf {
            let path = self.inputs.path().join(name);
            write(&path, bytes).unwrap();
            path
        }

        fn workspaces(&self) -> usize {
            read_dir(self.ctx.store().root()).unwrap().count()
        }
    }

    fn inner_jar() -> Vec<u8> {
        ArchiveBuilder::new()
            .with_file("inner.json", br#"{"b":[1,2]}"#)
            .with_file("data.bin", b"inner payload ".repeat(32))
            .write(CompressionMode::DeflateMax)
            .unwrap()
    }

    fn outer_jar() -> Vec<u8> {
        ArchiveBuilder::new()
            .with_file("mod.json", br#"{"a":1}"#)
            .with_directory("textures")
            .with_file("textures/x.png", PNG)
            .with_file("inner.jar", inner_jar())
            .write(CompressionMode::DeflateMax)
            .unwrap()
    }

    fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> (Vec<u8>, CompressionMethod) {
        let mut file = archive.by_name(name).unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).unwrap();
        (contents, file.compression())
    }

    #[test]
    fn test_example_archive() {
        let fixture = Fixture::new();
        let source = fixture.input("example.jar", &outer_jar());
        let result = recompress(&fixture.ctx, &source, Nesting::TopLevel).unwrap();
        assert_eq!(result.media_type, "application/java-archive");
        assert_eq!(result.mode, CompressionMode::DeflateMax);
        assert_eq!(result.effort, Effort::Processed);
        assert_eq!(result.normalization, Some(Normalization { nested: 1, metadata: 1, images: 1, skipped: 0 }));
        assert_eq!(read_dir(fixture.inputs.path()).unwrap().count(), 1);
        assert_eq!(std::fs::read(&source).unwrap(), outer_jar());

        let mut outer = ZipArchive::new(Cursor::new(result.bytes)).unwrap();
        let (json, method) = read_entry(&mut outer, "mod.json");
        assert_eq!(json, b"{\n  \"a\": 1\n}");
        assert_eq!(method, CompressionMethod::Deflated);
        assert_eq!(read_entry(&mut outer, "textures/x.png").0, &PNG[..8]);
        assert!(outer.by_name("textures/").unwrap().is_dir());

        let (inner_bytes, _) = read_entry(&mut outer, "inner.jar");
        let mut inner = ZipArchive::new(Cursor::new(inner_bytes)).unwrap();
        let (inner_json, inner_method) = read_entry(&mut inner, "inner.json");
        assert_eq!(inner_json, b"{\n  \"b\": [\n    1,\n    2\n  ]\n}");
        assert_eq!(inner_method, CompressionMethod::Stored);
        assert_eq!(read_entry(&mut inner, "data.bin"), (b"inner payload ".repeat(32), CompressionMethod::Stored));
    }

    #[test]
    fn test_identical_bytes_reuse_workspace() {
        let fixture = Fixture::new();
        let first = fixture.input("first.jar", &outer_jar());
        let second = fixture.input("renamed copy.jar", &outer_jar());

        let a = recompress(&fixture.ctx, &first, Nesting::TopLevel).unwrap();
        let workspaces = fixture.workspaces();
        // One for the outer archive, one for the archive nested in it.
        assert_eq!(workspaces, 2);
        let calls = fixture.optimizer.calls().len();

        let b = recompress(&fixture.ctx, &second, Nesting::TopLevel).unwrap();
        assert_eq!(b.effort, Effort::Cached);
        assert_eq!(b.normalization, None);
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.bytes, b.bytes);
        assert_eq!(fixture.workspaces(), workspaces);
        assert_eq!(fixture.optimizer.calls().len(), calls);
    }

    #[test]
    fn test_cached_workspace_repacks_in_requested_mode() {
        let fixture = Fixture::new();
        let source = fixture.input("lib.jar", &inner_jar());
        let top = recompress(&fixture.ctx, &source, Nesting::TopLevel).unwrap();
        let nested = recompress(&fixture.ctx, &source, Nesting::Nested).unwrap();
        assert_eq!(nested.effort, Effort::Cached);
        assert_eq!(nested.mode, CompressionMode::Store);
        assert_ne!(top.bytes, nested.bytes);

        let mut archive = ZipArchive::new(Cursor::new(nested.bytes)).unwrap();
        assert_eq!(read_entry(&mut archive, "data.bin").1, CompressionMethod::Stored);
    }

    #[test]
    fn test_malformed_metadata_is_tolerated() {
        let fixture = Fixture::new();
        let jar = ArchiveBuilder::new()
            .with_file("pack.mcmeta", b"{\"pack\": oops}")
            .with_file("ok.json", b"{}")
            .write(CompressionMode::DeflateMax)
            .unwrap();
        let source = fixture.input("broken.jar", &jar);
        let result = recompress(&fixture.ctx, &source, Nesting::TopLevel).unwrap();
        assert_eq!(result.normalization, Some(Normalization { skipped: 1, ..Normalization::default() }));

        let mut archive = ZipArchive::new(Cursor::new(result.bytes)).unwrap();
        assert_eq!(read_entry(&mut archive, "pack.mcmeta").0, b"{\"pack\": oops}");
        assert_eq!(read_entry(&mut archive, "ok.json").0, b"{}");
    }

    #[test]
    fn test_untouched_entries_round_trip() {
        let fixture = Fixture::new();
        let blob: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let jar = ArchiveBuilder::new()
            .with_file("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n")
            .with_file("com/example/Mod.class", b"\xCA\xFE\xBA\xBE")
            .with_file("data/blob.bin", blob.clone())
            .write(CompressionMode::Store)
            .unwrap();
        let source = fixture.input("plain.jar", &jar);
        let result = recompress(&fixture.ctx, &source, Nesting::TopLevel).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(result.bytes)).unwrap();
        let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, ["META-INF/", "META-INF/MANIFEST.MF", "com/", "com/example/", "com/example/Mod.class", "data/", "data/blob.bin"]);
        assert_eq!(read_entry(&mut archive, "data/blob.bin").0, blob);
        assert_eq!(read_entry(&mut archive, "com/example/Mod.class").0, b"\xCA\xFE\xBA\xBE");
    }

    #[test]
    fn test_corrupt_nested_archive_is_kept() {
        let fixture = Fixture::new();
        let jar = ArchiveBuilder::new()
            .with_file("META-INF/jars/broken.jar", b"PK but not really")
            .write(CompressionMode::DeflateMax)
            .unwrap();
        let source = fixture.input("outer.jar", &jar);
        let result = recompress(&fixture.ctx, &source, Nesting::TopLevel).unwrap();
        assert_eq!(result.normalization, Some(Normalization { skipped: 1, ..Normalization::default() }));

        let mut archive = ZipArchive::new(Cursor::new(result.bytes)).unwrap();
        assert_eq!(read_entry(&mut archive, "META-INF/jars/broken.jar").0, b"PK but not really");
    }

    #[test]
    fn test_nested_archive_failing_checksum_is_kept() {
        let fixture = Fixture::new();
        let payload = b"stored library payload ".repeat(16);
        let mut lib = ArchiveBuilder::new()
            .with_file("lib.json", b"{}")
            .with_file("data.bin", payload.clone())
            .write(CompressionMode::Store)
            .unwrap();
        let at = lib.windows(payload.len()).position(|window| window == payload).unwrap();
        lib[at] ^= 0x20;
        let jar = ArchiveBuilder::new()
            .with_file("mod.json", br#"{"a":1}"#)
            .with_file("META-INF/jars/lib.jar", lib.clone())
            .write(CompressionMode::DeflateMax)
            .unwrap();
        let source = fixture.input("outer.jar", &jar);

        let result = recompress(&fixture.ctx, &source, Nesting::TopLevel).unwrap();
        assert_eq!(result.normalization, Some(Normalization { metadata: 1, skipped: 1, ..Normalization::default() }));
        let mut archive = ZipArchive::new(Cursor::new(result.bytes)).unwrap();
        assert_eq!(read_entry(&mut archive, "META-INF/jars/lib.jar").0, lib);
        assert_eq!(read_entry(&mut archive, "mod.json").0, b"{\n  \"a\": 1\n}");
        // Only the outer archive got a workspace.
        assert_eq!(fixture.workspaces(), 1);
    }

    #[test]
    fn test_archive_already_being_processed_is_refused() {
        let fixture = Fixture::new();
        let source = fixture.input("lib.jar", &inner_jar());
        let digest = Digest::of_file(&source).unwrap();

        let err = recompress_within(&fixture.ctx, &source, Nesting::Nested, &[digest]).unwrap_err();
        assert_eq!(*err, ErrorKind::Recursive(source.clone()));
        assert_eq!(fixture.workspaces(), 0);
    }

    #[test]
    fn test_invalid_source_leaves_no_workspace() {
        let fixture = Fixture::new();
        let source = fixture.input("garbage.jar", b"definitely not a zip file");
        let err = recompress(&fixture.ctx, &source, Nesting::TopLevel).unwrap_err();
        assert_eq!(*err, ErrorKind::Extract);
        assert_eq!(fixture.workspaces(), 0);
    }

    #[test]
    fn test_missing_source() {
        let fixture = Fixture::new();
        let err = recompress(&fixture.ctx, &fixture.inputs.path().join("missing.jar"), Nesting::TopLevel).unwrap_err();
        assert_eq!(*err, ErrorKind::Digest);
    }

    #[test]
    fn test_concurrent_identical_archives() {
        let fixture = Fixture::new();
        let sources: Vec<_> = (0..4).map(|i| fixture.input(&format!("copy-{i}.jar"), &outer_jar())).collect();
        let ctx = &fixture.ctx;
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = sources
                .iter()
                .map(|source| s.spawn(move || recompress(ctx, source, Nesting::TopLevel).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results.iter().filter(|r| r.effort == Effort::Processed).count(), 1);
        assert!(results.windows(2).all(|pair| pair[0].bytes == pair[1].bytes));
        assert_eq!(fixture.workspaces(), 2);
    }
}
