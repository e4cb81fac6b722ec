use crate::Context;
use crate::entry::EntryKind;
use crate::error::{ErrorKind, Result};
use crate::normalize::{Outcome, normalize_metadata, optimize_image};
use crate::recompress::{Nesting, recompress_within};
use crunch_archive::{is_archive, overwrite};
use crunch_scratch::Digest;
use exn::ResultExt;
use std::path::Path;
use walkdir::WalkDir;

/// Tally of what a single pass over a workspace did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Normalization {
    pub nested: usize,
    pub metadata: usize,
    pub images: usize,
    /// Recognized entries left as they were because they could not be processed.
    pub skipped: usize,
}

impl Normalization {
    fn count(&mut self, kind: EntryKind, outcome: Outcome) {
        match (kind, outcome) {
            (_, Outcome::Skipped) => self.skipped += 1,
            (_, Outcome::Unchanged) | (EntryKind::Other, _) => {},
            (EntryKind::Archive, Outcome::Rewritten) => self.nested += 1,
            (EntryKind::Metadata, Outcome::Rewritten) => self.metadata += 1,
            (EntryKind::Image, Outcome::Rewritten) => self.images += 1,
        }
    }
}

/// Walks a freshly extracted workspace once, in sorted order, handling every
/// file with a recognized suffix.
///
/// Nested archives are recompressed depth-first and replaced in place before
/// this returns, so the caller can repack straight away. `lineage` holds the
/// digests of the archive this workspace came from and everything enclosing it.
pub(crate) fn descend(ctx: &Context, workspace: &Path, lineage: &[Digest]) -> Result<Normalization> {
    let mut report = Normalization::default();
    for entry in WalkDir::new(workspace).sort_by_file_name() {
        let entry = entry.or_raise(|| ErrorKind::Io(workspace.to_path_buf()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let kind = EntryKind::classify(path, ctx.archive_suffix());
        let outcome = match kind {
            EntryKind::Archive => replace_nested(ctx, path, lineage)?,
            EntryKind::Metadata => normalize_metadata(path)?,
            EntryKind::Image => match ctx.optimizer() {
                Some(optimizer) => optimize_image(&**optimizer, path)?,
                None => Outcome::Unchanged,
            },
            EntryKind::Other => Outcome::Unchanged,
        };
        report.count(kind, outcome);
    }
    Ok(report)
}

/// Nested entries that cannot be unpacked, or that contain an archive they
/// are already inside of, are kept byte for byte.
fn replace_nested(ctx: &Context, path: &Path, lineage: &[Digest]) -> Result<Outcome> {
    if !is_archive(path) {
        tracing::warn!(path = %path.display(), "Not a readable archive; leaving nested entry unchanged");
        return Ok(Outcome::Skipped);
    }
    let nested = || ErrorKind::Nested(path.to_path_buf());
    let recompressed = match recompress_within(ctx, path, Nesting::Nested, lineage) {
        Ok(recompressed) => recompressed,
        Err(err) if matches!(*err, ErrorKind::Extract | ErrorKind::Recursive(_)) => {
            tracing::warn!(path = %path.display(), error = %*err, "Leaving nested entry unchanged");
            return Ok(Outcome::Skipped);
        },
        Err(err) => return Err(err).or_raise(nested),
    };
    overwrite(path, &recompressed.bytes).or_raise(nested)?;
    Ok(Outcome::Rewritten)
}
