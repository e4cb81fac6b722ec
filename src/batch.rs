use crate::error::{ErrorKind, Result};
use crunch_pipeline::{Context, Nesting, recompress};
use exn::{OptionExt, ResultExt};
use std::io::Write;
use std::path::{Path, PathBuf};

/// How a batch went.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Regular files directly inside `dir` whose name ends with `suffix`, sorted
/// by name.
pub fn archives_in(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let input = || ErrorKind::Input(dir.to_path_buf());
    let mut archives = Vec::new();
    for entry in std::fs::read_dir(dir).or_raise(input)? {
        let entry = entry.or_raise(input)?;
        let is_file = entry.file_type().or_raise(input)?.is_file();
        if is_file && entry.file_name().to_str().is_some_and(|name| name.ends_with(suffix)) {
            archives.push(entry.path());
        }
    }
    archives.sort();
    Ok(archives)
}

/// Recompresses every source in turn. A failing archive is logged and skipped;
/// the rest of the batch still runs.
pub fn run(ctx: &Context, sources: &[PathBuf], output_dir: &Path) -> Summary {
    let mut summary = Summary::default();
    for source in sources {
        let name = source.file_name().unwrap_or(source.as_os_str()).to_string_lossy();
        tracing::info!("Optimizing {name}...");
        match process(ctx, source, output_dir) {
            Ok(output) => {
                tracing::debug!(output = %output.display(), "Wrote result");
                summary.succeeded += 1;
            },
            Err(err) => {
                tracing::error!(source = %source.display(), error = ?err, "Failed to recompress archive");
                summary.failed += 1;
            },
        }
    }
    summary
}

/// Recompresses `source` and writes the result to `output_dir` under the same
/// file name. The output file only appears once it is complete.
pub fn process(ctx: &Context, source: &Path, output_dir: &Path) -> Result<PathBuf> {
    let name = source.file_name().ok_or_raise(|| ErrorKind::Input(source.to_path_buf()))?;
    let result = recompress(ctx, source, Nesting::TopLevel).or_raise(|| ErrorKind::Recompress(source.to_path_buf()))?;

    let destination = output_dir.join(name);
    let output = || ErrorKind::Output(destination.clone());
    std::fs::create_dir_all(output_dir).or_raise(output)?;
    let mut file = tempfile::NamedTempFile::new_in(output_dir).or_raise(output)?;
    file.write_all(&result.bytes).or_raise(output)?;
    file.persist(&destination).or_raise(output)?;
    tracing::info!(
        output = %destination.display(),
        effort = %result.effort,
        bytes = result.bytes.len(),
        "Saved {}",
        result.media_type
    );
    Ok(destination)
}
