mod batch;
mod cli;
mod error;

use crate::batch::Summary;
use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use crunch_config::{Config, OptimizerConfig};
use crunch_optimize::{External, Optimizer, OptimizerHandle};
use crunch_pipeline::Context;
use crunch_scratch::ScratchStore;
use exn::ResultExt;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run(Cli::parse()) {
        Ok(Summary { failed: 0, .. }) => ExitCode::SUCCESS,
        Ok(summary) => {
            tracing::error!(failed = summary.failed, succeeded = summary.succeeded, "Some archives failed");
            ExitCode::FAILURE
        },
        Err(err) => {
            tracing::error!(error = ?err, "{}", *err);
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> Result<Summary> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    config.keep_scratch |= cli.keep_scratch;

    let store = match &config.scratch_dir {
        Some(parent) => ScratchStore::create_in(parent),
        None => ScratchStore::create(),
    }
    .or_raise(|| ErrorKind::Scratch)?;
    tracing::info!(root = %store.root().display(), "Scratch directory");

    let mut ctx = Context::new(store).with_archive_suffix(&config.archive_suffix);
    if let Some(optimizer) = optimizer(&config.optimizer) {
        ctx = ctx.with_optimizer(optimizer);
    }

    let path = cli.command.target().path();
    let sources = match &cli.command {
        Command::File(_) => vec![path.clone()],
        Command::Folder(_) => batch::archives_in(&path, ctx.archive_suffix())?,
    };
    if sources.is_empty() {
        tracing::warn!(path = %path.display(), suffix = ctx.archive_suffix(), "No archives found");
    }
    let summary = batch::run(&ctx, &sources, &config.output_dir);

    if config.keep_scratch {
        let root = ctx.into_store().keep();
        tracing::info!(root = %root.display(), "Kept scratch directory");
    }
    Ok(summary)
}

/// Images are left untouched (with one warning) when optimization is disabled
/// or no optimizer is available.
fn optimizer(config: &OptimizerConfig) -> Option<OptimizerHandle> {
    if !config.enabled {
        tracing::warn!("Image optimization disabled; images are left untouched");
        return None;
    }
    let external = match &config.program {
        Some(program) => Ok(External::oxipng(program, config.timeout())),
        None => External::discover(config.timeout()),
    };
    match external {
        Ok(external) => {
            tracing::info!(program = %external.program().display(), optimizer = external.name(), "Optimizing images");
            let handle: OptimizerHandle = Arc::new(external);
            Some(handle)
        },
        Err(err) => {
            tracing::warn!(error = %*err, "Images are left untouched");
            None
        },
    }
}
