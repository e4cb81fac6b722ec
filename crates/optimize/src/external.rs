use crate::Optimizer;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::instrument;

const OXIPNG: &str = "oxipng";
// Maximum effort, only strip metadata that cannot affect rendering, and let
// fully transparent pixels be rewritten for better compression.
const OXIPNG_ARGS: [&str; 6] = ["--opt", "max", "--strip", "safe", "--alpha", "--quiet"];
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// An optimizer program run as a subprocess, once per image.
///
/// The image path is appended after the configured arguments and the program
/// is expected to rewrite it in place. The process is killed if it outlives
/// the timeout.
#[derive(Debug, Clone)]
pub struct External {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
}

impl External {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self { program: program.into(), args: args.into_iter().map(Into::into).collect(), timeout }
    }

    /// `oxipng` at `program`, configured for maximum lossless optimization.
    pub fn oxipng(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self::new(program, OXIPNG_ARGS, timeout)
    }

    /// Finds `oxipng` on `PATH`.
    pub fn discover(timeout: Duration) -> Result<Self> {
        match which::which(OXIPNG) {
            Ok(path) => {
                tracing::debug!(program = %path.display(), "Discovered image optimizer");
                Ok(Self::oxipng(path, timeout))
            },
            Err(_) => exn::bail!(ErrorKind::NotFound(OXIPNG.to_string())),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Optimizer for External {
    fn name(&self) -> &str {
        self.program.file_name().and_then(OsStr::to_str).unwrap_or(OXIPNG)
    }

    #[instrument(skip_all, fields(program = %self.program.display(), path = %path.display()))]
    fn optimize(&self, path: &Path) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .or_raise(|| ErrorKind::Spawn)?;
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait().or_raise(|| ErrorKind::Spawn)? {
                Some(status) if status.success() => return Ok(()),
                Some(status) => match status.code() {
                    Some(code) => exn::bail!(ErrorKind::Failed(code)),
                    None => exn::bail!(ErrorKind::Killed),
                },
                None if Instant::now() >= deadline => {
                    if let Err(err) = child.kill() {
                        tracing::warn!(error = %err, "Could not kill optimizer after timeout");
                    }
                    // Reap it so it doesn't linger as a zombie.
                    let _ = child.wait();
                    exn::bail!(ErrorKind::Timeout(self.timeout));
                },
                None => std::thread::sleep(POLL_INTERVAL),
            }
        }
    }
}
