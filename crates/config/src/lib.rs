//! Layered configuration.
//!
//! Values are merged from, in increasing priority:
//!
//! 1. built-in defaults,
//! 2. a TOML file: the one given explicitly, or `crunch.toml` in the
//!    platform configuration directory when it exists,
//! 3. environment variables prefixed `CRUNCH_`, with `__` separating nested
//!    keys (`CRUNCH_OPTIMIZER__TIMEOUT_SECS=30`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const FILE_NAME: &str = "crunch.toml";
const ENV_PREFIX: &str = "CRUNCH_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where top-level results are written, one file per input.
    pub output_dir: PathBuf,
    /// Parent of the per-run scratch root; the system temp dir when unset.
    pub scratch_dir: Option<PathBuf>,
    /// Leave the scratch root on disk after the run.
    pub keep_scratch: bool,
    /// File-name suffix of archives, both in folder mode and when nested.
    pub archive_suffix: String,
    pub optimizer: OptimizerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("crunched"),
            scratch_dir: None,
            keep_scratch: false,
            archive_suffix: ".jar".to_string(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub enabled: bool,
    /// Explicit path to `oxipng`; looked up on `PATH` when unset.
    pub program: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self { enabled: true, program: None, timeout_secs: 120 }
    }
}

impl OptimizerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Loads configuration from every source, using `file` instead of the
    /// default configuration file when given. An explicit file must exist.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) if !path.is_file() => {
                exn::bail!(ErrorKind::Invalid(format!("configuration file not found: {}", path.display())))
            },
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|path| path.is_file()),
        };
        if let Some(path) = &file {
            tracing::debug!(path = %path.display(), "Loading configuration file");
        }
        Self::from_figment(Self::figment(file.as_deref()))
    }

    /// The layered sources, without extracting or validating them.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// `crunch.toml` in the platform configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "crunch").map(|dirs| dirs.config_dir().join(FILE_NAME))
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("output_dir must not be empty".to_string()));
        }
        if self.archive_suffix.is_empty() {
            exn::bail!(ErrorKind::Invalid("archive_suffix must not be empty".to_string()));
        }
        if self.optimizer.timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("optimizer.timeout_secs must be greater than zero".to_string()));
        }
        Ok(())
    }
}
