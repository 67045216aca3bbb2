//! Layered configuration.
//!
//! Values are merged from, in increasing priority:
//!
//! 1. built-in defaults,
//! 2. a TOML file (`--config`, or `sweep/config.toml` in the platform
//!    configuration directory),
//! 3. environment variables prefixed with `SWEEP_`, nested with `__`
//!    (`SWEEP_DIRECTORIES__STAGING=/media/New`).
//!
//! ```toml
//! dev = false
//! proceed_when_idle = false
//!
//! [directories]
//! staging = "/Volumes/Media/New"
//! archive = "/Volumes/Archive/Media_Archive"
//! graveyard = "/Volumes/Archive/Graveyard"
//!
//! [lister]
//! timeout_secs = 300
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::{BaseDirs, ProjectDirs};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sweep_library::{CompareMode, DEV_SUFFIX, Directories};

pub const ENV_PREFIX: &str = "SWEEP_";
pub const DEFAULT_TRANSMISSION_URL: &str = "http://localhost:9091/transmission/rpc";

/// Location of the configuration file when none is given explicitly.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "sweep").map(|dirs| dirs.config_dir().join("config.toml"))
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Run against the development tree: every directory gets `__DEV` appended.
    pub dev: bool,
    /// Dispose of every staged object even when nothing is downloading. By
    /// default an empty active set ends the run without touching anything.
    pub proceed_when_idle: bool,
    pub directories: DirectoriesConfig,
    pub lookup: LookupConfig,
    pub lister: ListerConfig,
    pub transmission: TransmissionConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DirectoriesConfig {
    pub staging: Option<PathBuf>,
    pub archive: Option<PathBuf>,
    pub graveyard: Option<PathBuf>,
    pub trash: Option<PathBuf>,
}
impl Default for DirectoriesConfig {
    fn default() -> Self {
        Self {
            staging: None,
            archive: None,
            graveyard: None,
            trash: BaseDirs::new().map(|dirs| dirs.home_dir().join(".Trash")),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// `staged` or `legacy`.
    pub compare: String,
}
impl Default for LookupConfig {
    fn default() -> Self {
        Self { compare: CompareMode::default().as_str().to_string() }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ListerConfig {
    /// Discovered in `PATH` when unset.
    pub program: Option<PathBuf>,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}
impl Default for ListerConfig {
    fn default() -> Self {
        Self { program: None, args: vec!["l".to_string()], timeout_secs: 120 }
    }
}
impl ListerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TransmissionConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}
impl Default for TransmissionConfig {
    fn default() -> Self {
        Self { url: DEFAULT_TRANSMISSION_URL.to_string(), username: None, password: None, timeout_secs: 30 }
    }
}
impl TransmissionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// The provider stack, without extracting it.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let figment = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::FileNotFound(path.to_path_buf())),
            Some(path) => Figment::new().merge(Toml::file_exact(path)),
            None => match default_path() {
                Some(path) => Figment::new().merge(Toml::file_exact(path)),
                None => Figment::new(),
            },
        };
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(path)?)
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|e| ErrorKind::Invalid(e.to_string()))?;
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }

    pub fn compare_mode(&self) -> Result<CompareMode> {
        Ok(self.lookup.compare.parse().map_err(|e: sweep_library::error::ErrorKind| {
            ErrorKind::Invalid(format!("lookup.compare: {e}"))
        })?)
    }

    /// Validated role directories, with the development suffix applied when
    /// `dev` is set.
    ///
    /// # Errors
    /// Every directory must be configured and absolute, and the (suffixed)
    /// staging directory must exist.
    pub fn directories(&self) -> Result<Directories> {
        fn required(value: &Option<PathBuf>, key: &'static str) -> Result<PathBuf> {
            let Some(path) = value else {
                exn::bail!(ErrorKind::MissingDirectory(key));
            };
            if !path.is_absolute() {
                exn::bail!(ErrorKind::RelativeDirectory(key, path.clone()));
            }
            Ok(path.clone())
        }
        let dirs = &self.directories;
        let mut directories = Directories {
            staging: required(&dirs.staging, "staging")?,
            archive: required(&dirs.archive, "archive")?,
            graveyard: required(&dirs.graveyard, "graveyard")?,
            trash: required(&dirs.trash, "trash")?,
        };
        if self.dev {
            directories = directories.with_suffix(DEV_SUFFIX);
            tracing::warn!(staging = %directories.staging.display(), "Running against the development tree");
        }
        if !directories.staging.is_dir() {
            exn::bail!(ErrorKind::StagingMissing(directories.staging));
        }
        Ok(directories)
    }
}
