//! Client configuration.
//!
//! Resolution order, later wins:
//!
//! 1. [`ClientConfig::default`]
//! 2. `{data_dir}/config.json`, if present
//! 3. `DOCCHAT_*` environment variables
//! 4. Command-line flags (applied by the binary)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paths::default_data_dir;

pub const DEFAULT_BASE_URL: &str = "http://localhost:9000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const CONFIG_FILE_NAME: &str = "config.json";

pub const ENV_BASE_URL: &str = "DOCCHAT_BASE_URL";
pub const ENV_DATA_DIR: &str = "DOCCHAT_DATA_DIR";
pub const ENV_LOG_DIR: &str = "DOCCHAT_LOG_DIR";
pub const ENV_TIMEOUT_SECS: &str = "DOCCHAT_TIMEOUT_SECS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Cannot determine data directory (HOME and USERPROFILE unset)")]
    NoDataDir,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Backend root, without a trailing slash.
    pub base_url: String,

    /// Where history and `config.json` live. `None` means `~/.docchat`.
    pub data_dir: Option<PathBuf>,

    /// Directory for wire logs. `None` disables them.
    pub log_dir: Option<PathBuf>,

    /// Per-request timeout for the HTTP collaborators.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: None,
            log_dir: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Build the config from defaults, the data-dir config file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Like [`ClientConfig::load`], reading variables through `env`.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // The data dir may itself come from the environment, so look there first
        // to find the config file.
        let data_dir = match non_empty(env(ENV_DATA_DIR)) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir().ok_or(ConfigError::NoDataDir)?,
        };

        let mut config = Self::from_file(&data_dir.join(CONFIG_FILE_NAME))?.unwrap_or_default();
        config.apply_env(env)?;
        Ok(config)
    }

    /// Read a config file. `Ok(None)` when it does not exist.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(Some(config))
    }

    /// Overlay `DOCCHAT_*` variables.
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(url) = non_empty(env(ENV_BASE_URL)) {
            self.base_url = url;
        }
        if let Some(dir) = non_empty(env(ENV_DATA_DIR)) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = non_empty(env(ENV_LOG_DIR)) {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(value) = non_empty(env(ENV_TIMEOUT_SECS)) {
            self.request_timeout_secs = parse_timeout(&value).ok_or(ConfigError::InvalidValue {
                name: ENV_TIMEOUT_SECS,
                value,
            })?;
        }
        Ok(())
    }

    /// The effective data directory.
    pub fn resolved_data_dir(&self) -> Result<PathBuf, ConfigError> {
        self.data_dir
            .clone()
            .or_else(default_data_dir)
            .ok_or(ConfigError::NoDataDir)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Join `path` onto the base URL, tolerating a trailing slash on either side.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_timeout(value: &str) -> Option<u64> {
    value.parse::<u64>().ok().filter(|secs| *secs > 0)
}
