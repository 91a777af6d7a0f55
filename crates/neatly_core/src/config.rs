//! Client configuration.
//!
//! # Responsibility
//! - Load client settings from TOML and environment overrides.
//! - Normalize timeout and log settings before they reach the transport.
//!
//! # Invariants
//! - `request_timeout_ms` is always within `1..=MAX_REQUEST_TIMEOUT_MS`.
//! - `log_dir`, when set, is an absolute path.
//! - Environment variables override file values.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "http://localhost:10000/";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
pub const MAX_REQUEST_TIMEOUT_MS: u64 = 120_000;

const ENV_BASE_URL: &str = "NEATLY_BASE_URL";
const ENV_TIMEOUT_MS: &str = "NEATLY_TIMEOUT_MS";
const ENV_LOG_LEVEL: &str = "NEATLY_LOG_LEVEL";
const ENV_LOG_DIR: &str = "NEATLY_LOG_DIR";
const ENV_LOCAL_DB: &str = "NEATLY_LOCAL_DB";

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config file: {err}"),
            Self::Invalid(message) => write!(f, "invalid config value: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Settings for one client process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Root URL of the REST store; `api/v1/` is appended per request.
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub log_level: String,
    /// Absolute directory for rolling log files; stderr when unset.
    pub log_dir: Option<PathBuf>,
    /// Local SQLite store used instead of the REST store when set.
    pub local_db: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            log_level: default_log_level().to_string(),
            log_dir: None,
            local_db: None,
        }
    }
}

impl ClientConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parses and validates TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validated()
    }

    /// Applies `NEATLY_*` environment overrides.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_BASE_URL) {
            self.base_url = value;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            self.request_timeout_ms = value.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_TIMEOUT_MS} must be an integer, got `{value}`"))
            })?;
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.log_level = value;
        }
        if let Some(value) = lookup(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(ENV_LOCAL_DB) {
            self.local_db = Some(PathBuf::from(value));
        }
        self.validated()
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.base_url = self.base_url.trim().to_string();
        if self.base_url.is_empty() {
            return Err(ConfigError::Invalid("base_url cannot be empty".to_string()));
        }
        self.request_timeout_ms = self.request_timeout_ms.clamp(1, MAX_REQUEST_TIMEOUT_MS);
        if let Some(dir) = self.log_dir.as_ref() {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(self)
    }
}
