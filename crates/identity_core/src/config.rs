//! Store configuration loaded from TOML.
//!
//! # Responsibility
//! - Resolve named connection strings to `DatabaseSettings`.
//! - Carry retry, busy-timeout and logging settings.
//!
//! # Invariants
//! - Connection strings are passed to the driver untouched.
//! - Missing sections fall back to the core defaults.

use crate::db::{DatabaseSettings, RetryPolicy};
use crate::logging::default_log_level;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Connection string name used when the caller does not pick one.
pub const DEFAULT_CONNECTION_NAME: &str = "DefaultConnection";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub connection_strings: BTreeMap<String, String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub open_retries: u32,
    pub retry_delay_ms: u64,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            open_retries: retry.retries,
            retry_delay_ms: retry.delay.as_millis() as u64,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    pub dir: PathBuf,
}

fn default_level() -> String {
    default_log_level().to_string()
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    MissingConnectionString(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::MissingConnectionString(name) => {
                write!(f, "connection string `{name}` is not configured")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::MissingConnectionString(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl StoreConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn connection_string(&self, name: &str) -> Result<&str, ConfigError> {
        self.connection_strings
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::MissingConnectionString(name.to_string()))
    }

    /// Settings for the connection string called `name`.
    pub fn database_settings(&self, name: &str) -> Result<DatabaseSettings, ConfigError> {
        let connection_string = self.connection_string(name)?;
        let mut settings = DatabaseSettings::new(connection_string);
        settings.retry = RetryPolicy::new(
            self.database.open_retries,
            Duration::from_millis(self.database.retry_delay_ms),
        );
        settings.busy_timeout = Duration::from_millis(self.database.busy_timeout_ms);
        Ok(settings)
    }

    pub fn default_database_settings(&self) -> Result<DatabaseSettings, ConfigError> {
        self.database_settings(DEFAULT_CONNECTION_NAME)
    }
}
