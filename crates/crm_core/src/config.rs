//! Core configuration: database location, logging and report defaults.
//!
//! Loaded from an optional JSON file, then overridden by `CRM_DB_PATH`,
//! `CRM_LOG_LEVEL` and `CRM_LOG_DIR`.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::{default_log_level, init_logging, LoggingError};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "CRM_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "CRM_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CRM_LOG_DIR";

/// Values used when a report or history call does not pass its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportDefaults {
    pub forecast_days: i64,
    pub follow_up_overdue_days: i64,
    pub history_limit: u32,
}

impl Default for ReportDefaults {
    fn default() -> Self {
        Self {
            forecast_days: 30,
            follow_up_overdue_days: 3,
            history_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    pub log_level: Option<String>,
    /// Logging stays off unless a directory is configured.
    pub log_dir: Option<PathBuf>,
    pub reports: ReportDefaults,
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Logging(LoggingError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Logging(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Logging(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<LoggingError> for ConfigError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl CoreConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON config file and applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_json_str(&json)?.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Applies overrides from `lookup`; empty values are ignored.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = Some(level);
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Opens and migrates the configured database.
    pub fn open_connection(&self) -> DbResult<Connection> {
        match &self.db_path {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }

    /// Starts logging when `log_dir` is set; otherwise does nothing.
    pub fn init_logging(&self) -> Result<(), ConfigError> {
        let Some(log_dir) = &self.log_dir else {
            return Ok(());
        };
        let level = self.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
        Ok(())
    }
}
