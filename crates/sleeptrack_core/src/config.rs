//! Runtime configuration for core callers.
//!
//! # Responsibility
//! - Resolve database and logging settings from the environment.
//!
//! # Invariants
//! - Blank environment values behave as unset.
//! - Logging stays disabled unless a log directory is configured.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "SLEEPTRACK_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "SLEEPTRACK_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "SLEEPTRACK_LOG_DIR";
const DEFAULT_DB_FILE_NAME: &str = "sleeptrack.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite database file holding the night table.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables file logs.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Builds a config from `SLEEPTRACK_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let defaults = Self::default();
        Self {
            db_path: value(DB_PATH_ENV).map_or(defaults.db_path, PathBuf::from),
            log_level: value(LOG_LEVEL_ENV).unwrap_or(defaults.log_level),
            log_dir: value(LOG_DIR_ENV).map(PathBuf::from),
        }
    }
}
