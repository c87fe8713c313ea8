//! Planner runtime configuration.
//!
//! # Responsibility
//! - Provide defaults for storage, logging and planning parameters.
//! - Load overrides from an optional JSON file.
//!
//! # Invariants
//! - A loaded config has passed `validate()`.
//! - Fields missing from the file keep their defaults.

use crate::grid::reconcile::ReconcilePolicy;
use crate::logging::default_log_level;
use crate::model::week::DEFAULT_WEEK_COUNT;
use crate::report::utilization::DEFAULT_FULL_TIME_HOURS;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Default SQLite database file name.
pub const DEFAULT_DB_FILE_NAME: &str = "resplan.sqlite3";
/// Upper bound for the week window.
pub const MAX_WEEK_COUNT: usize = 52;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        message: String,
    },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "failed to parse config `{}`: {message}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    pub db_path: PathBuf,
    /// Absolute log directory; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub week_count: usize,
    pub full_time_hours: f64,
    pub policy: ReconcilePolicy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_dir: None,
            log_level: default_log_level().to_string(),
            week_count: DEFAULT_WEEK_COUNT,
            full_time_hours: DEFAULT_FULL_TIME_HOURS,
            policy: ReconcilePolicy::default(),
        }
    }
}

impl PlannerConfig {
    /// Reads a JSON config file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.week_count == 0 || self.week_count > MAX_WEEK_COUNT {
            return Err(ConfigError::Invalid(format!(
                "week_count must be within 1..={MAX_WEEK_COUNT}, got {}",
                self.week_count
            )));
        }
        if !self.full_time_hours.is_finite() || self.full_time_hours <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "full_time_hours must be positive, got {}",
                self.full_time_hours
            )));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path must not be empty".to_string()));
        }
        Ok(())
    }
}
