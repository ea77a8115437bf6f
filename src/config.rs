// src/config.rs
//! Configuration file parsing
//!
//! Supports a TOML configuration file with the following sections:
//! - [database] - Location of the history database
//! - [history] - Defaults for history listings
//!
//! Precedence, lowest to highest: built-in defaults, the config file,
//! the `SWDB_DB_PATH` environment variable, command-line flags.

use crate::db::paths::{DB_PATH_ENV, DEFAULT_DB_PATH};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct HistoryConfig {
    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub history: HistorySection,
}

/// Database location
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// History listing defaults
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HistorySection {
    /// Number of transactions `list` shows when no limit is given (0 = all)
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_PATH)
}

fn default_limit() -> usize {
    20
}

impl HistoryConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        Self::parse(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file {}: {}", path.display(), e)))
    }

    /// Load the file if it exists, otherwise use defaults; then apply the environment
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            debug!("Loading configuration from {}", path.display());
            Self::load(path)?
        } else {
            debug!("No configuration at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply `SWDB_DB_PATH` when set and non-empty
    pub fn apply_env(&mut self) {
        if let Some(path) = std::env::var_os(DB_PATH_ENV).filter(|p| !p.is_empty()) {
            self.database.path = PathBuf::from(path);
        }
    }

    /// Listing limit, `None` meaning unlimited
    pub fn list_limit(&self) -> Option<usize> {
        match self.history.default_limit {
            0 => None,
            limit => Some(limit),
        }
    }
}
