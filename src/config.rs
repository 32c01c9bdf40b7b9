//! Configuration module for Depot.

use serde::Deserialize;
use std::path::Path;

use crate::{DepotError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/depot.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Content storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Storage backend: "local", "memory" or "database".
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Root directory for the local filesystem backend.
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
    /// Interval between copy-completion polls, in milliseconds.
    #[serde(default = "default_copy_poll_interval")]
    pub copy_poll_interval_ms: u64,
    /// Maximum number of copy-completion polls before the operation times out.
    #[serde(default = "default_copy_max_polls")]
    pub copy_max_polls: u32,
    /// Lifetime of generated download URLs, in seconds.
    #[serde(default = "default_download_url_ttl")]
    pub download_url_ttl_secs: u64,
}

fn default_backend() -> String {
    "local".to_string()
}

fn default_storage_root() -> String {
    "data/objects".to_string()
}

fn default_max_upload_size() -> u64 {
    10
}

fn default_copy_poll_interval() -> u64 {
    100
}

fn default_copy_max_polls() -> u32 {
    50
}

fn default_download_url_ttl() -> u64 {
    3600
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            root: default_storage_root(),
            max_upload_size_mb: default_max_upload_size(),
            copy_poll_interval_ms: default_copy_poll_interval(),
            copy_max_polls: default_copy_max_polls(),
            download_url_ttl_secs: default_download_url_ttl(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/depot.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Content storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| DepotError::Config(e.to_string()))?;
        Ok(config)
    }
}
