//! Configuration handling for SchemaMirror

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;

use crate::error::{Error, Result};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "schema_mirror.toml";

/// Load configuration from a TOML file
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file {}: {}", path, e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file {}: {}", path, e)))?;

    Ok(config)
}

/// Represents the complete SchemaMirror configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub connections: HashMap<String, ConnectionConfig>,
    #[serde(default)]
    pub sync: SyncConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    /// Look up a named connection
    pub fn connection(&self, name: &str) -> Result<&ConnectionConfig> {
        self.connections
            .get(name)
            .ok_or_else(|| Error::ConfigError(format!("Unknown connection: {}", name)))
    }

    /// Merge the configured default ignore list with extra table names.
    ///
    /// Names are trimmed; empty entries and duplicates are dropped.
    pub fn resolve_ignore_tables<I, S>(&self, extra: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let configured = self.sync.default_ignore_tables.iter().map(String::as_str);
        let mut tables: BTreeSet<String> = configured
            .map(|name| name.trim().to_string())
            .collect();
        tables.extend(extra.into_iter().map(|name| name.as_ref().trim().to_string()));
        tables.retain(|name| !name.is_empty());
        tables
    }
}

/// A named database connection, either live or a JSON snapshot on disk
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ConnectionConfig {
    pub url: Option<String>,
    pub snapshot: Option<String>,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

/// Sync behaviour and output locations
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default)]
    pub default_ignore_tables: Vec<String>,
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default = "default_migrations_path")]
    pub migrations_path: String,
    #[serde(default)]
    pub strict_defaults: bool,
    #[serde(default = "default_engine")]
    pub engine: String,
    /// One clause per line in generated statements
    #[serde(default)]
    pub pretty: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_ignore_tables: Vec::new(),
            output_path: default_output_path(),
            migrations_path: default_migrations_path(),
            strict_defaults: false,
            engine: default_engine(),
            pretty: false,
        }
    }
}

fn default_output_path() -> String {
    "database/schema-sync".to_string()
}

fn default_migrations_path() -> String {
    "database/migrations".to_string()
}

fn default_engine() -> String {
    "InnoDB".to_string()
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_stdout")]
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            format: default_log_format(),
            stdout: default_log_stdout(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_stdout() -> bool {
    true
}
