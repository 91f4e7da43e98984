//! Configuration management for qanda.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "qanda";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "records.db";

/// Shown in place of secrets.
const REDACTED: &str = "********";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `QANDA_`, `__` between sections)
/// 2. TOML config file at `~/.config/qanda/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which store backs the record list.
    pub store: StoreConfig,
    /// Local `SQLite` store configuration.
    pub sqlite: SqliteConfig,
    /// Hosted realtime database configuration.
    pub firebase: FirebaseConfig,
}

/// The kind of store the application talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Durable local database file.
    #[default]
    Sqlite,
    /// Process-local store, lost on exit.
    Memory,
    /// Hosted realtime database over its REST API.
    Firebase,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Memory => write!(f, "memory"),
            Self::Firebase => write!(f, "firebase"),
        }
    }
}

/// Store selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend to use.
    pub backend: Backend,
}

/// `SQLite` store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/qanda/records.db`
    pub database_path: Option<PathBuf>,
    /// How often to check for commits made by other processes, in milliseconds.
    pub poll_interval_ms: u64,
}

/// Hosted realtime database configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    /// Database URL, e.g. `https://<project>-default-rtdb.firebaseio.com`.
    pub database_url: String,
    /// Path of the collection holding the records. Empty means the database root.
    pub collection: String,
    /// Optional credential sent as the `auth` query parameter.
    pub auth_token: Option<String>,
    /// Delay before re-opening a dropped event stream, in milliseconds.
    pub reconnect_delay_ms: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Resolved to default at runtime
            poll_interval_ms: 500,
        }
    }
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            collection: String::new(),
            auth_token: None,
            reconnect_delay_ms: 3_000,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("QANDA_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// Firebase settings are only checked when that backend is selected.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.sqlite.poll_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "sqlite.poll_interval_ms must be greater than 0".to_string(),
            });
        }

        if self.store.backend == Backend::Firebase {
            let url = self.firebase.database_url.trim();
            if url.is_empty() {
                return Err(Error::ConfigValidation {
                    message: "firebase.database_url is required for the firebase backend"
                        .to_string(),
                });
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::ConfigValidation {
                    message: format!(
                        "firebase.database_url must start with http:// or https://: {url}"
                    ),
                });
            }
            if self.firebase.reconnect_delay_ms == 0 {
                return Err(Error::ConfigValidation {
                    message: "firebase.reconnect_delay_ms must be greater than 0".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.sqlite
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the external-change poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.sqlite.poll_interval_ms)
    }

    /// Get the event stream reconnect delay as a Duration.
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.firebase.reconnect_delay_ms)
    }

    /// A copy safe to print: the auth token, if any, is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if let Some(token) = config.firebase.auth_token.as_mut() {
            *token = REDACTED.to_string();
        }
        config
    }
}
