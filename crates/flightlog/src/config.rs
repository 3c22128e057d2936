//! Configuration management for flightlog.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::SchemaSource;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flightlog";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "logbook.db";

/// Default export file name.
const EXPORT_FILE_NAME: &str = "flights.csv";

/// Default quotes file name.
const QUOTES_FILE_NAME: &str = "quotes.json";

/// Prefix of environment variable overrides.
const ENV_PREFIX: &str = "OFL_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `OFL_`, sections split on `__`,
///    e.g. `OFL_SERVER__PORT=8080`)
/// 2. TOML config file at `~/.config/flightlog/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Web server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Export configuration.
    pub export: ExportConfig,
    /// Quote of the day configuration.
    pub quotes: QuotesConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Web server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/flightlog/logbook.db`
    pub database_path: Option<PathBuf>,
    /// Schema script applied to a new database.
    /// Defaults to the script built into the binary.
    pub schema_path: Option<PathBuf>,
}

/// Export-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Where CSV exports are written.
    /// Defaults to `~/.local/share/flightlog/flights.csv`
    pub path: Option<PathBuf>,
}

/// Quote of the day configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotesConfig {
    /// JSON file with a `quotes` list.
    /// Defaults to `~/.local/share/flightlog/quotes.json`
    pub path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write logs to this file.
    pub file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9966,
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
    /// A missing config file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

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
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "server.host must not be empty".to_string(),
            });
        }

        if self.server.port == 0 {
            return Err(Error::ConfigValidation {
                message: "server.port must be greater than 0".to_string(),
            });
        }

        if let Some(path) = &self.export.path {
            if path.file_name().is_none() {
                return Err(Error::ConfigValidation {
                    message: format!("export.path {} has no file name", path.display()),
                });
            }
        }

        Ok(())
    }

    /// Socket address string for the web server.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Where the schema for a new database comes from.
    #[must_use]
    pub fn schema_source(&self) -> SchemaSource {
        SchemaSource::from_path(self.storage.schema_path.clone())
    }

    /// Get the export path, resolving defaults if not set.
    #[must_use]
    pub fn export_path(&self) -> PathBuf {
        self.export
            .path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(EXPORT_FILE_NAME))
    }

    /// Get the quotes file path, resolving defaults if not set.
    #[must_use]
    pub fn quotes_path(&self) -> PathBuf {
        self.quotes
            .path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(QUOTES_FILE_NAME))
    }
}
