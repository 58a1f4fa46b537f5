//! Configuration management
//!
//! This module handles loading, validation, and management of the Dozio configuration.
//! Configuration is stored in TOML format at ~/.dozio/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **storage**: SQLite database file and pool size
//! - **telegram**: Bot API endpoint and long-polling behaviour
//!
//! The bot token is never stored here; it lives in the OS keychain or in the
//! `DOZIO_BOT_TOKEN` environment variable (see [`crate::secrets`]).
//!
//! # Path Expansion
//!
//! The configuration system automatically:
//! - Expands ~ to the user's home directory
//! - Creates the data directory if it doesn't exist
//! - Canonicalizes the data directory to resolve symlinks and .. patterns
//!
//! # Examples
//!
//! ```no_run
//! use dozio_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Database: {:?}", config.database_path());
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Longest long-poll timeout Telegram honours
pub const MAX_POLL_TIMEOUT_SECS: u64 = 50;

/// Main configuration structure
///
/// Every section falls back to its defaults when missing, so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Persistence settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Telegram transport settings
    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file name, relative to the data directory
    #[serde(default = "default_database")]
    pub database: String,

    /// Maximum connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Base URL of the Bot API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Long-poll timeout for getUpdates (seconds, 1-50)
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Pause after a failed poll before trying again (seconds)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.dozio")
}

fn default_database() -> String {
    "dozio.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_retry_delay() -> u64 {
    5
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            poll_timeout_secs: default_poll_timeout(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.dozio/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&contents)
    }

    /// Parse, validate and process configuration text
    pub fn from_toml(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;
        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        // Serialize before processing so ~ stays unexpanded in the file
        let defaults = Self::default_config();
        let toml_string = toml::to_string_pretty(&defaults)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = defaults;
        config.validate_and_process()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.dozio/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".dozio").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            storage: StorageConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }

    /// Full path of the SQLite database
    pub fn database_path(&self) -> PathBuf {
        self.core.data_dir.join(&self.storage.database)
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates field ranges
    /// - Expands ~ in the data directory
    /// - Creates and canonicalizes the data directory
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        // Validate log level
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        // Validate storage
        if self.storage.database.trim().is_empty() {
            return Err(EngineError::Config(
                "storage.database must not be empty".to_string(),
            ));
        }
        if self.storage.max_connections == 0 {
            return Err(EngineError::Config(
                "storage.max_connections must be at least 1".to_string(),
            ));
        }

        // Validate telegram
        if !self.telegram.api_base.starts_with("http://")
            && !self.telegram.api_base.starts_with("https://")
        {
            return Err(EngineError::Config(format!(
                "telegram.api_base must be an http(s) URL, got '{}'",
                self.telegram.api_base
            )));
        }
        if !(1..=MAX_POLL_TIMEOUT_SECS).contains(&self.telegram.poll_timeout_secs) {
            return Err(EngineError::Config(format!(
                "telegram.poll_timeout_secs must be between 1 and {}",
                MAX_POLL_TIMEOUT_SECS
            )));
        }
        self.telegram.api_base = self.telegram.api_base.trim_end_matches('/').to_string();

        // Expand, create and canonicalize the data directory
        self.core.data_dir = expand_path(&self.core.data_dir)?;
        self.core.data_dir = canonicalize_or_create(&self.core.data_dir)?;

        if !self.core.data_dir.is_dir() {
            return Err(EngineError::Config(format!(
                "Data path is not a directory: {:?}",
                self.core.data_dir
            )));
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

/// Canonicalize path, creating it if it doesn't exist
fn canonicalize_or_create(path: &Path) -> Result<PathBuf, EngineError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            EngineError::Config(format!("Failed to create directory {:?}: {}", path, e))
        })?;
    }

    path.canonicalize()
        .map_err(|e| EngineError::PathCanonicalization(path.to_path_buf(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.storage.database, "dozio.db");
        assert_eq!(config.storage.max_connections, 5);
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.telegram.poll_timeout_secs, 30);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.storage.database, deserialized.storage.database);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("[core]\nlog_level = \"debug\"\n").unwrap();

        assert_eq!(config.core.log_level, "debug");
        assert_eq!(config.storage.max_connections, 5);
        assert_eq!(config.telegram.retry_delay_secs, 5);
    }
}
