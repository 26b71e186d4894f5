//! Configuration loading for the chat client.
//!
//! Configuration is loaded from a TOML file with a single `[store]` table:
//!
//! ```toml
//! [store]
//! host = "localhost"
//! port = 6005
//! provider = "demo"
//! token = "demoToken"
//! use_ssl = false
//! db_in_memory = true
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::store::ConnectOptions;

/// Root configuration for the chat client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatConfig {
    /// Store connection and authentication.
    #[serde(default)]
    pub store: StoreConfig,
}

/// Store connection and authentication settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store host name (default: localhost).
    #[serde(default = "default_host")]
    pub host: String,
    /// Store port (default: 6005).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Authentication provider id (default: demo).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Provider token (default: demoToken).
    #[serde(default = "default_token")]
    pub token: String,
    /// Use TLS (default: false).
    #[serde(default)]
    pub use_ssl: bool,
    /// Keep the store's local cache in memory (default: true).
    #[serde(default = "default_db_in_memory")]
    pub db_in_memory: bool,
}

// Default value functions
fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    6005
}

fn default_provider() -> String {
    "demo".to_string()
}

fn default_token() -> String {
    "demoToken".to_string()
}

fn default_db_in_memory() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            provider: default_provider(),
            token: default_token(),
            use_ssl: false,
            db_in_memory: default_db_in_memory(),
        }
    }
}

impl ChatConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no store would accept.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.host.trim().is_empty() {
            return Err(ConfigError::Invalid("store.host must not be empty".into()));
        }
        if self.store.port == 0 {
            return Err(ConfigError::Invalid("store.port must not be 0".into()));
        }
        if self.store.provider.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "store.provider must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Options handed to [`Store::connect`](crate::store::Store::connect).
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            host: self.store.host.clone(),
            port: self.store.port,
            use_ssl: self.store.use_ssl,
            db_in_memory: self.store.db_in_memory,
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to parse inline configuration.
    #[error("failed to parse config: {0}")]
    Syntax(#[from] toml::de::Error),
    /// Parsed but unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}
