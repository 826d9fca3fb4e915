#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for imgbind
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/imgbind/config.toml)
//! - Environment variables

pub mod cache;

pub use cache::CacheConfig;

use imgbind_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub network: NetworkConfig,
}

/// Network configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: None,
        }
    }
}

fn default_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    15
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("imgbind").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Save configuration to a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized
    /// or if the file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError {
                    path: parent.display().to_string(),
                    error: e.to_string(),
                })?;
        }

        let toml_string =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
                error: e.to_string(),
            })?;

        let content = format!("# imgbind configuration\n\n{toml_string}");

        fs::write(path, content)
            .await
            .map_err(|e| ConfigError::WriteError {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;

        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // IMGBIND_CACHE_POLICY
        if let Ok(policy) = std::env::var("IMGBIND_CACHE_POLICY") {
            self.cache.request_cache_policy =
                policy.parse().map_err(|value| ConfigError::InvalidValue {
                    field: "IMGBIND_CACHE_POLICY".to_string(),
                    value,
                })?;
        }

        // IMGBIND_MEMORY_CAPACITY
        if let Ok(bytes) = std::env::var("IMGBIND_MEMORY_CAPACITY") {
            self.cache.memory_capacity_bytes =
                bytes.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "IMGBIND_MEMORY_CAPACITY".to_string(),
                    value: bytes,
                })?;
        }

        // IMGBIND_DISK_CAPACITY
        if let Ok(bytes) = std::env::var("IMGBIND_DISK_CAPACITY") {
            self.cache.disk_capacity_bytes =
                bytes.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "IMGBIND_DISK_CAPACITY".to_string(),
                    value: bytes,
                })?;
        }

        // IMGBIND_TIMEOUT
        if let Ok(timeout) = std::env::var("IMGBIND_TIMEOUT") {
            self.network.timeout = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                field: "IMGBIND_TIMEOUT".to_string(),
                value: timeout,
            })?;
        }

        // IMGBIND_USER_AGENT
        if let Ok(agent) = std::env::var("IMGBIND_USER_AGENT") {
            if agent.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "IMGBIND_USER_AGENT".to_string(),
                    value: agent,
                }
                .into());
            }
            self.network.user_agent = Some(agent);
        }

        Ok(())
    }
}
