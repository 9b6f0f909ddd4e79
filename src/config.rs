//! Configuration for nslog registries

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::{DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE, REQUEST_ID_HEADER, TRACE_ID_HEADER};

/// Namespace used by the default logger
pub const DEFAULT_NAMESPACE: &str = "default";

/// Problems found when validating a [`LoggingConfig`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("buffer size {size} is below the minimum of {min}")]
    BufferSizeTooSmall { size: usize, min: usize },

    #[error("default namespace must not be empty")]
    EmptyNamespace,

    #[error("correlation header at position {index} is empty")]
    EmptyHeaderName { index: usize },
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Namespace of the default logger (default: "default")
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    /// Entries kept per namespace unless a logger pins its own size
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Echo every entry to the console sink
    #[serde(default = "default_print_enabled")]
    pub print_enabled: bool,

    /// Response headers kept by the default error parser
    #[serde(default = "default_correlation_headers")]
    pub correlation_headers: Vec<String>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_print_enabled() -> bool {
    true
}

fn default_correlation_headers() -> Vec<String> {
    vec![REQUEST_ID_HEADER.to_string(), TRACE_ID_HEADER.to_string()]
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_namespace: default_namespace(),
            buffer_size: default_buffer_size(),
            print_enabled: default_print_enabled(),
            correlation_headers: default_correlation_headers(),
        }
    }
}

impl LoggingConfig {
    /// Load configuration from the default file, or return defaults if not found
    pub fn load() -> Result<Self> {
        let path = config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from a file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(ConfigError::BufferSizeTooSmall {
                size: self.buffer_size,
                min: MIN_BUFFER_SIZE,
            });
        }
        if self.default_namespace.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        if let Some(index) = self.correlation_headers.iter().position(|h| h.trim().is_empty()) {
            return Err(ConfigError::EmptyHeaderName { index });
        }
        Ok(())
    }
}

/// Get the base configuration directory (~/.nslog)
/// Falls back to ./.nslog if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".nslog")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".nslog"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
