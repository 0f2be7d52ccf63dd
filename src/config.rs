// src/config.rs
//! Queue configuration
//!
//! Read from an optional TOML file; every key has a default:
//!
//! ```toml
//! event_capacity = 64          # change notifications buffered per subscriber
//! max_dependency_depth = 32    # auto-dependency expansion limit
//! max_control_size = 1048576   # largest accepted control file, in bytes
//! ```

use crate::error::{Error, Result};
use crate::packages::archive_utils::MAX_CONTROL_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for a [`crate::Queue`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Capacity of the change notification channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// How many levels of auto-pulled dependencies are followed
    #[serde(default = "default_max_dependency_depth")]
    pub max_dependency_depth: usize,

    /// Maximum size of a local package's control file
    #[serde(default = "default_max_control_size")]
    pub max_control_size: u64,
}

fn default_event_capacity() -> usize {
    64
}

fn default_max_dependency_depth() -> usize {
    32
}

fn default_max_control_size() -> u64 {
    MAX_CONTROL_SIZE
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            max_dependency_depth: default_max_dependency_depth(),
            max_control_size: default_max_control_size(),
        }
    }
}

impl QueueConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: QueueConfig = toml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(Error::ConfigError(
                "event_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_dependency_depth == 0 {
            return Err(Error::ConfigError(
                "max_dependency_depth must be at least 1".to_string(),
            ));
        }
        if self.max_control_size == 0 {
            return Err(Error::ConfigError(
                "max_control_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
