//! Manager configuration
//!
//! Loaded from TOML or assembled with [`ManagerConfigBuilder`]. Every field has a
//! default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Tunables of a [`ConfigurationManager`](crate::ConfigurationManager)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// Run the tree/registry invariant check after every applied delta
    pub verify_invariants: bool,
    /// Maximum nesting accepted in a decoded value
    pub max_value_depth: usize,
    /// Isolate panicking receivers instead of unwinding through the transport
    pub catch_receiver_panics: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            verify_invariants: cfg!(debug_assertions),
            max_value_depth: epconf_tree::DEFAULT_MAX_DEPTH,
            catch_receiver_panics: true,
        }
    }
}

/// Errors loading or validating a [`ManagerConfig`]
#[derive(Debug, Error)]
pub enum ManagerConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for this schema
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

impl ManagerConfig {
    /// Start from defaults
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::default()
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ManagerConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ManagerConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManagerConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ManagerConfigError> {
        if self.max_value_depth == 0 {
            return Err(ManagerConfigError::Invalid {
                field: "max_value_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for [`ManagerConfig`]
#[derive(Debug, Default)]
pub struct ManagerConfigBuilder {
    config: ManagerConfig,
}

impl ManagerConfigBuilder {
    /// Enable or disable the post-delta invariant check
    pub fn verify_invariants(mut self, enabled: bool) -> Self {
        self.config.verify_invariants = enabled;
        self
    }

    /// Set the nesting bound for decoded values
    pub fn max_value_depth(mut self, depth: usize) -> Self {
        self.config.max_value_depth = depth;
        self
    }

    /// Enable or disable panic isolation for receivers
    pub fn catch_receiver_panics(mut self, enabled: bool) -> Self {
        self.config.catch_receiver_panics = enabled;
        self
    }

    /// Validate and finish
    pub fn build(self) -> Result<ManagerConfig, ManagerConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
