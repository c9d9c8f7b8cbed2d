//! Configuration management for the OVSDB client
//!
//! This module handles loading, parsing, and validating the client
//! configuration from files and environment variables. The protocol layer
//! exposes exactly one tunable: the RPC timeout.

use crate::error::{OvsdbError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable that overrides the configured RPC timeout.
pub const ENV_RPC_TIMEOUT_SECONDS: &str = "OVSDB_RPC_TIMEOUT_SECONDS";

/// Client configuration
///
/// Holds the settings applied to every connection created from it. The
/// single protocol-level tunable is `rpc_timeout_secs`, the number of
/// seconds an outstanding RPC call may wait for its response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Seconds to wait for a response before a call fails with a timeout
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
}

fn default_rpc_timeout_secs() -> u64 {
    60
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_secs: default_rpc_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(OvsdbError::Io)?;
        let mut config: ClientConfig = serde_yaml::from_str(&contents).map_err(OvsdbError::Yaml)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply `OVSDB_*` environment variable overrides.
    ///
    /// Invalid values are logged and ignored, leaving the previous value in
    /// place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(timeout) = std::env::var(ENV_RPC_TIMEOUT_SECONDS) {
            if let Ok(secs) = timeout.parse::<u64>() {
                self.rpc_timeout_secs = secs;
            } else {
                tracing::warn!("Invalid {}: {}", ENV_RPC_TIMEOUT_SECONDS, timeout);
            }
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OvsdbError::Config`] if the RPC timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.rpc_timeout_secs == 0 {
            return Err(OvsdbError::Config(
                "rpc_timeout_secs must be greater than zero".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// The configured RPC timeout as a [`Duration`].
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}
