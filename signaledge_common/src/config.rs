//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! across the SignalEdge applications.
//!
//! # Usage
//!
//! ```rust,no_run
//! use signaledge_common::config::{ConfigLoader, NodeConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = NodeConfig::load(Path::new("node.toml"))?;
//!     config.validate()?;
//!     println!("Node: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    DEFAULT_TEMPERATURE, DEFAULT_THRESHOLD, FAN_SPEED_MAX, FAN_SPEED_MIN, TICK_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

/// Common configuration fields shared across SignalEdge applications.
///
/// Embed this in application-specific configuration structs.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "signaledge-node-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

/// Node configuration: backing segment, tick cadence, and initial record.
///
/// # TOML Example
///
/// ```toml
/// segment = "probe0"
/// tick_interval_ms = 1000
/// initial_temperature = 25
/// initial_threshold = 30
///
/// [shared]
/// service_name = "signaledge-node-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Shared fields (logging, service identity).
    pub shared: SharedConfig,

    /// Backing segment name. Becomes part of the /dev/shm file name.
    pub segment: String,

    /// Update engine period in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Probe temperature at startup [°C].
    #[serde(default = "default_temperature")]
    pub initial_temperature: i32,

    /// Alert threshold at startup [°C].
    #[serde(default = "default_threshold")]
    pub initial_threshold: i32,

    /// Fan speed at startup.
    #[serde(default)]
    pub initial_fan_speed: i32,
}

fn default_tick_interval_ms() -> u64 {
    TICK_INTERVAL_MS
}

fn default_temperature() -> i32 {
    DEFAULT_TEMPERATURE
}

fn default_threshold() -> i32 {
    DEFAULT_THRESHOLD
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig {
                log_level: LogLevel::default(),
                service_name: "signaledge-node".to_string(),
            },
            segment: "probe0".to_string(),
            tick_interval_ms: TICK_INTERVAL_MS,
            initial_temperature: DEFAULT_TEMPERATURE,
            initial_threshold: DEFAULT_THRESHOLD,
            initial_fan_speed: 0,
        }
    }
}

impl NodeConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `shared.service_name` or `segment` is empty
    /// - `tick_interval_ms` is zero
    /// - `initial_fan_speed` is outside the fan range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shared.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        if self.segment.is_empty() {
            return Err(ConfigError::ValidationError(
                "segment cannot be empty".to_string(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "tick_interval_ms must be nonzero".to_string(),
            ));
        }
        if self.initial_fan_speed < FAN_SPEED_MIN || self.initial_fan_speed > FAN_SPEED_MAX {
            return Err(ConfigError::ValidationError(format!(
                "initial_fan_speed must be in [{FAN_SPEED_MIN}, {FAN_SPEED_MAX}]"
            )));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// Provides a default implementation for any type implementing
/// `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn log_level_default_is_info() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn node_config_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.tick_interval_ms, TICK_INTERVAL_MS);
        assert_eq!(config.initial_temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.initial_threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.initial_fan_speed, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_empty_segment() {
        let mut config = NodeConfig::default();
        config.segment = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn validation_rejects_zero_interval() {
        let mut config = NodeConfig::default();
        config.tick_interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn validation_rejects_out_of_range_fan() {
        let mut config = NodeConfig::default();
        config.initial_fan_speed = 9;
        assert!(config.validate().is_err());
        config.initial_fan_speed = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loader_file_not_found() {
        let result = NodeConfig::load(Path::new("/nonexistent/path/node.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn loader_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid toml {{{{").unwrap();

        let result = NodeConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn loader_success_with_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"segment = "bench_probe"

[shared]
log_level = "debug"
service_name = "bench-node"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = NodeConfig::load(file.path()).unwrap();
        assert_eq!(config.shared.log_level, LogLevel::Debug);
        assert_eq!(config.shared.service_name, "bench-node");
        assert_eq!(config.segment, "bench_probe");
        // Omitted fields fall back to defaults.
        assert_eq!(config.tick_interval_ms, TICK_INTERVAL_MS);
        assert_eq!(config.initial_threshold, DEFAULT_THRESHOLD);
        assert!(config.validate().is_ok());
    }
}
