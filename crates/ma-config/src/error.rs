//! Error types for configuration loading

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML
    #[error("failed to parse YAML: {source}")]
    ParseYaml {
        #[source]
        source: serde_yaml::Error,
    },

    /// An area entry failed validation
    #[error("invalid configuration for area '{area}': {reason}")]
    InvalidArea { area: String, reason: String },
}
