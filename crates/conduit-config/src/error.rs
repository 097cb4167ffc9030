//! Configuration error types.

use thiserror::Error;

/// Errors that can occur while loading or validating the daemon's config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be parsed as YAML.
    #[error("failed to parse config at {path}: {source}")]
    ParseError {
        /// The file that failed to parse.
        path: String,
        /// The underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A config file could not be read.
    #[error("failed to read config at {path}: {source}")]
    IoError {
        /// The file that failed to read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The merged configuration failed validation.
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
