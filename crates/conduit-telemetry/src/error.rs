//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The global subscriber was already installed.
    #[error("global tracing subscriber already set")]
    AlreadyInitialized,

    /// The env-filter directive string failed to parse.
    #[error("invalid log directive {directive:?}: {reason}")]
    InvalidDirective {
        /// The directive string that failed to parse.
        directive: String,
        /// Why it failed.
        reason: String,
    },

    /// The log file's parent directory could not be created.
    #[error("failed to create log directory {path}: {source}")]
    IoError {
        /// The directory that could not be created.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
