//! The unified error type returned across the core's public API.

use thiserror::Error;

/// Errors surfaced by any core component (Store, Policy Engine, Lifecycle
/// Manager, Runtime Provider, Adapter Registry).
///
/// Variants correspond to the error kinds named in the specification's
/// error-handling design, not to the internal type a component used to
/// produce them — callers match on these kinds, not on which crate raised
/// them.
#[derive(Debug, Error)]
pub enum ConduitError {
    /// The named entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (`"instance"`, `"binding"`, `"backup"`, `"operation"`).
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// A uniqueness constraint was violated, or a state transition was
    /// attempted from a state that does not allow it.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request was malformed (unknown client id, invalid scope, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The Policy Engine refused the request.
    #[error("policy denied: {}", .block_reasons.join("; "))]
    PolicyDenied {
        /// Human-readable reasons the request was blocked.
        block_reasons: Vec<String>,
    },

    /// No container runtime (Podman/Docker) could be selected.
    #[error("no container runtime available")]
    RuntimeUnavailable,

    /// A runtime child-process operation (pull/start/stop/remove) failed.
    #[error("runtime operation failed: {0}")]
    RuntimeFailed(String),

    /// An adapter encountered a client config file it could not parse.
    /// The original file on disk is left untouched.
    #[error("invalid client config at {path}: {reason}")]
    InvalidConfig {
        /// Path to the unparseable config file.
        path: String,
        /// Parse failure detail.
        reason: String,
    },

    /// The persistence backend faulted.
    #[error("store error: {0}")]
    StoreError(String),

    /// The consent ledger's hash chain failed verification.
    #[error("consent ledger corruption at entry {entry_id}: {reason}")]
    Corruption {
        /// The first entry at which the chain no longer verifies.
        entry_id: i64,
        /// What about it failed to verify.
        reason: String,
    },

    /// A cancellation token fired while the operation was in flight.
    #[error("operation cancelled")]
    Cancelled,

    /// Wraps a lower-level I/O failure (atomic writes, backups, sockets).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wraps a JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConduitError {
    /// Build a [`ConduitError::NotFound`] for `entity` with the given `id`.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// The stable kind name used in IPC error payloads (see `SPEC_FULL.md`
    /// §10.6): one of the error kinds named in the specification.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::Conflict(_) => "Conflict",
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::PolicyDenied { .. } => "PolicyDenied",
            Self::RuntimeUnavailable => "RuntimeUnavailable",
            Self::RuntimeFailed(_) => "RuntimeFailed",
            Self::InvalidConfig { .. } => "InvalidConfig",
            Self::StoreError(_) => "StoreError",
            Self::Corruption { .. } => "Corruption",
            Self::Cancelled => "Cancelled",
            Self::Io(_) => "StoreError",
            Self::Serialization(_) => "InvalidConfig",
        }
    }
}

/// Result type used throughout the core.
pub type ConduitResult<T> = Result<T, ConduitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_entity_and_id() {
        let err = ConduitError::not_found("instance", "inst_abc");
        assert_eq!(err.to_string(), "instance not found: inst_abc");
        assert_eq!(err.kind(), "NotFound");
    }

    #[test]
    fn policy_denied_joins_reasons() {
        let err = ConduitError::PolicyDenied {
            block_reasons: vec!["root filesystem".to_string(), "other".to_string()],
        };
        assert_eq!(err.to_string(), "policy denied: root filesystem; other");
    }
}
