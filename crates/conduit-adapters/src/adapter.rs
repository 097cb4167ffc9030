//! The [`Adapter`] trait every AI client integration implements.

use crate::types::{ApplyResult, DetectResult, InjectionPlan, Issue, PlanRequest, RollbackResult, ValidationResult};
use conduit_core::{ClientBinding, ConduitError};
use conduit_storage::Store;

/// Knows how to discover, publish into, validate, and roll back one AI
/// client's MCP configuration.
///
/// File I/O here is synchronous: every implementation is plain
/// filesystem/JSON work (plus, for Gemini, an occasional blocking
/// subprocess call), run from a background task by the caller rather than
/// on an async runtime thread.
pub trait Adapter: Send + Sync {
    /// Stable short identifier (`"claude-code"`, `"cursor"`, `"vscode"`,
    /// `"gemini-cli"`).
    fn id(&self) -> &'static str;

    /// Probe for an installation of this client.
    fn detect(&self) -> DetectResult;

    /// Compute the filesystem change plan for publishing `request`'s
    /// instance into this client's config.
    ///
    /// # Errors
    /// Returns [`ConduitError::InvalidRequest`] if `request.scope` requires
    /// a `project_path` that wasn't supplied.
    fn plan(&self, request: &PlanRequest) -> Result<InjectionPlan, ConduitError>;

    /// Execute `plan`'s ops, persisting a [`conduit_core::ConfigBackup`] row
    /// per backed-up or newly created file.
    ///
    /// # Errors
    /// Returns [`ConduitError::InvalidConfig`] if an `update_file` target
    /// fails to parse (the original stays on disk, protected by its
    /// backup). Returns [`ConduitError::Io`]/[`ConduitError::StoreError`]
    /// on lower-level failures.
    fn apply(&self, store: &Store, plan: &InjectionPlan) -> Result<ApplyResult, ConduitError>;

    /// Check that `binding`'s config file still carries its entry.
    fn validate(&self, binding: &ClientBinding) -> ValidationResult;

    /// Undo every backup recorded under `change_set_id`.
    fn rollback(&self, store: &Store, change_set_id: &str) -> RollbackResult;

    /// Self-diagnose this adapter's environment.
    fn doctor(&self) -> Vec<Issue>;
}
