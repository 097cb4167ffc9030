//! Request/result shapes shared by every adapter and the registry.

use conduit_core::{BindingScope, InjectionOpType, InstanceId};
use serde_json::Value;
use std::collections::BTreeMap;

/// One filesystem change an [`InjectionPlan`] performs.
#[derive(Debug, Clone)]
pub struct InjectionOp {
    /// What kind of change this is.
    pub op_type: InjectionOpType,
    /// Path the op acts on.
    pub path: String,
    /// For `backup_file` ops, where the pre-change copy was written.
    pub backup_path: Option<String>,
    /// Content hash of the file after the op, if computed.
    pub content_hash: Option<String>,
    /// A short preview of the written content, for audit display.
    pub content_preview: Option<String>,
}

/// A candidate location one of an adapter's config files could live at.
#[derive(Debug, Clone)]
pub struct ConfigRoot {
    /// Absolute path.
    pub path: String,
    /// Whether it currently exists on disk.
    pub exists: bool,
    /// Which scope this root corresponds to.
    pub scope: BindingScope,
}

/// The result of [`crate::Adapter::detect`].
#[derive(Debug, Clone, Default)]
pub struct DetectResult {
    /// Whether the client's binary or config directory was found.
    pub installed: bool,
    /// The client's version, if determinable.
    pub version: Option<String>,
    /// Candidate config file locations, existing or not.
    pub config_roots: Vec<ConfigRoot>,
    /// Whether the chosen config root's directory is writable.
    pub writable: bool,
    /// Free-form detection notes.
    pub notes: Option<String>,
}

/// A request to compute an [`InjectionPlan`].
#[derive(Debug, Clone)]
pub struct PlanRequest {
    /// The instance being published.
    pub instance_id: InstanceId,
    /// Display name, slugged into the server name.
    pub display_name: String,
    /// Override for the `command` field; defaults to `"conduit"`.
    pub command: Option<String>,
    /// Extra environment variables layered onto `CONDUIT_SOCKET`.
    pub env: BTreeMap<String, String>,
    /// Which scope (user/project/workspace) to write into.
    pub scope: BindingScope,
    /// Project root, required when `scope` is `Project` or `Workspace`.
    pub project_path: Option<String>,
    /// Path to the daemon's control socket, written into the entry's env.
    pub socket_path: String,
}

/// A complete, orderable sequence of filesystem operations.
#[derive(Debug, Clone)]
pub struct InjectionPlan {
    /// Freshly generated id of the form `cs_<utc-timestamp>_<8-hex-random>`.
    pub change_set_id: String,
    /// Owning adapter id.
    pub client_id: String,
    /// The ops to perform, in order.
    pub ops: Vec<InjectionOp>,
    /// The derived server name (`conduit-<slug>`).
    pub server_name: String,
    /// The config file the ops target.
    pub config_path: String,
    /// The scope the entry is written at.
    pub scope: BindingScope,
    /// The top-level JSON key server entries live under (`"mcpServers"` or
    /// `"servers"`).
    pub servers_key: String,
    /// The fully-built server entry object, computed once at plan time so
    /// `apply` writes exactly what was previewed.
    pub entry: Value,
}

/// The result of [`crate::Adapter::apply`].
#[derive(Debug, Clone)]
pub struct ApplyResult {
    /// Whether every op in the plan succeeded.
    pub success: bool,
    /// The config file that was modified.
    pub config_path: String,
    /// The scope it was written at.
    pub config_scope: BindingScope,
    /// Every file path touched.
    pub files_changed: Vec<String>,
}

/// Pass/fail outcome of [`crate::Adapter::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    /// The entry was found and parses as expected.
    Pass,
    /// The entry is missing, unparseable, or the file can't be read.
    Fail,
}

/// The result of [`crate::Adapter::validate`].
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Pass/fail.
    pub status: ValidationStatus,
    /// Wall-clock time the validation took.
    pub latency_ms: u64,
    /// Tool names discovered, if the adapter could enumerate them.
    pub tools_found: Vec<String>,
    /// Failure reasons, if `status` is `Fail`.
    pub errors: Vec<String>,
    /// Free-form notes about what was observed.
    pub observations: Option<String>,
}

/// The result of [`crate::Adapter::rollback`].
#[derive(Debug, Clone, Default)]
pub struct RollbackResult {
    /// `true` iff every backup in the change set was restored/deleted
    /// without error.
    pub success: bool,
    /// Paths that were restored or deleted.
    pub files_restored: Vec<String>,
    /// Errors encountered; rollback never stops early on one.
    pub errors: Vec<String>,
}

/// Severity of a [`crate::Adapter::doctor`] finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Something is broken and the adapter cannot function.
    Error,
    /// Something is degraded but the adapter can still partially function.
    Warning,
}

/// One finding from [`crate::Adapter::doctor`].
#[derive(Debug, Clone)]
pub struct Issue {
    /// How serious this finding is.
    pub severity: IssueSeverity,
    /// Which part of the adapter this concerns (`"binary"`, `"config"`, ...).
    pub component: String,
    /// Human-readable description.
    pub description: String,
    /// A suggested remedy, if one exists.
    pub suggestion: Option<String>,
    /// Whether this issue could be automatically fixed.
    pub auto_fix: bool,
}
