//! Entity types shared by the Store, Lifecycle Manager, and Dispatcher.

use crate::{
    BackupId, BindingId, Decision, DecisionId, HealthStatus, InstanceId, InstanceStatus,
    OperationId, OperationKind, OperationStatus, PermissionSet,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A specific configured deployment of a connector, with its own lifecycle
/// and container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorInstance {
    /// Opaque identifier; the only identity (see invariants in `SPEC_FULL.md` §3).
    pub instance_id: InstanceId,
    /// The connector package this instance was created from.
    pub package_id: String,
    /// The version of that package.
    pub package_version: String,
    /// User-facing name, shown in client configs and the status surface.
    pub display_name: String,
    /// The OCI image reference to pull/run.
    pub image_ref: String,
    /// Backing container id, present only while
    /// `status ∈ {Starting, Running, Degraded, Stopping}`.
    pub container_id: Option<String>,
    /// Path to a connector-exposed stdio/unix socket, if any.
    pub socket_path: Option<String>,
    /// Name of the runtime provider that last ran this instance.
    pub runtime_provider_name: Option<String>,
    /// Current lifecycle state.
    pub status: InstanceStatus,
    /// Last observed health.
    pub health_status: HealthStatus,
    /// Error detail recorded on the most recent failure, if any.
    pub error_message: Option<String>,
    /// Opaque connector configuration (environment-like key/value pairs).
    pub config: HashMap<String, String>,
    /// Snapshot of the permissions currently granted to this instance.
    pub granted_perms: PermissionSet,
    /// Opaque structured result of the (currently no-op) audit step.
    pub audit_result: Option<serde_json::Value>,
    /// RFC 3339 UTC creation timestamp.
    pub created_at: String,
    /// RFC 3339 UTC timestamp of the last row update.
    pub updated_at: String,
    /// RFC 3339 UTC timestamp of the last successful start.
    pub started_at: Option<String>,
    /// RFC 3339 UTC timestamp of the last clean stop.
    pub stopped_at: Option<String>,
    /// RFC 3339 UTC timestamp of the last health probe.
    pub last_health_check: Option<String>,
}

/// One instance published into one AI client's config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientBinding {
    /// Unique identifier for this binding.
    pub binding_id: BindingId,
    /// The bound instance.
    pub instance_id: InstanceId,
    /// Adapter identity (`"claude-code"`, `"cursor"`, `"vscode"`, `"gemini-cli"`).
    pub client_id: String,
    /// Scope the entry was written at.
    pub scope: crate::BindingScope,
    /// Absolute path of the config file the entry lives in.
    pub config_path: String,
    /// The change set this binding's entry was written under.
    pub change_set_id: String,
    /// Current binding status.
    pub status: crate::BindingStatus,
    /// RFC 3339 UTC timestamp of the last successful validation.
    pub validated_at: Option<String>,
}

/// Enables rollback of one change set's worth of file modifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigBackup {
    /// Unique identifier for this backup row.
    pub backup_id: BackupId,
    /// The change set this backup belongs to.
    pub change_set_id: String,
    /// Adapter identity that produced this backup.
    pub client_id: String,
    /// The config file path this backup protects.
    pub original_path: String,
    /// Where the pre-modification copy (if any) was written.
    pub backup_path: String,
    /// `true` if `original_path` existed before the change (restore on
    /// rollback); `false` if it was newly created (delete on rollback).
    pub file_existed: bool,
}

/// The outcome of one Policy Engine evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Unique identifier for this decision.
    pub decision_id: DecisionId,
    /// The instance the request concerned, if any.
    pub instance_id: Option<InstanceId>,
    /// ALLOW / WARN / DENY.
    pub decision: Decision,
    /// What was requested.
    pub requested: PermissionSet,
    /// What was actually granted (subset of `requested`).
    pub effective: PermissionSet,
    /// Warnings for stripped-but-not-blocked capabilities.
    pub warnings: Vec<String>,
    /// Reasons the request was blocked, if `decision == Deny`.
    pub block_reasons: Vec<String>,
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
    /// Who initiated the request.
    pub actor: Actor,
}

/// Who initiated a policy request or ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// A human operator, via the dispatcher.
    User,
    /// The daemon itself (e.g. the install pipeline's implicit audit check).
    System,
}

/// An in-memory handle on a long-running Lifecycle Manager action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Unique identifier, returned to the caller that started the action.
    pub operation_id: OperationId,
    /// Which pipeline this operation is running.
    pub kind: OperationKind,
    /// The instance the operation concerns.
    pub instance_id: InstanceId,
    /// Current operation status.
    pub status: OperationStatus,
    /// Human-readable description of the current pipeline stage.
    pub current_stage: String,
    /// Progress percentage, `0..=100`.
    pub progress: u8,
    /// Error detail, set once `status == Failed`.
    pub error: Option<String>,
    /// Opaque result payload, set once `status == Completed`.
    pub result: Option<serde_json::Value>,
    /// RFC 3339 UTC creation timestamp.
    pub created_at: String,
    /// RFC 3339 UTC completion timestamp, set once terminal.
    pub completed_at: Option<String>,
}

/// A fan-out event published on the Event Bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic id assigned by the bus on publish.
    pub id: u64,
    /// The event's type tag.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
    /// Opaque structured payload.
    pub data: serde_json::Value,
}

/// The fixed set of event type tags the bus may publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// An instance row was created.
    InstanceCreated,
    /// An instance transitioned into `Running`.
    InstanceStarted,
    /// An instance transitioned into `Stopped`.
    InstanceStopped,
    /// An instance transitioned into `Degraded` or failed an operation.
    InstanceFailed,
    /// An instance row was deleted.
    InstanceRemoved,
    /// A binding was created.
    BindingCreated,
    /// A binding was deleted.
    BindingRemoved,
    /// A policy decision was recorded.
    PolicyDecision,
    /// A health-loop probe completed.
    HealthCheck,
    /// A periodic transport heartbeat (see `SPEC_FULL.md` §4.6).
    DaemonStatus,
    /// The daemon is shutting down.
    Shutdown,
}
