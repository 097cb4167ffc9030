//! Conduit Core - shared value types, identifiers, and error kinds for the
//! Conduit connector daemon.
//!
//! This crate provides:
//! - Opaque identifier newtypes (`InstanceId`, `BindingId`, ...)
//! - The `PermissionSet` value type and its merge semantics
//! - Tagged state/status enums shared by the Store and Lifecycle Manager
//! - Entity types shared by the Store, Lifecycle Manager, and Dispatcher
//! - The unified `ConduitError` type
//! - RFC 3339 timestamp helpers

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod error;
pub mod ids;
pub mod model;
pub mod permission;
pub mod status;
pub mod time;

pub use error::{ConduitError, ConduitResult};
pub use ids::{BackupId, BindingId, DecisionId, InstanceId, OperationId, SubscriberId};
pub use model::{
    Actor, ClientBinding, ConfigBackup, ConnectorInstance, Event, EventType, Operation,
    PolicyDecision,
};
pub use permission::{
    ExposurePermission, FilesystemPermission, NetworkMode, NetworkPermission, PermissionSet,
    SecretRef, SecretsPermission,
};
pub use status::{
    BindingScope, BindingStatus, Decision, HealthStatus, InjectionOpType, InstanceStatus,
    OperationKind, OperationStatus,
};
pub use time::{from_rfc3339, to_rfc3339};
