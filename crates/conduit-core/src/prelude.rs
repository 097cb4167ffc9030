//! Prelude module - commonly used types for convenient import.
//!
//! Use `use conduit_core::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use conduit_core::prelude::*;
//!
//! // Now you have access to:
//! // - ConduitError, ConduitResult
//! // - Identifier newtypes like InstanceId, BindingId
//! // - PermissionSet and its categories
//! // - InstanceStatus, Decision, and the other tagged state enums
//! // - The shared entity types (ConnectorInstance, ClientBinding, ...)
//! ```

// Errors
pub use crate::{ConduitError, ConduitResult};

// Identifiers
pub use crate::{BackupId, BindingId, DecisionId, InstanceId, OperationId, SubscriberId};

// Entities
pub use crate::{
    Actor, ClientBinding, ConfigBackup, ConnectorInstance, Event, EventType, Operation,
    PolicyDecision,
};

// Permissions
pub use crate::{
    ExposurePermission, FilesystemPermission, NetworkMode, NetworkPermission, PermissionSet,
    SecretRef, SecretsPermission,
};

// State machines
pub use crate::{
    BindingScope, BindingStatus, Decision, HealthStatus, InjectionOpType, InstanceStatus,
    OperationKind, OperationStatus,
};

// Timestamps
pub use crate::time::{from_rfc3339, to_rfc3339};
