//! Tagged-variant state types shared by the Store and Lifecycle Manager.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`crate::ConnectorInstance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Row created, not yet audited.
    Created,
    /// Policy evaluation and image pull in progress.
    Auditing,
    /// Blocked by policy; only reachable next state is removal.
    Blocked,
    /// Audited and pulled; ready to start.
    Installed,
    /// Container is being started.
    Starting,
    /// Container is running and healthy.
    Running,
    /// Container is running but failed its last health check.
    Degraded,
    /// Container is being stopped.
    Stopping,
    /// Container stopped cleanly.
    Stopped,
    /// An update/reinstall is in progress.
    Updating,
    /// Disabled by the user; container is not running.
    Disabled,
    /// Being torn down.
    Removing,
    /// Terminal: the row no longer exists once reached.
    Removed,
}

impl InstanceStatus {
    /// The allowed next states for each state, per the transition table.
    #[must_use]
    pub fn allowed_next(self) -> &'static [InstanceStatus] {
        use InstanceStatus::{
            Auditing, Blocked, Created, Degraded, Disabled, Installed, Removed, Removing,
            Running, Starting, Stopped, Stopping, Updating,
        };
        match self {
            Self::Created => &[Auditing],
            Self::Auditing => &[Blocked, Installed],
            Self::Blocked => &[Removing],
            Self::Installed => &[Starting, Disabled, Removing, Updating],
            Self::Starting => &[Running, Degraded, Stopped],
            Self::Running => &[Degraded, Stopping, Disabled],
            Self::Degraded => &[Running, Stopping, Disabled],
            Self::Stopping => &[Stopped],
            Self::Stopped => &[Starting, Removing, Updating],
            Self::Updating => &[Installed, Blocked],
            Self::Disabled => &[Installed, Removing],
            Self::Removing => &[Removed],
            Self::Removed => &[],
        }
    }

    /// Whether transitioning from `self` to `next` is permitted.
    #[must_use]
    pub fn is_valid_transition(self, next: InstanceStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    /// The wire-format string used in `conduit.db` rows and IPC payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Auditing => "auditing",
            Self::Blocked => "blocked",
            Self::Installed => "installed",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Degraded => "degraded",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Updating => "updating",
            Self::Disabled => "disabled",
            Self::Removing => "removing",
            Self::Removed => "removed",
        }
    }

    /// Parse from the wire-format string produced by [`Self::as_str`].
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        Some(match s {
            "created" => Self::Created,
            "auditing" => Self::Auditing,
            "blocked" => Self::Blocked,
            "installed" => Self::Installed,
            "starting" => Self::Starting,
            "running" => Self::Running,
            "degraded" => Self::Degraded,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            "updating" => Self::Updating,
            "disabled" => Self::Disabled,
            "removing" => Self::Removing,
            "removed" => Self::Removed,
            _ => return None,
        })
    }
}

/// Health as observed by the health loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Last health probe reported the container running.
    Healthy,
    /// Last health probe reported the container not running, or errored.
    Unhealthy,
    /// No health probe has run yet.
    #[default]
    Unknown,
}

/// Scope of a `ClientBinding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingScope {
    /// Bound into a project-local config file.
    Project,
    /// Bound into the user's global config file.
    User,
    /// Bound into a workspace config file (VS Code workspaces).
    Workspace,
}

/// Status of a `ClientBinding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingStatus {
    /// The MCP server entry is present and was last validated successfully.
    Active,
    /// The binding's backing instance or entry was removed.
    Revoked,
    /// Validation failed on the last attempt.
    Degraded,
}

/// Status of a long-running [`crate::Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Created, not yet started.
    Pending,
    /// Executing on a background task.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

impl OperationStatus {
    /// Whether this status is terminal (no further transitions occur).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// The kind of a long-running lifecycle [`crate::Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// The install pipeline (§4.5).
    Install,
    /// A reinstall/update pipeline.
    Update,
    /// The remove pipeline.
    Remove,
}

/// The outcome of a Policy Engine evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The request is fully granted.
    Allow,
    /// The request is granted, minus warned-and-stripped capabilities.
    Warn,
    /// The request is refused outright.
    Deny,
}

/// The kind of filesystem change an [`crate::InjectionOp`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionOpType {
    /// The target file does not exist yet; write it fresh.
    CreateFile,
    /// The target file exists; overwrite it with a merged document.
    UpdateFile,
    /// Copy the target file aside before modifying it.
    BackupFile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_transition_round_trips_through_wire_strings() {
        for s in [
            InstanceStatus::Created,
            InstanceStatus::Auditing,
            InstanceStatus::Blocked,
            InstanceStatus::Installed,
            InstanceStatus::Starting,
            InstanceStatus::Running,
            InstanceStatus::Degraded,
            InstanceStatus::Stopping,
            InstanceStatus::Stopped,
            InstanceStatus::Updating,
            InstanceStatus::Disabled,
            InstanceStatus::Removing,
            InstanceStatus::Removed,
        ] {
            assert_eq!(InstanceStatus::from_str_opt(s.as_str()), Some(s));
        }
    }

    #[test]
    fn created_may_only_go_to_auditing() {
        assert!(InstanceStatus::Created.is_valid_transition(InstanceStatus::Auditing));
        assert!(!InstanceStatus::Created.is_valid_transition(InstanceStatus::Running));
    }

    #[test]
    fn removed_is_terminal() {
        assert!(InstanceStatus::Removed.allowed_next().is_empty());
    }

    #[test]
    fn operation_terminal_states() {
        assert!(OperationStatus::Completed.is_terminal());
        assert!(OperationStatus::Failed.is_terminal());
        assert!(OperationStatus::Cancelled.is_terminal());
        assert!(!OperationStatus::Running.is_terminal());
    }
}
