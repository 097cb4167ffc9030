//! Small string round trips for enums that don't carry their own
//! `as_str`/`from_str_opt` pair, kept local to the row-mapping code.

use conduit_core::{BindingScope, BindingStatus, HealthStatus};

pub(crate) fn health_status_to_str(s: HealthStatus) -> &'static str {
    match s {
        HealthStatus::Healthy => "healthy",
        HealthStatus::Unhealthy => "unhealthy",
        HealthStatus::Unknown => "unknown",
    }
}

pub(crate) fn health_status_from_str(s: &str) -> HealthStatus {
    match s {
        "healthy" => HealthStatus::Healthy,
        "unhealthy" => HealthStatus::Unhealthy,
        _ => HealthStatus::Unknown,
    }
}

pub(crate) fn binding_scope_to_str(s: BindingScope) -> &'static str {
    match s {
        BindingScope::Project => "project",
        BindingScope::User => "user",
        BindingScope::Workspace => "workspace",
    }
}

pub(crate) fn binding_scope_from_str(s: &str) -> Option<BindingScope> {
    Some(match s {
        "project" => BindingScope::Project,
        "user" => BindingScope::User,
        "workspace" => BindingScope::Workspace,
        _ => return None,
    })
}

pub(crate) fn binding_status_to_str(s: BindingStatus) -> &'static str {
    match s {
        BindingStatus::Active => "active",
        BindingStatus::Revoked => "revoked",
        BindingStatus::Degraded => "degraded",
    }
}

pub(crate) fn binding_status_from_str(s: &str) -> Option<BindingStatus> {
    Some(match s {
        "active" => BindingStatus::Active,
        "revoked" => BindingStatus::Revoked,
        "degraded" => BindingStatus::Degraded,
        _ => return None,
    })
}

