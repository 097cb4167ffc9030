//! The input to [`crate::PolicyEngine::evaluate`].

use conduit_core::{Actor, InstanceId, PermissionSet};

/// A permission request to be evaluated against the blocklist and the
/// requesting instance's grants.
#[derive(Debug, Clone)]
pub struct Request {
    /// What kind of action this request concerns (`"install"`, `"bind"`,
    /// `"grant"`, ...). Opaque to the engine beyond being logged.
    pub scope: String,
    /// The instance this request concerns, if any (install-time requests
    /// before an instance row exists may omit it).
    pub instance_id: Option<InstanceId>,
    /// The connector package this request concerns, if any.
    pub package_id: Option<String>,
    /// Who initiated the request.
    pub actor: Actor,
    /// The capabilities being requested.
    pub requested: PermissionSet,
}

impl Request {
    /// Build a request with no filesystem/network/secret/exposure
    /// capabilities requested — used by the install pipeline's audit step.
    #[must_use]
    pub fn empty(scope: impl Into<String>, actor: Actor) -> Self {
        Self {
            scope: scope.into(),
            instance_id: None,
            package_id: None,
            actor,
            requested: PermissionSet::empty(),
        }
    }

    /// Attach an instance id.
    #[must_use]
    pub fn with_instance(mut self, instance_id: InstanceId) -> Self {
        self.instance_id = Some(instance_id);
        self
    }
}
