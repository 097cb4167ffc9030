//! The Policy Engine: turns a [`Request`] into a recorded [`PolicyDecision`].

use crate::{blocklist, normalize::normalize_path, Request};
use conduit_core::{
    ConduitError, Decision, DecisionId, InstanceId, NetworkMode, PermissionSet, PolicyDecision,
};
use conduit_storage::Store;
use directories::BaseDirs;
use std::sync::Arc;
use tracing::{info, warn};

/// Rule-based evaluator for filesystem/network/secret/exposure permission
/// requests. Combines a non-overridable blocklist with per-instance user
/// grants persisted in the [`Store`].
///
/// The engine never fails an evaluation on its own account — refusal is
/// encoded as [`Decision::Deny`], not an error. Only persistence faults
/// (ledger append, grant lookup) surface as [`ConduitError::StoreError`].
pub struct PolicyEngine {
    store: Arc<Store>,
}

impl PolicyEngine {
    /// Build a policy engine backed by `store`.
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    fn home_dir(&self) -> String {
        BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Evaluate `request`, returning and recording the resulting decision.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] if the grant lookup or ledger
    /// append fails.
    pub fn evaluate(&self, request: Request) -> Result<PolicyDecision, ConduitError> {
        let home = self.home_dir();
        let requested = request.requested.clone();

        let mut block_reasons = Vec::new();
        for path in requested
            .filesystem
            .readonly_paths
            .iter()
            .chain(requested.filesystem.readwrite_paths.iter())
        {
            let normalized = normalize_path(path, &home);
            if let Some(reason) = blocklist::check(&normalized, &home) {
                block_reasons.push(format!("{path}: {reason}"));
            }
        }

        let grants = match request.instance_id {
            Some(id) => self.store.get_user_grants(id)?,
            None => PermissionSet::empty(),
        };

        let (decision, effective, warnings) = if !block_reasons.is_empty() {
            (Decision::Deny, PermissionSet::empty(), Vec::new())
        } else {
            self.apply_grants(&requested, &grants, &home)
        };

        let timestamp = conduit_core::to_rfc3339(chrono::Utc::now());
        let decision_id = DecisionId::new();

        let entity_id = request
            .instance_id
            .map(|id| id.to_string())
            .or_else(|| request.package_id.clone())
            .unwrap_or_else(|| decision_id.to_string());

        let action = match decision {
            Decision::Allow => "allow",
            Decision::Warn => "warn",
            Decision::Deny => "deny",
        };

        self.store.append_ledger_entry(
            "policy_decision",
            "instance",
            &entity_id,
            action,
            serde_json::json!({
                "scope": request.scope,
                "requested": requested,
                "effective": effective,
                "warnings": warnings,
                "block_reasons": block_reasons,
            }),
            &timestamp,
        )?;

        match decision {
            Decision::Deny => warn!(scope = %request.scope, reasons = ?block_reasons, "policy denied"),
            Decision::Warn => info!(scope = %request.scope, warnings = ?warnings, "policy warned"),
            Decision::Allow => info!(scope = %request.scope, "policy allowed"),
        }

        Ok(PolicyDecision {
            decision_id,
            instance_id: request.instance_id,
            decision,
            requested,
            effective,
            warnings,
            block_reasons,
            timestamp,
            actor: request.actor,
        })
    }

    /// Strip requested capabilities the grants don't cover, collecting a
    /// warning per stripped capability. Returns `(decision, effective,
    /// warnings)` assuming the blocklist has already passed.
    ///
    /// Filesystem coverage is computed on normalized paths on both sides
    /// (`SPEC_FULL.md` §120: "Policy comparisons use the normalized
    /// form"), so a requested path written as `~/project` or
    /// `/home/user/./project` still matches a grant recorded as
    /// `/home/user/project`. The *original* requested path string is kept
    /// in `effective`, not its normalized form.
    fn apply_grants(
        &self,
        requested: &PermissionSet,
        grants: &PermissionSet,
        home: &str,
    ) -> (Decision, PermissionSet, Vec<String>) {
        let normalized_grants = normalize_fs_grants(grants, home);
        let mut effective = PermissionSet::empty();
        let mut warnings = Vec::new();

        effective.filesystem.readonly_paths = requested
            .filesystem
            .readonly_paths
            .iter()
            .filter(|path| {
                let covered = normalized_grants.covers_path(&normalize_path(path, home));
                if !covered {
                    warnings.push(format!("filesystem.readonly_paths: {path} has no matching grant"));
                }
                covered
            })
            .cloned()
            .collect();
        effective.filesystem.readwrite_paths = requested
            .filesystem
            .readwrite_paths
            .iter()
            .filter(|path| {
                let covered = normalized_grants.covers_path(&normalize_path(path, home));
                if !covered {
                    warnings.push(format!("filesystem.readwrite_paths: {path} has no matching grant"));
                }
                covered
            })
            .cloned()
            .collect();

        if requested.network.mode == NetworkMode::Egress {
            effective.network.egress_domains = requested
                .network
                .egress_domains
                .iter()
                .filter(|domain| {
                    let covered = grants.covers_domain(domain);
                    if !covered {
                        warnings.push(format!("network.egress_domains: {domain} has no matching grant"));
                    }
                    covered
                })
                .cloned()
                .collect();
            effective.network.mode = if effective.network.egress_domains.is_empty() {
                NetworkMode::None
            } else {
                NetworkMode::Egress
            };
        } else {
            effective.network.mode = NetworkMode::None;
        }

        effective.secrets.secrets = requested
            .secrets
            .secrets
            .iter()
            .filter(|secret| {
                let covered = grants.covers_secret(&secret.secret_id);
                if !covered {
                    warnings.push(format!("secrets: {} has no matching grant", secret.secret_id));
                }
                covered
            })
            .cloned()
            .collect();

        if requested.exposure.secure_link {
            effective.exposure.secure_link = grants.exposure.secure_link;
            if !effective.exposure.secure_link {
                warnings.push("exposure.secure_link requested but not granted".to_string());
            }
        }

        let decision = if warnings.is_empty() { Decision::Allow } else { Decision::Warn };
        (decision, effective, warnings)
    }

    /// Persist `grant`'s non-empty categories for `instance_id`, overwriting
    /// whatever was previously granted in those categories.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] on a persistence fault.
    pub fn grant_permission(
        &self,
        instance_id: InstanceId,
        grant: &PermissionSet,
    ) -> Result<(), ConduitError> {
        let timestamp = conduit_core::to_rfc3339(chrono::Utc::now());
        self.store.grant_permission(instance_id, grant, &timestamp)?;
        self.store.append_ledger_entry(
            "permission_granted",
            "instance",
            &instance_id.to_string(),
            "grant",
            serde_json::to_value(grant).map_err(ConduitError::Serialization)?,
            &timestamp,
        )?;
        Ok(())
    }

    /// Revoke the grant row for `(instance_id, permission_type)`.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if no such grant exists.
    pub fn revoke_permission(
        &self,
        instance_id: InstanceId,
        permission_type: &str,
    ) -> Result<(), ConduitError> {
        self.store.revoke_permission(instance_id, permission_type)?;
        let timestamp = conduit_core::to_rfc3339(chrono::Utc::now());
        self.store.append_ledger_entry(
            "permission_revoked",
            "instance",
            &instance_id.to_string(),
            "revoke",
            serde_json::json!({ "permission_type": permission_type }),
            &timestamp,
        )?;
        Ok(())
    }

    /// Fetch the full set of permissions currently granted to `instance_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] on a query failure.
    pub fn get_user_grants(&self, instance_id: InstanceId) -> Result<PermissionSet, ConduitError> {
        self.store.get_user_grants(instance_id)
    }
}

/// Clone `grants` with its filesystem path sets normalized against `home`,
/// so [`PermissionSet::covers_path`] compares like with like. Only the
/// filesystem category needs this — domains and secret ids aren't paths.
fn normalize_fs_grants(grants: &PermissionSet, home: &str) -> PermissionSet {
    let mut normalized = grants.clone();
    normalized.filesystem.readonly_paths =
        grants.filesystem.readonly_paths.iter().map(|p| normalize_path(p, home)).collect();
    normalized.filesystem.readwrite_paths =
        grants.filesystem.readwrite_paths.iter().map(|p| normalize_path(p, home)).collect();
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::Actor;

    fn engine() -> PolicyEngine {
        PolicyEngine::new(Arc::new(Store::open_in_memory().unwrap()))
    }

    #[test]
    fn deny_root_mount() {
        let engine = engine();
        let mut requested = PermissionSet::empty();
        requested.filesystem.readonly_paths.insert("/".to_string());

        let mut req = Request::empty("install", Actor::System);
        req.requested = requested;
        let decision = engine.evaluate(req).unwrap();
        assert_eq!(decision.decision, Decision::Deny);
        assert!(decision.block_reasons[0].contains("root filesystem"));
    }

    #[test]
    fn warn_without_grant_then_allow_after_grant() {
        let engine = engine();
        let instance_id = InstanceId::new();

        let mut requested = PermissionSet::empty();
        requested
            .filesystem
            .readwrite_paths
            .insert("/tmp/scratch".to_string());

        let mut req = Request::empty("bind", Actor::User).with_instance(instance_id);
        req.requested = requested.clone();
        let decision = engine.evaluate(req.clone()).unwrap();
        assert_eq!(decision.decision, Decision::Warn);
        assert!(decision.effective.filesystem.readwrite_paths.is_empty());

        engine.grant_permission(instance_id, &requested).unwrap();
        let decision = engine.evaluate(req).unwrap();
        assert_eq!(decision.decision, Decision::Allow);
        assert_eq!(decision.effective, decision.requested);
    }

    #[test]
    fn egress_without_grant_downgrades_to_none() {
        let engine = engine();
        let mut requested = PermissionSet::empty();
        requested.network.mode = NetworkMode::Egress;
        requested
            .network
            .egress_domains
            .insert("api.example.com".to_string());

        let mut req = Request::empty("install", Actor::System);
        req.requested = requested;
        let decision = engine.evaluate(req).unwrap();
        assert_eq!(decision.decision, Decision::Warn);
        assert_eq!(decision.effective.network.mode, NetworkMode::None);
    }

    #[test]
    fn pure_none_network_produces_no_warning() {
        let engine = engine();
        let req = Request::empty("install", Actor::System);
        let decision = engine.evaluate(req).unwrap();
        assert_eq!(decision.decision, Decision::Allow);
        assert!(decision.warnings.is_empty());
    }

    #[test]
    fn non_canonical_request_still_matches_a_canonical_grant() {
        let engine = engine();
        let instance_id = InstanceId::new();

        let mut grant = PermissionSet::empty();
        grant.filesystem.readwrite_paths.insert("/home/user/project".to_string());
        engine.grant_permission(instance_id, &grant).unwrap();

        let mut requested = PermissionSet::empty();
        requested
            .filesystem
            .readwrite_paths
            .insert("/home/user/./project".to_string());

        let mut req = Request::empty("bind", Actor::User).with_instance(instance_id);
        req.requested = requested.clone();
        let decision = engine.evaluate(req).unwrap();
        assert_eq!(decision.decision, Decision::Allow);
        assert_eq!(decision.effective.filesystem.readwrite_paths, requested.filesystem.readwrite_paths);
    }

    #[test]
    fn effective_is_subset_of_requested() {
        let engine = engine();
        let mut requested = PermissionSet::empty();
        requested.filesystem.readwrite_paths.insert("/tmp/a".to_string());
        requested.filesystem.readwrite_paths.insert("/tmp/b".to_string());

        let mut req = Request::empty("install", Actor::System);
        req.requested = requested.clone();
        let decision = engine.evaluate(req).unwrap();
        assert!(decision
            .effective
            .filesystem
            .readwrite_paths
            .is_subset(&requested.filesystem.readwrite_paths));
    }
}
