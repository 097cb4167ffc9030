//! Typed accessors for per-category `UserGrant` rows.
//!
//! A grant row is keyed by `(instance_id, permission_type)`, where
//! `permission_type` is one of `"filesystem"`, `"network"`, `"secrets"`,
//! `"exposure"`. `grant_data` holds the JSON-serialized form of that
//! category's sub-struct from [`conduit_core::PermissionSet`].

use crate::db::{classify, Store};
use conduit_core::{ConduitError, InstanceId, PermissionSet};
use rusqlite::params;

impl Store {
    /// Persist the non-empty categories of `grant` under `instance_id`,
    /// overwriting whatever was previously granted in each of those
    /// categories. Categories left empty in `grant` are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] or [`ConduitError::NotFound`] if
    /// `instance_id` does not exist (foreign key violation).
    pub fn grant_permission(
        &self,
        instance_id: InstanceId,
        grant: &PermissionSet,
        updated_at: &str,
    ) -> Result<(), ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");

        let categories: [(&str, Option<String>); 4] = [
            (
                "filesystem",
                (!is_default(&grant.filesystem)).then(|| serde_json::to_string(&grant.filesystem).unwrap_or_default()),
            ),
            (
                "network",
                (!is_default(&grant.network)).then(|| serde_json::to_string(&grant.network).unwrap_or_default()),
            ),
            (
                "secrets",
                (!is_default(&grant.secrets)).then(|| serde_json::to_string(&grant.secrets).unwrap_or_default()),
            ),
            (
                "exposure",
                (!is_default(&grant.exposure)).then(|| serde_json::to_string(&grant.exposure).unwrap_or_default()),
            ),
        ];

        for (category, data) in categories {
            let Some(data) = data else { continue };
            conn.execute(
                "INSERT INTO grants (instance_id, permission_type, grant_data, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(instance_id, permission_type)
                 DO UPDATE SET grant_data = excluded.grant_data, updated_at = excluded.updated_at",
                params![instance_id.as_uuid().to_string(), category, data, updated_at],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(ref code, _)
                    if code.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    ConduitError::not_found("instance", instance_id.to_string())
                }
                other => classify(other),
            })?;
        }
        Ok(())
    }

    /// Delete the grant row for one `(instance_id, permission_type)` pair.
    /// `permission_type` must be one of `"filesystem"`, `"network"`,
    /// `"secrets"`, `"exposure"`.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if no such grant exists.
    pub fn revoke_permission(
        &self,
        instance_id: InstanceId,
        permission_type: &str,
    ) -> Result<(), ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let affected = conn
            .execute(
                "DELETE FROM grants WHERE instance_id = ?1 AND permission_type = ?2",
                params![instance_id.as_uuid().to_string(), permission_type],
            )
            .map_err(classify)?;
        if affected == 0 {
            return Err(ConduitError::not_found(
                "grant",
                format!("{instance_id}/{permission_type}"),
            ));
        }
        Ok(())
    }

    /// Reassemble the full [`PermissionSet`] granted to `instance_id` from
    /// its per-category rows. Missing categories default to empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] on a query failure.
    pub fn get_user_grants(&self, instance_id: InstanceId) -> Result<PermissionSet, ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn
            .prepare("SELECT permission_type, grant_data FROM grants WHERE instance_id = ?1")
            .map_err(classify)?;
        let rows = stmt
            .query_map(params![instance_id.as_uuid().to_string()], |row| {
                let permission_type: String = row.get(0)?;
                let grant_data: String = row.get(1)?;
                Ok((permission_type, grant_data))
            })
            .map_err(classify)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(classify)?;

        let mut set = PermissionSet::empty();
        for (category, data) in rows {
            match category.as_str() {
                "filesystem" => {
                    set.filesystem = serde_json::from_str(&data).unwrap_or_default();
                }
                "network" => {
                    set.network = serde_json::from_str(&data).unwrap_or_default();
                }
                "secrets" => {
                    set.secrets = serde_json::from_str(&data).unwrap_or_default();
                }
                "exposure" => {
                    set.exposure = serde_json::from_str(&data).unwrap_or_default();
                }
                _ => {}
            }
        }
        Ok(set)
    }
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::{ConnectorInstance, HealthStatus, InstanceStatus, NetworkMode};
    use std::collections::HashMap;

    fn store_with_instance() -> (Store, InstanceId) {
        let store = Store::open_in_memory().unwrap();
        let instance_id = InstanceId::new();
        let instance = ConnectorInstance {
            instance_id,
            package_id: "acme.weather".to_string(),
            package_version: "1.0.0".to_string(),
            display_name: "Weather".to_string(),
            image_ref: "ghcr.io/acme/weather:1.0.0".to_string(),
            container_id: None,
            socket_path: None,
            runtime_provider_name: None,
            status: InstanceStatus::Created,
            health_status: HealthStatus::Unknown,
            error_message: None,
            config: HashMap::new(),
            granted_perms: PermissionSet::empty(),
            audit_result: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            started_at: None,
            stopped_at: None,
            last_health_check: None,
        };
        store.create_instance(&instance).unwrap();
        (store, instance_id)
    }

    #[test]
    fn grant_then_get_round_trips_one_category() {
        let (store, instance_id) = store_with_instance();
        let mut grant = PermissionSet::empty();
        grant
            .filesystem
            .readwrite_paths
            .insert("/home/user/project".to_string());
        store
            .grant_permission(instance_id, &grant, "2026-01-01T00:00:00Z")
            .unwrap();

        let fetched = store.get_user_grants(instance_id).unwrap();
        assert!(fetched.covers_path("/home/user/project"));
        assert_eq!(fetched.network.mode, NetworkMode::None);
    }

    #[test]
    fn regranting_overwrites_same_category() {
        let (store, instance_id) = store_with_instance();
        let mut first = PermissionSet::empty();
        first.filesystem.readwrite_paths.insert("/a".to_string());
        store
            .grant_permission(instance_id, &first, "2026-01-01T00:00:00Z")
            .unwrap();

        let mut second = PermissionSet::empty();
        second.filesystem.readwrite_paths.insert("/b".to_string());
        store
            .grant_permission(instance_id, &second, "2026-01-01T00:00:01Z")
            .unwrap();

        let fetched = store.get_user_grants(instance_id).unwrap();
        assert!(!fetched.covers_path("/a"));
        assert!(fetched.covers_path("/b"));
    }

    #[test]
    fn grants_are_per_instance() {
        let (store, instance_a) = store_with_instance();
        let mut grant = PermissionSet::empty();
        grant.filesystem.readwrite_paths.insert("/shared".to_string());
        store
            .grant_permission(instance_a, &grant, "2026-01-01T00:00:00Z")
            .unwrap();

        let instance_id = InstanceId::new();
        let instance_b = conduit_core::ConnectorInstance {
            instance_id,
            package_id: "acme.other".to_string(),
            package_version: "1.0.0".to_string(),
            display_name: "Other".to_string(),
            image_ref: "ghcr.io/acme/other:1.0.0".to_string(),
            container_id: None,
            socket_path: None,
            runtime_provider_name: None,
            status: InstanceStatus::Created,
            health_status: HealthStatus::Unknown,
            error_message: None,
            config: HashMap::new(),
            granted_perms: PermissionSet::empty(),
            audit_result: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            started_at: None,
            stopped_at: None,
            last_health_check: None,
        };
        store.create_instance(&instance_b).unwrap();

        let fetched_b = store.get_user_grants(instance_id).unwrap();
        assert!(!fetched_b.covers_path("/shared"));
    }

    #[test]
    fn revoke_removes_the_category() {
        let (store, instance_id) = store_with_instance();
        let mut grant = PermissionSet::empty();
        grant.filesystem.readwrite_paths.insert("/a".to_string());
        store
            .grant_permission(instance_id, &grant, "2026-01-01T00:00:00Z")
            .unwrap();
        store.revoke_permission(instance_id, "filesystem").unwrap();
        let fetched = store.get_user_grants(instance_id).unwrap();
        assert!(fetched.is_empty());
    }

    #[test]
    fn revoke_missing_grant_is_not_found() {
        let (store, instance_id) = store_with_instance();
        let err = store.revoke_permission(instance_id, "secrets").unwrap_err();
        assert!(matches!(err, ConduitError::NotFound { .. }));
    }
}
