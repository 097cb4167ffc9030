//! Typed accessors for `ConnectorInstance` rows.

use crate::db::{classify, Store};
use crate::wire::{health_status_from_str, health_status_to_str};
use conduit_core::{ConduitError, ConnectorInstance, HealthStatus, InstanceId, InstanceStatus};
use rusqlite::{params, OptionalExtension, Row};

impl Store {
    /// Insert a new instance row.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::Conflict`] if `instance_id` already exists.
    pub fn create_instance(&self, instance: &ConnectorInstance) -> Result<(), ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT INTO instances (
                instance_id, package_id, package_version, display_name, image_ref,
                container_id, socket_path, runtime_provider_name, status, health_status,
                error_message, config, granted_perms, audit_result,
                created_at, updated_at, started_at, stopped_at, last_health_check
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                instance.instance_id.as_uuid().to_string(),
                instance.package_id,
                instance.package_version,
                instance.display_name,
                instance.image_ref,
                instance.container_id,
                instance.socket_path,
                instance.runtime_provider_name,
                instance.status.as_str(),
                health_status_to_str(instance.health_status),
                instance.error_message,
                serde_json::to_string(&instance.config).map_err(ConduitError::Serialization)?,
                serde_json::to_string(&instance.granted_perms).map_err(ConduitError::Serialization)?,
                instance
                    .audit_result
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()
                    .map_err(ConduitError::Serialization)?,
                instance.created_at,
                instance.updated_at,
                instance.started_at,
                instance.stopped_at,
                instance.last_health_check,
            ],
        )
        .map_err(classify)?;
        Ok(())
    }

    /// Fetch an instance by id.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if no such instance exists.
    pub fn get_instance(&self, id: InstanceId) -> Result<ConnectorInstance, ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.query_row(
            "SELECT instance_id, package_id, package_version, display_name, image_ref,
                    container_id, socket_path, runtime_provider_name, status, health_status,
                    error_message, config, granted_perms, audit_result,
                    created_at, updated_at, started_at, stopped_at, last_health_check
             FROM instances WHERE instance_id = ?1",
            params![id.as_uuid().to_string()],
            row_to_instance,
        )
        .optional()
        .map_err(classify)?
        .ok_or_else(|| ConduitError::not_found("instance", id.to_string()))
    }

    /// List every instance.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] on a query failure.
    pub fn list_instances(&self) -> Result<Vec<ConnectorInstance>, ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT instance_id, package_id, package_version, display_name, image_ref,
                        container_id, socket_path, runtime_provider_name, status, health_status,
                        error_message, config, granted_perms, audit_result,
                        created_at, updated_at, started_at, stopped_at, last_health_check
                 FROM instances ORDER BY created_at",
            )
            .map_err(classify)?;
        let rows = stmt
            .query_map([], row_to_instance)
            .map_err(classify)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(classify)?;
        Ok(rows)
    }

    /// List instances currently in `status`.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] on a query failure.
    pub fn list_instances_by_status(
        &self,
        status: InstanceStatus,
    ) -> Result<Vec<ConnectorInstance>, ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT instance_id, package_id, package_version, display_name, image_ref,
                        container_id, socket_path, runtime_provider_name, status, health_status,
                        error_message, config, granted_perms, audit_result,
                        created_at, updated_at, started_at, stopped_at, last_health_check
                 FROM instances WHERE status = ?1 ORDER BY created_at",
            )
            .map_err(classify)?;
        let rows = stmt
            .query_map(params![status.as_str()], row_to_instance)
            .map_err(classify)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(classify)?;
        Ok(rows)
    }

    /// Update `status` and, if set, `error_message`. Enforces nothing about
    /// transition legality — callers (the Lifecycle Manager) validate that
    /// before calling.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if no such instance exists.
    pub fn update_instance_status(
        &self,
        id: InstanceId,
        status: InstanceStatus,
        error_message: Option<&str>,
        updated_at: &str,
    ) -> Result<(), ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let affected = conn
            .execute(
                "UPDATE instances SET status = ?1, error_message = ?2, updated_at = ?3 WHERE instance_id = ?4",
                params![status.as_str(), error_message, updated_at, id.as_uuid().to_string()],
            )
            .map_err(classify)?;
        if affected == 0 {
            return Err(ConduitError::not_found("instance", id.to_string()));
        }
        Ok(())
    }

    /// Record the container id assigned by the Runtime Provider.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if no such instance exists.
    pub fn update_instance_container(
        &self,
        id: InstanceId,
        container_id: Option<&str>,
        updated_at: &str,
    ) -> Result<(), ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let affected = conn
            .execute(
                "UPDATE instances SET container_id = ?1, updated_at = ?2 WHERE instance_id = ?3",
                params![container_id, updated_at, id.as_uuid().to_string()],
            )
            .map_err(classify)?;
        if affected == 0 {
            return Err(ConduitError::not_found("instance", id.to_string()));
        }
        Ok(())
    }

    /// Record a successful start.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if no such instance exists.
    pub fn update_instance_started(
        &self,
        id: InstanceId,
        started_at: &str,
    ) -> Result<(), ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let affected = conn
            .execute(
                "UPDATE instances SET status = ?1, started_at = ?2, updated_at = ?2 WHERE instance_id = ?3",
                params![InstanceStatus::Running.as_str(), started_at, id.as_uuid().to_string()],
            )
            .map_err(classify)?;
        if affected == 0 {
            return Err(ConduitError::not_found("instance", id.to_string()));
        }
        Ok(())
    }

    /// Record a clean stop.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if no such instance exists.
    pub fn update_instance_stopped(
        &self,
        id: InstanceId,
        stopped_at: &str,
    ) -> Result<(), ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let affected = conn
            .execute(
                "UPDATE instances SET status = ?1, container_id = NULL, stopped_at = ?2, updated_at = ?2 WHERE instance_id = ?3",
                params![InstanceStatus::Stopped.as_str(), stopped_at, id.as_uuid().to_string()],
            )
            .map_err(classify)?;
        if affected == 0 {
            return Err(ConduitError::not_found("instance", id.to_string()));
        }
        Ok(())
    }

    /// Record the outcome of a health probe.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if no such instance exists.
    pub fn update_instance_health(
        &self,
        id: InstanceId,
        health_status: HealthStatus,
        checked_at: &str,
    ) -> Result<(), ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let affected = conn
            .execute(
                "UPDATE instances SET health_status = ?1, last_health_check = ?2 WHERE instance_id = ?3",
                params![health_status_to_str(health_status), checked_at, id.as_uuid().to_string()],
            )
            .map_err(classify)?;
        if affected == 0 {
            return Err(ConduitError::not_found("instance", id.to_string()));
        }
        Ok(())
    }

    /// Delete an instance row. Cascades to its bindings and grants.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if no such instance exists.
    pub fn delete_instance(&self, id: InstanceId) -> Result<(), ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let affected = conn
            .execute(
                "DELETE FROM instances WHERE instance_id = ?1",
                params![id.as_uuid().to_string()],
            )
            .map_err(classify)?;
        if affected == 0 {
            return Err(ConduitError::not_found("instance", id.to_string()));
        }
        Ok(())
    }
}

fn row_to_instance(row: &Row<'_>) -> rusqlite::Result<ConnectorInstance> {
    let instance_id: String = row.get(0)?;
    let status: String = row.get(8)?;
    let health_status: String = row.get(9)?;
    let config: String = row.get(11)?;
    let granted_perms: String = row.get(12)?;
    let audit_result: Option<String> = row.get(13)?;

    Ok(ConnectorInstance {
        instance_id: InstanceId::parse(&instance_id).unwrap_or_default(),
        package_id: row.get(1)?,
        package_version: row.get(2)?,
        display_name: row.get(3)?,
        image_ref: row.get(4)?,
        container_id: row.get(5)?,
        socket_path: row.get(6)?,
        runtime_provider_name: row.get(7)?,
        status: InstanceStatus::from_str_opt(&status).unwrap_or(InstanceStatus::Created),
        health_status: health_status_from_str(&health_status),
        error_message: row.get(10)?,
        config: serde_json::from_str(&config).unwrap_or_default(),
        granted_perms: serde_json::from_str(&granted_perms).unwrap_or_default(),
        audit_result: audit_result.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
        started_at: row.get(16)?,
        stopped_at: row.get(17)?,
        last_health_check: row.get(18)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::PermissionSet;
    use std::collections::HashMap;

    fn sample_instance() -> ConnectorInstance {
        ConnectorInstance {
            instance_id: InstanceId::new(),
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
        }
    }

    #[test]
    fn create_then_get_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let instance = sample_instance();
        store.create_instance(&instance).unwrap();
        let fetched = store.get_instance(instance.instance_id).unwrap();
        assert_eq!(fetched.instance_id, instance.instance_id);
        assert_eq!(fetched.status, InstanceStatus::Created);
    }

    #[test]
    fn get_missing_instance_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = store.get_instance(InstanceId::new()).unwrap_err();
        assert!(matches!(err, ConduitError::NotFound { .. }));
    }

    #[test]
    fn duplicate_instance_id_is_conflict() {
        let store = Store::open_in_memory().unwrap();
        let instance = sample_instance();
        store.create_instance(&instance).unwrap();
        let err = store.create_instance(&instance).unwrap_err();
        assert!(matches!(err, ConduitError::Conflict(_)));
    }

    #[test]
    fn update_status_then_list_by_status() {
        let store = Store::open_in_memory().unwrap();
        let instance = sample_instance();
        store.create_instance(&instance).unwrap();
        store
            .update_instance_status(
                instance.instance_id,
                InstanceStatus::Auditing,
                None,
                "2026-01-01T00:01:00Z",
            )
            .unwrap();
        let auditing = store
            .list_instances_by_status(InstanceStatus::Auditing)
            .unwrap();
        assert_eq!(auditing.len(), 1);
        assert!(store
            .list_instances_by_status(InstanceStatus::Created)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn delete_missing_instance_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = store.delete_instance(InstanceId::new()).unwrap_err();
        assert!(matches!(err, ConduitError::NotFound { .. }));
    }
}
