//! Typed accessors for `ClientBinding` rows.

use crate::db::{classify, Store};
use crate::wire::{
    binding_scope_from_str, binding_scope_to_str, binding_status_from_str, binding_status_to_str,
};
use conduit_core::{BindingId, BindingStatus, ClientBinding, ConduitError, InstanceId};
use rusqlite::{params, OptionalExtension, Row};

impl Store {
    /// Insert a new binding row.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::Conflict`] if `(instance_id, client_id,
    /// config_path)` already exists.
    pub fn create_binding(&self, binding: &ClientBinding) -> Result<(), ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT INTO bindings (
                binding_id, instance_id, client_id, scope, config_path,
                change_set_id, status, validated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                binding.binding_id.as_uuid().to_string(),
                binding.instance_id.as_uuid().to_string(),
                binding.client_id,
                binding_scope_to_str(binding.scope),
                binding.config_path,
                binding.change_set_id,
                binding_status_to_str(binding.status),
                binding.validated_at,
            ],
        )
        .map_err(classify)?;
        Ok(())
    }

    /// Fetch a binding by id.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if no such binding exists.
    pub fn get_binding(&self, id: BindingId) -> Result<ClientBinding, ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.query_row(
            "SELECT binding_id, instance_id, client_id, scope, config_path,
                    change_set_id, status, validated_at
             FROM bindings WHERE binding_id = ?1",
            params![id.as_uuid().to_string()],
            row_to_binding,
        )
        .optional()
        .map_err(classify)?
        .ok_or_else(|| ConduitError::not_found("binding", id.to_string()))
    }

    /// List every binding for `instance_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] on a query failure.
    pub fn list_bindings_by_instance(
        &self,
        instance_id: InstanceId,
    ) -> Result<Vec<ClientBinding>, ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT binding_id, instance_id, client_id, scope, config_path,
                        change_set_id, status, validated_at
                 FROM bindings WHERE instance_id = ?1",
            )
            .map_err(classify)?;
        let rows = stmt
            .query_map(params![instance_id.as_uuid().to_string()], row_to_binding)
            .map_err(classify)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(classify)?;
        Ok(rows)
    }

    /// List every binding for a given AI client adapter.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] on a query failure.
    pub fn list_bindings_by_client(
        &self,
        client_id: &str,
    ) -> Result<Vec<ClientBinding>, ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT binding_id, instance_id, client_id, scope, config_path,
                        change_set_id, status, validated_at
                 FROM bindings WHERE client_id = ?1",
            )
            .map_err(classify)?;
        let rows = stmt
            .query_map(params![client_id], row_to_binding)
            .map_err(classify)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(classify)?;
        Ok(rows)
    }

    /// Update a binding's status.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if no such binding exists.
    pub fn update_binding_status(
        &self,
        id: BindingId,
        status: BindingStatus,
    ) -> Result<(), ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let affected = conn
            .execute(
                "UPDATE bindings SET status = ?1 WHERE binding_id = ?2",
                params![binding_status_to_str(status), id.as_uuid().to_string()],
            )
            .map_err(classify)?;
        if affected == 0 {
            return Err(ConduitError::not_found("binding", id.to_string()));
        }
        Ok(())
    }

    /// Record a successful validation timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if no such binding exists.
    pub fn update_binding_validated(
        &self,
        id: BindingId,
        validated_at: &str,
    ) -> Result<(), ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let affected = conn
            .execute(
                "UPDATE bindings SET validated_at = ?1, status = ?2 WHERE binding_id = ?3",
                params![
                    validated_at,
                    binding_status_to_str(BindingStatus::Active),
                    id.as_uuid().to_string()
                ],
            )
            .map_err(classify)?;
        if affected == 0 {
            return Err(ConduitError::not_found("binding", id.to_string()));
        }
        Ok(())
    }

    /// Delete a binding row.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if no such binding exists.
    pub fn delete_binding(&self, id: BindingId) -> Result<(), ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let affected = conn
            .execute(
                "DELETE FROM bindings WHERE binding_id = ?1",
                params![id.as_uuid().to_string()],
            )
            .map_err(classify)?;
        if affected == 0 {
            return Err(ConduitError::not_found("binding", id.to_string()));
        }
        Ok(())
    }
}

fn row_to_binding(row: &Row<'_>) -> rusqlite::Result<ClientBinding> {
    let binding_id: String = row.get(0)?;
    let instance_id: String = row.get(1)?;
    let scope: String = row.get(3)?;
    let status: String = row.get(6)?;

    Ok(ClientBinding {
        binding_id: BindingId::parse(&binding_id).unwrap_or_default(),
        instance_id: InstanceId::parse(&instance_id).unwrap_or_default(),
        client_id: row.get(2)?,
        scope: binding_scope_from_str(&scope).unwrap_or(conduit_core::BindingScope::User),
        config_path: row.get(4)?,
        change_set_id: row.get(5)?,
        status: binding_status_from_str(&status).unwrap_or(BindingStatus::Degraded),
        validated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::BindingScope;

    fn sample_binding(instance_id: InstanceId) -> ClientBinding {
        ClientBinding {
            binding_id: BindingId::new(),
            instance_id,
            client_id: "claude-code".to_string(),
            scope: BindingScope::User,
            config_path: "/home/user/.claude.json".to_string(),
            change_set_id: "cs-1".to_string(),
            status: BindingStatus::Active,
            validated_at: None,
        }
    }

    fn store_with_instance() -> (Store, InstanceId) {
        use conduit_core::{ConnectorInstance, HealthStatus, InstanceStatus, PermissionSet};
        use std::collections::HashMap;

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
    fn create_then_get_round_trips() {
        let (store, instance_id) = store_with_instance();
        let binding = sample_binding(instance_id);
        store.create_binding(&binding).unwrap();
        let fetched = store.get_binding(binding.binding_id).unwrap();
        assert_eq!(fetched.client_id, "claude-code");
    }

    #[test]
    fn duplicate_tuple_is_conflict() {
        let (store, instance_id) = store_with_instance();
        let mut binding = sample_binding(instance_id);
        store.create_binding(&binding).unwrap();
        binding.binding_id = BindingId::new();
        let err = store.create_binding(&binding).unwrap_err();
        assert!(matches!(err, ConduitError::Conflict(_)));
    }

    #[test]
    fn removing_instance_cascades_to_bindings() {
        let (store, instance_id) = store_with_instance();
        let binding = sample_binding(instance_id);
        store.create_binding(&binding).unwrap();
        store.delete_instance(instance_id).unwrap();
        let remaining = store.list_bindings_by_instance(instance_id).unwrap();
        assert!(remaining.is_empty());
    }
}
