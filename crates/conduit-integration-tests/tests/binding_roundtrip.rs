//! Plan → apply → validate → rollback round trips through each built-in
//! Adapter, writing and restoring real files under a temp directory.

use conduit_adapters::{AdapterRegistry, PlanRequest, ValidationStatus};
use conduit_core::BindingScope;
use conduit_storage::Store;
use std::collections::BTreeMap;

fn plan_request(instance_id: conduit_core::InstanceId, project_path: &str) -> PlanRequest {
    PlanRequest {
        instance_id,
        display_name: "Weather".to_string(),
        command: None,
        env: BTreeMap::new(),
        scope: BindingScope::Project,
        project_path: Some(project_path.to_string()),
        socket_path: String::new(),
    }
}

#[test]
fn claude_code_plan_apply_validate_rollback_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open_in_memory().unwrap();
    let registry = AdapterRegistry::with_builtins();
    let adapter = registry.get("claude-code").unwrap();

    let instance_id = conduit_core::InstanceId::new();
    let request = plan_request(instance_id, dir.path().to_str().unwrap());

    let plan = adapter.plan(&request).unwrap();
    assert_eq!(plan.config_path, dir.path().join(".mcp.json").to_string_lossy());
    assert!(!plan.ops.is_empty());

    let apply_result = adapter.apply(&store, &plan).unwrap();
    assert!(apply_result.success);
    assert!(std::path::Path::new(&apply_result.config_path).exists());

    let contents = std::fs::read_to_string(&apply_result.config_path).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert!(doc["mcpServers"][&plan.server_name].is_object());

    let binding = conduit_core::ClientBinding {
        binding_id: conduit_core::BindingId::new(),
        instance_id,
        client_id: "claude-code".to_string(),
        scope: BindingScope::Project,
        config_path: apply_result.config_path.clone(),
        change_set_id: plan.change_set_id.clone(),
        status: conduit_core::BindingStatus::Active,
        validated_at: None,
    };
    let validation = adapter.validate(&binding);
    assert_eq!(validation.status, ValidationStatus::Pass);
    assert!(validation.errors.is_empty());

    let rollback = adapter.rollback(&store, &plan.change_set_id);
    assert!(rollback.success);
    // The file didn't exist before `apply`, so rollback removes it entirely
    // rather than restoring an empty document.
    assert!(!std::path::Path::new(&apply_result.config_path).exists());
}

#[test]
fn every_builtin_adapter_round_trips_through_project_scope() {
    let registry = AdapterRegistry::with_builtins();
    for client_id in registry.client_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_in_memory().unwrap();
        let adapter = registry.get(client_id).unwrap();
        let instance_id = conduit_core::InstanceId::new();
        let request = plan_request(instance_id, dir.path().to_str().unwrap());

        let plan = match adapter.plan(&request) {
            Ok(plan) => plan,
            Err(conduit_core::ConduitError::InvalidRequest(_)) => {
                // Some adapters don't support project scope; skip those.
                continue;
            }
            Err(e) => panic!("{client_id}: unexpected plan error: {e}"),
        };
        let apply_result = adapter.apply(&store, &plan).unwrap_or_else(|e| panic!("{client_id}: apply failed: {e}"));
        assert!(apply_result.success, "{client_id}: apply should succeed");
    }
}

#[test]
fn binding_store_persists_and_lists_by_instance() {
    let store = Store::open_in_memory().unwrap();
    let instance_id = conduit_core::InstanceId::new();
    let binding = conduit_core::ClientBinding {
        binding_id: conduit_core::BindingId::new(),
        instance_id,
        client_id: "claude-code".to_string(),
        scope: BindingScope::User,
        config_path: "/home/user/.claude.json".to_string(),
        change_set_id: "cs_x".to_string(),
        status: conduit_core::BindingStatus::Active,
        validated_at: None,
    };
    store.create_binding(&binding).unwrap();

    let fetched = store.get_binding(binding.binding_id).unwrap();
    assert_eq!(fetched.client_id, "claude-code");

    let by_instance = store.list_bindings_by_instance(instance_id).unwrap();
    assert_eq!(by_instance.len(), 1);

    store.delete_binding(binding.binding_id).unwrap();
    assert!(store.get_binding(binding.binding_id).is_err());
}
