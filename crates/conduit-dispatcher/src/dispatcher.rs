//! [`Dispatcher`]: routes `{method, params}` requests onto the Lifecycle
//! Manager, Policy Engine, and Adapter Registry. Holds no domain state of
//! its own (`SPEC_FULL.md` §4.7) — every field here is a handle owned
//! elsewhere.

use conduit_adapters::AdapterRegistry;
use conduit_core::{
    Actor, BindingId, BindingScope, ConduitError, InstanceId, OperationId, PermissionSet,
};
use conduit_events::EventBus;
use conduit_lifecycle::LifecycleManager;
use conduit_policy::{PolicyEngine, Request};
use conduit_storage::Store;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Binds incoming `{method, params}` requests to methods on the Lifecycle
/// Manager, Policy Engine, and Adapter Registry.
///
/// Cheaply cloneable: every field is an `Arc` (or, for [`LifecycleManager`],
/// already internally `Arc`-backed), so the socket transport can clone one
/// per accepted connection.
#[derive(Clone)]
pub struct Dispatcher {
    lifecycle: LifecycleManager,
    policy: Arc<PolicyEngine>,
    adapters: Arc<AdapterRegistry>,
    events: Arc<EventBus>,
    store: Arc<Store>,
    started_at: Instant,
    accepting: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    /// Build a dispatcher over already-constructed component handles.
    #[must_use]
    pub fn new(
        lifecycle: LifecycleManager,
        policy: Arc<PolicyEngine>,
        adapters: Arc<AdapterRegistry>,
        events: Arc<EventBus>,
        store: Arc<Store>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            lifecycle,
            policy,
            adapters,
            events,
            store,
            started_at: Instant::now(),
            accepting: Arc::new(AtomicBool::new(true)),
            shutdown,
        }
    }

    /// The Event Bus, so the transport can wire up `events.subscribe`/
    /// `events.unsubscribe` without the dispatcher itself tracking
    /// per-connection subscriptions.
    #[must_use]
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Cancellation token signalled by [`Self::begin_shutdown`]; the
    /// transport selects on this to stop serving new requests.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop accepting new requests and signal cancellation to whatever is
    /// watching [`Self::shutdown_token`]. Idempotent.
    pub fn begin_shutdown(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        self.shutdown.cancel();
    }

    /// Whether the dispatcher is still accepting new requests.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Route one `(method, params)` pair to the owning component and
    /// return its JSON result.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::InvalidRequest`] for an unknown method or
    /// malformed `params`; otherwise propagates whatever the called
    /// component returned.
    pub async fn dispatch(&self, method: &str, params: Value) -> Result<Value, ConduitError> {
        if !self.is_accepting() {
            return Err(ConduitError::Cancelled);
        }
        match method {
            "daemon.status" => self.daemon_status(),
            "daemon.stats" => self.daemon_stats(),
            "daemon.shutdown" => {
                self.begin_shutdown();
                Ok(json!({"shutting_down": true}))
            }

            "instance.list" => self.instance_list(),
            "instance.create" => self.instance_create(params),
            "instance.install" => self.instance_install(params),
            "instance.start" => self.instance_start(params).await,
            "instance.stop" => self.instance_stop(params).await,
            "instance.disable" => self.instance_disable(params).await,
            "instance.enable" => self.instance_enable(params),
            "instance.remove" => self.instance_remove(params).await,
            "instance.get" => self.instance_get(params),
            "instance.permissions" => self.instance_permissions(params),
            "instance.set_permission" => self.instance_set_permission(params),
            "instance.audit" => self.instance_audit(params),
            "operation.get" => self.operation_get(params),

            "binding.list" => self.binding_list(params),
            "binding.plan" => self.binding_plan(params),
            "binding.apply" => self.binding_apply(params),
            "binding.validate" => self.binding_validate(params),
            "binding.rollback" => self.binding_rollback(params),
            "binding.delete" => self.binding_delete(params),

            "clients.list_adapters" => self.clients_list_adapters(),
            "clients.detect_all" => self.clients_detect_all(),
            "clients.doctor" => self.clients_doctor(params),

            other => Err(ConduitError::InvalidRequest(format!(
                "unknown method: {other}"
            ))),
        }
    }

    fn daemon_status(&self) -> Result<Value, ConduitError> {
        Ok(json!({
            "uptime_secs": self.started_at.elapsed().as_secs(),
            "subscriber_count": self.events.subscriber_count(),
            "accepting": self.is_accepting(),
        }))
    }

    fn daemon_stats(&self) -> Result<Value, ConduitError> {
        let instances = self.lifecycle.list_instances()?;
        let mut by_status: HashMap<&'static str, usize> = HashMap::new();
        for instance in &instances {
            *by_status.entry(instance.status.as_str()).or_insert(0) += 1;
        }
        Ok(json!({
            "instance_count": instances.len(),
            "by_status": by_status,
        }))
    }

    fn instance_list(&self) -> Result<Value, ConduitError> {
        let instances = self.lifecycle.list_instances()?;
        Ok(serde_json::to_value(instances)?)
    }

    fn instance_create(&self, params: Value) -> Result<Value, ConduitError> {
        #[derive(serde::Deserialize)]
        struct CreateParams {
            package_id: String,
            package_version: String,
            display_name: String,
            image_ref: String,
            #[serde(default)]
            config: HashMap<String, String>,
        }
        let p: CreateParams = serde_json::from_value(params)
            .map_err(|e| ConduitError::InvalidRequest(e.to_string()))?;
        let instance = self.lifecycle.create_instance(
            p.package_id,
            p.package_version,
            p.display_name,
            p.image_ref,
            p.config,
        )?;
        Ok(serde_json::to_value(instance)?)
    }

    fn instance_install(&self, params: Value) -> Result<Value, ConduitError> {
        let instance_id = parse_instance_id(&params)?;
        let operation_id = self.lifecycle.install_instance(instance_id)?;
        Ok(json!({"operation_id": operation_id}))
    }

    async fn instance_start(&self, params: Value) -> Result<Value, ConduitError> {
        let instance_id = parse_instance_id(&params)?;
        self.lifecycle.start_instance(instance_id).await?;
        Ok(json!({"status": "ok"}))
    }

    async fn instance_stop(&self, params: Value) -> Result<Value, ConduitError> {
        let instance_id = parse_instance_id(&params)?;
        self.lifecycle.stop_instance(instance_id).await?;
        Ok(json!({"status": "ok"}))
    }

    async fn instance_disable(&self, params: Value) -> Result<Value, ConduitError> {
        let instance_id = parse_instance_id(&params)?;
        self.lifecycle.disable_instance(instance_id).await?;
        Ok(json!({"status": "ok"}))
    }

    fn instance_enable(&self, params: Value) -> Result<Value, ConduitError> {
        let instance_id = parse_instance_id(&params)?;
        self.lifecycle.enable_instance(instance_id)?;
        Ok(json!({"status": "ok"}))
    }

    async fn instance_remove(&self, params: Value) -> Result<Value, ConduitError> {
        let instance_id = parse_instance_id(&params)?;
        self.lifecycle.remove_instance(instance_id).await?;
        Ok(json!({"status": "ok"}))
    }

    fn instance_get(&self, params: Value) -> Result<Value, ConduitError> {
        let instance_id = parse_instance_id(&params)?;
        let instance = self.lifecycle.get_instance(instance_id)?;
        Ok(serde_json::to_value(instance)?)
    }

    fn instance_permissions(&self, params: Value) -> Result<Value, ConduitError> {
        let instance_id = parse_instance_id(&params)?;
        let granted = self.store.get_user_grants(instance_id)?;
        Ok(serde_json::to_value(granted)?)
    }

    fn instance_set_permission(&self, params: Value) -> Result<Value, ConduitError> {
        #[derive(serde::Deserialize)]
        struct SetPermissionParams {
            instance_id: String,
            granted: bool,
            permission: PermissionSet,
        }
        let p: SetPermissionParams = serde_json::from_value(params)
            .map_err(|e| ConduitError::InvalidRequest(e.to_string()))?;
        let instance_id = InstanceId::parse(&p.instance_id)
            .map_err(|e| ConduitError::InvalidRequest(e.to_string()))?;
        let now = conduit_core::to_rfc3339(chrono::Utc::now());
        if p.granted {
            self.store.grant_permission(instance_id, &p.permission, &now)?;
            self.store.append_ledger_entry(
                "grant",
                "instance",
                &instance_id.to_string(),
                "grant",
                serde_json::to_value(&p.permission)?,
                &now,
            )?;
        } else {
            for category in permission_categories(&p.permission) {
                let _ = self.store.revoke_permission(instance_id, category);
            }
            self.store.append_ledger_entry(
                "grant",
                "instance",
                &instance_id.to_string(),
                "revoke",
                serde_json::to_value(&p.permission)?,
                &now,
            )?;
        }
        Ok(json!({"status": "ok"}))
    }

    fn instance_audit(&self, params: Value) -> Result<Value, ConduitError> {
        let instance_id = parse_instance_id(&params)?;
        let decision = self.policy.evaluate(
            Request::empty("audit", Actor::User).with_instance(instance_id),
        )?;
        Ok(serde_json::to_value(decision)?)
    }

    fn operation_get(&self, params: Value) -> Result<Value, ConduitError> {
        #[derive(serde::Deserialize)]
        struct OperationParams {
            operation_id: String,
        }
        let p: OperationParams = serde_json::from_value(params)
            .map_err(|e| ConduitError::InvalidRequest(e.to_string()))?;
        let operation_id = OperationId::parse(&p.operation_id)
            .map_err(|e| ConduitError::InvalidRequest(e.to_string()))?;
        let operation = self.lifecycle.get_operation(operation_id)?;
        Ok(serde_json::to_value(operation)?)
    }

    fn binding_list(&self, params: Value) -> Result<Value, ConduitError> {
        let instance_id = parse_instance_id(&params)?;
        let bindings = self.store.list_bindings_by_instance(instance_id)?;
        Ok(serde_json::to_value(bindings)?)
    }

    fn binding_plan(&self, params: Value) -> Result<Value, ConduitError> {
        #[derive(serde::Deserialize)]
        struct PlanParams {
            instance_id: String,
            client_id: String,
            scope: BindingScope,
            #[serde(default)]
            project_path: Option<String>,
        }
        let p: PlanParams = serde_json::from_value(params)
            .map_err(|e| ConduitError::InvalidRequest(e.to_string()))?;
        let instance_id = InstanceId::parse(&p.instance_id)
            .map_err(|e| ConduitError::InvalidRequest(e.to_string()))?;
        let instance = self.lifecycle.get_instance(instance_id)?;
        let adapter = self.adapters.get(&p.client_id)?;
        let request = conduit_adapters::PlanRequest {
            instance_id,
            display_name: instance.display_name,
            command: None,
            env: std::collections::BTreeMap::new(),
            scope: p.scope,
            project_path: p.project_path,
            socket_path: String::new(),
        };
        let plan = adapter.plan(&request)?;
        Ok(plan_to_json(&plan))
    }

    fn binding_apply(&self, params: Value) -> Result<Value, ConduitError> {
        #[derive(serde::Deserialize)]
        struct ApplyParams {
            instance_id: String,
            client_id: String,
            scope: BindingScope,
            #[serde(default)]
            project_path: Option<String>,
        }
        let p: ApplyParams = serde_json::from_value(params)
            .map_err(|e| ConduitError::InvalidRequest(e.to_string()))?;
        let instance_id = InstanceId::parse(&p.instance_id)
            .map_err(|e| ConduitError::InvalidRequest(e.to_string()))?;
        let instance = self.lifecycle.get_instance(instance_id)?;
        let adapter = self.adapters.get(&p.client_id)?;
        let request = conduit_adapters::PlanRequest {
            instance_id,
            display_name: instance.display_name,
            command: None,
            env: std::collections::BTreeMap::new(),
            scope: p.scope,
            project_path: p.project_path,
            socket_path: String::new(),
        };
        let plan = adapter.plan(&request)?;
        let result = adapter.apply(&self.store, &plan)?;

        let binding = conduit_core::ClientBinding {
            binding_id: BindingId::new(),
            instance_id,
            client_id: p.client_id,
            scope: p.scope,
            config_path: result.config_path.clone(),
            change_set_id: plan.change_set_id.clone(),
            status: conduit_core::BindingStatus::Active,
            validated_at: None,
        };
        self.store.create_binding(&binding)?;
        self.events.publish(
            conduit_core::EventType::BindingCreated,
            json!({"binding_id": binding.binding_id, "instance_id": instance_id}),
        );
        Ok(json!({
            "binding_id": binding.binding_id,
            "success": result.success,
            "config_path": result.config_path,
            "files_changed": result.files_changed,
        }))
    }

    fn binding_validate(&self, params: Value) -> Result<Value, ConduitError> {
        #[derive(serde::Deserialize)]
        struct ValidateParams {
            binding_id: String,
        }
        let p: ValidateParams = serde_json::from_value(params)
            .map_err(|e| ConduitError::InvalidRequest(e.to_string()))?;
        let binding_id = BindingId::parse(&p.binding_id)
            .map_err(|e| ConduitError::InvalidRequest(e.to_string()))?;
        let binding = self.store.get_binding(binding_id)?;
        let adapter = self.adapters.get(&binding.client_id)?;
        let result = adapter.validate(&binding);
        if result.status == conduit_adapters::ValidationStatus::Pass {
            let now = conduit_core::to_rfc3339(chrono::Utc::now());
            self.store.update_binding_validated(binding_id, &now)?;
        }
        Ok(json!({
            "status": format!("{:?}", result.status),
            "latency_ms": result.latency_ms,
            "tools_found": result.tools_found,
            "errors": result.errors,
        }))
    }

    fn binding_rollback(&self, params: Value) -> Result<Value, ConduitError> {
        #[derive(serde::Deserialize)]
        struct RollbackParams {
            client_id: String,
            change_set_id: String,
        }
        let p: RollbackParams = serde_json::from_value(params)
            .map_err(|e| ConduitError::InvalidRequest(e.to_string()))?;
        let adapter = self.adapters.get(&p.client_id)?;
        let result = adapter.rollback(&self.store, &p.change_set_id);
        Ok(json!({
            "success": result.success,
            "files_restored": result.files_restored,
            "errors": result.errors,
        }))
    }

    fn binding_delete(&self, params: Value) -> Result<Value, ConduitError> {
        #[derive(serde::Deserialize)]
        struct DeleteParams {
            binding_id: String,
        }
        let p: DeleteParams = serde_json::from_value(params)
            .map_err(|e| ConduitError::InvalidRequest(e.to_string()))?;
        let binding_id = BindingId::parse(&p.binding_id)
            .map_err(|e| ConduitError::InvalidRequest(e.to_string()))?;
        let binding = self.store.get_binding(binding_id)?;
        self.store.delete_binding(binding_id)?;
        self.events.publish(
            conduit_core::EventType::BindingRemoved,
            json!({"binding_id": binding_id, "instance_id": binding.instance_id}),
        );
        Ok(json!({"status": "ok"}))
    }

    fn clients_list_adapters(&self) -> Result<Value, ConduitError> {
        Ok(json!(self.adapters.client_ids().collect::<Vec<_>>()))
    }

    fn clients_detect_all(&self) -> Result<Value, ConduitError> {
        let mut out = serde_json::Map::new();
        for id in self.adapters.client_ids() {
            let adapter = self.adapters.get(id)?;
            let detected = adapter.detect();
            out.insert(
                id.to_string(),
                json!({
                    "installed": detected.installed,
                    "version": detected.version,
                    "writable": detected.writable,
                    "notes": detected.notes,
                }),
            );
        }
        Ok(Value::Object(out))
    }

    fn clients_doctor(&self, params: Value) -> Result<Value, ConduitError> {
        #[derive(serde::Deserialize, Default)]
        struct DoctorParams {
            #[serde(default)]
            client_id: Option<String>,
        }
        let p: DoctorParams = if params.is_null() {
            DoctorParams::default()
        } else {
            serde_json::from_value(params).map_err(|e| ConduitError::InvalidRequest(e.to_string()))?
        };

        let ids: Vec<&'static str> = match &p.client_id {
            Some(id) => vec![self.adapters.get(id)?.id()],
            None => self.adapters.client_ids().collect(),
        };

        let mut out = serde_json::Map::new();
        for id in ids {
            let adapter = self.adapters.get(id)?;
            let issues: Vec<Value> = adapter
                .doctor()
                .into_iter()
                .map(|issue| {
                    json!({
                        "severity": format!("{:?}", issue.severity),
                        "component": issue.component,
                        "description": issue.description,
                        "suggestion": issue.suggestion,
                        "auto_fix": issue.auto_fix,
                    })
                })
                .collect();
            out.insert(id.to_string(), json!(issues));
        }
        Ok(Value::Object(out))
    }
}

fn parse_instance_id(params: &Value) -> Result<InstanceId, ConduitError> {
    let raw = params
        .get("instance_id")
        .and_then(Value::as_str)
        .ok_or_else(|| ConduitError::InvalidRequest("missing instance_id".to_string()))?;
    InstanceId::parse(raw).map_err(|e| ConduitError::InvalidRequest(e.to_string()))
}

fn permission_categories(permission: &PermissionSet) -> Vec<&'static str> {
    let mut categories = Vec::new();
    if permission.filesystem != Default::default() {
        categories.push("filesystem");
    }
    if permission.network != Default::default() {
        categories.push("network");
    }
    if permission.secrets != Default::default() {
        categories.push("secrets");
    }
    if permission.exposure != Default::default() {
        categories.push("exposure");
    }
    categories
}

fn plan_to_json(plan: &conduit_adapters::InjectionPlan) -> Value {
    let ops: Vec<Value> = plan
        .ops
        .iter()
        .map(|op| {
            json!({
                "op_type": format!("{:?}", op.op_type),
                "path": op.path,
                "backup_path": op.backup_path,
                "content_hash": op.content_hash,
                "content_preview": op.content_preview,
            })
        })
        .collect();
    json!({
        "change_set_id": plan.change_set_id,
        "client_id": plan.client_id,
        "server_name": plan.server_name,
        "config_path": plan.config_path,
        "servers_key": plan.servers_key,
        "ops": ops,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_runtime::RuntimeProvider;
    use std::time::Duration;

    fn make_dispatcher() -> Dispatcher {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let policy = Arc::new(PolicyEngine::new(store.clone()));
        let events = Arc::new(EventBus::new());
        let lifecycle = LifecycleManager::new(
            store.clone(),
            policy.clone(),
            None::<Arc<dyn RuntimeProvider>>,
            events.clone(),
            Duration::from_secs(60),
            Duration::from_secs(30),
            Duration::from_secs(10),
        );
        let adapters = Arc::new(AdapterRegistry::with_builtins());
        Dispatcher::new(lifecycle, policy, adapters, events, store, CancellationToken::new())
    }

    #[tokio::test]
    async fn unknown_method_is_invalid_request() {
        let dispatcher = make_dispatcher();
        let err = dispatcher.dispatch("nonexistent.method", Value::Null).await.unwrap_err();
        assert!(matches!(err, ConduitError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn create_then_get_round_trips_instance() {
        let dispatcher = make_dispatcher();
        let created = dispatcher
            .dispatch(
                "instance.create",
                json!({
                    "package_id": "acme.weather",
                    "package_version": "1.0.0",
                    "display_name": "Weather",
                    "image_ref": "ghcr.io/acme/weather:1.0.0",
                }),
            )
            .await
            .unwrap();
        let instance_id = created["instance_id"].as_str().unwrap().to_string();

        let fetched = dispatcher
            .dispatch("instance.get", json!({"instance_id": instance_id}))
            .await
            .unwrap();
        assert_eq!(fetched["display_name"], "Weather");
    }

    #[tokio::test]
    async fn shutdown_stops_accepting_further_requests() {
        let dispatcher = make_dispatcher();
        dispatcher.dispatch("daemon.shutdown", Value::Null).await.unwrap();
        let err = dispatcher.dispatch("daemon.status", Value::Null).await.unwrap_err();
        assert!(matches!(err, ConduitError::Cancelled));
    }

    #[tokio::test]
    async fn list_adapters_returns_builtins() {
        let dispatcher = make_dispatcher();
        let result = dispatcher.dispatch("clients.list_adapters", Value::Null).await.unwrap();
        let ids = result.as_array().unwrap();
        assert!(ids.iter().any(|v| v == "claude-code"));
    }
}
