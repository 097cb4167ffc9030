//! End-to-end install → start → stop → remove pipeline against a fake
//! runtime provider, exercising the Lifecycle Manager, Store, and Policy
//! Engine together the way `conduitd` wires them up.

use async_trait::async_trait;
use conduit_core::{ConduitError, InstanceStatus};
use conduit_events::EventBus;
use conduit_lifecycle::LifecycleManager;
use conduit_policy::PolicyEngine;
use conduit_runtime::{ContainerInfo, ContainerSpec, LogOptions, PullOptions, RuntimeProvider};
use conduit_storage::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// A runtime whose containers always report healthy, so the happy path
/// reaches `Running` without depending on an actual container engine.
struct FakeRuntime;

#[async_trait]
impl RuntimeProvider for FakeRuntime {
    fn name(&self) -> &'static str {
        "fake"
    }
    async fn is_available(&self) -> bool {
        true
    }
    async fn pull(&self, _image: &str, _opts: PullOptions) -> Result<(), ConduitError> {
        Ok(())
    }
    async fn run(&self, _spec: &ContainerSpec) -> Result<String, ConduitError> {
        Ok("container-abc".to_string())
    }
    async fn stop(&self, _container_id: &str, _timeout: Duration) -> Result<(), ConduitError> {
        Ok(())
    }
    async fn remove(&self, _container_id: &str, _force: bool) -> Result<(), ConduitError> {
        Ok(())
    }
    async fn status(&self, _container_id: &str) -> Result<String, ConduitError> {
        Ok("running".to_string())
    }
    async fn inspect(&self, _container_id: &str) -> Result<ContainerInfo, ConduitError> {
        Ok(ContainerInfo::default())
    }
    async fn logs(&self, _container_id: &str, _opts: LogOptions) -> Result<String, ConduitError> {
        Ok(String::new())
    }
    async fn logs_stream(
        &self,
        _container_id: &str,
        _opts: LogOptions,
        _sender: UnboundedSender<String>,
        _cancel: CancellationToken,
    ) -> Result<(), ConduitError> {
        Ok(())
    }
    async fn exec(&self, _container_id: &str, _command: &[String]) -> Result<String, ConduitError> {
        Ok(String::new())
    }
}

fn manager() -> LifecycleManager {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let policy = Arc::new(PolicyEngine::new(store.clone()));
    let runtime: Arc<dyn RuntimeProvider> = Arc::new(FakeRuntime);
    LifecycleManager::new(
        store,
        policy,
        Some(runtime),
        Arc::new(EventBus::new()),
        Duration::from_secs(30),
        Duration::from_secs(10),
        Duration::from_secs(10),
    )
}

#[tokio::test]
async fn instance_travels_from_created_to_removed() {
    let manager = manager();

    let instance = manager
        .create_instance(
            "acme.weather".to_string(),
            "1.2.0".to_string(),
            "Weather".to_string(),
            "ghcr.io/acme/weather:1.2.0".to_string(),
            HashMap::new(),
        )
        .unwrap();
    assert_eq!(instance.status, InstanceStatus::Created);

    let operation_id = manager.install_instance(instance.instance_id).unwrap();
    manager.operations().wait_for_all(Duration::from_secs(5)).await;
    let operation = manager.get_operation(operation_id).unwrap();
    assert_eq!(operation.status, conduit_core::OperationStatus::Completed);
    assert_eq!(
        manager.get_instance(instance.instance_id).unwrap().status,
        InstanceStatus::Installed
    );

    manager.start_instance(instance.instance_id).await.unwrap();
    let started = manager.get_instance(instance.instance_id).unwrap();
    assert_eq!(started.status, InstanceStatus::Running);
    assert!(started.container_id.is_some());
    assert!(started.started_at.is_some());

    manager.stop_instance(instance.instance_id).await.unwrap();
    assert_eq!(
        manager.get_instance(instance.instance_id).unwrap().status,
        InstanceStatus::Stopped
    );

    manager.remove_instance(instance.instance_id).await.unwrap();
    assert!(matches!(
        manager.get_instance(instance.instance_id).unwrap_err(),
        ConduitError::NotFound { .. }
    ));
}

#[tokio::test]
async fn disabling_a_running_instance_stops_it_without_a_status_error() {
    let manager = manager();
    let instance = manager
        .create_instance(
            "acme.weather".to_string(),
            "1.2.0".to_string(),
            "Weather".to_string(),
            "ghcr.io/acme/weather:1.2.0".to_string(),
            HashMap::new(),
        )
        .unwrap();
    manager.install_instance(instance.instance_id).unwrap();
    manager.operations().wait_for_all(Duration::from_secs(5)).await;
    manager.start_instance(instance.instance_id).await.unwrap();

    manager.disable_instance(instance.instance_id).await.unwrap();
    let disabled = manager.get_instance(instance.instance_id).unwrap();
    assert_eq!(disabled.status, InstanceStatus::Disabled);
    assert!(disabled.container_id.is_none());
}
