//! The background health loop: periodically probes every `Running`/
//! `Degraded` instance's container and promotes/demotes it accordingly
//! (`SPEC_FULL.md` §4.5), and sweeps old completed operations out of the
//! [`crate::OperationTracker`].

use crate::LifecycleManager;
use conduit_core::{EventType, HealthStatus, InstanceStatus};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How long a completed/failed/cancelled operation is kept around before
/// the health loop's sweep drops it.
const OPERATION_RETENTION: Duration = Duration::from_secs(15 * 60);

/// Spawn the health loop as a background task. Ticks every `interval`;
/// exits promptly once `shutdown` is cancelled.
pub fn spawn(manager: LifecycleManager, interval: Duration, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("health loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    tick(&manager).await;
                }
            }
        }
    })
}

async fn tick(manager: &LifecycleManager) {
    manager.operations().sweep(OPERATION_RETENTION);

    let Some(runtime) = manager.runtime.clone() else {
        return;
    };
    let store = &manager.store;

    for status in [InstanceStatus::Running, InstanceStatus::Degraded] {
        let instances = match store.list_instances_by_status(status) {
            Ok(instances) => instances,
            Err(e) => {
                warn!(error = %e, "health loop failed to list instances");
                continue;
            }
        };

        for instance in instances {
            let Some(container_id) = &instance.container_id else {
                continue;
            };
            let healthy = matches!(runtime.status(container_id).await.as_deref(), Ok("running"));
            let now = conduit_core::time::to_rfc3339(chrono::Utc::now());

            if let Err(e) = store.update_instance_health(
                instance.instance_id,
                if healthy { HealthStatus::Healthy } else { HealthStatus::Unhealthy },
                &now,
            ) {
                warn!(instance_id = %instance.instance_id, error = %e, "failed to record health probe");
                continue;
            }

            let next = match (status, healthy) {
                (InstanceStatus::Degraded, true) => Some(InstanceStatus::Running),
                (InstanceStatus::Running, false) => Some(InstanceStatus::Degraded),
                _ => None,
            };
            if let Some(next) = next {
                if let Err(e) = store.update_instance_status(instance.instance_id, next, None, &now) {
                    warn!(instance_id = %instance.instance_id, error = %e, "failed to record health transition");
                    continue;
                }
                if next == InstanceStatus::Degraded {
                    manager.events.publish(
                        EventType::InstanceFailed,
                        serde_json::json!({"instance_id": instance.instance_id, "reason": "health_check_failed"}),
                    );
                }
            }
            manager.events.publish(
                EventType::HealthCheck,
                serde_json::json!({"instance_id": instance.instance_id, "healthy": healthy}),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conduit_events::EventBus;
    use conduit_policy::PolicyEngine;
    use conduit_runtime::{ContainerInfo, ContainerSpec, LogOptions, PullOptions, RuntimeProvider};
    use conduit_storage::Store;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedSender;

    struct AlwaysRunning;

    #[async_trait]
    impl RuntimeProvider for AlwaysRunning {
        fn name(&self) -> &'static str {
            "fake"
        }
        async fn is_available(&self) -> bool {
            true
        }
        async fn pull(&self, _image: &str, _opts: PullOptions) -> Result<(), conduit_core::ConduitError> {
            Ok(())
        }
        async fn run(&self, _spec: &ContainerSpec) -> Result<String, conduit_core::ConduitError> {
            Ok("c1".to_string())
        }
        async fn stop(&self, _container_id: &str, _timeout: Duration) -> Result<(), conduit_core::ConduitError> {
            Ok(())
        }
        async fn remove(&self, _container_id: &str, _force: bool) -> Result<(), conduit_core::ConduitError> {
            Ok(())
        }
        async fn status(&self, _container_id: &str) -> Result<String, conduit_core::ConduitError> {
            Ok("running".to_string())
        }
        async fn inspect(&self, _container_id: &str) -> Result<ContainerInfo, conduit_core::ConduitError> {
            Ok(ContainerInfo::default())
        }
        async fn logs(&self, _container_id: &str, _opts: LogOptions) -> Result<String, conduit_core::ConduitError> {
            Ok(String::new())
        }
        async fn logs_stream(
            &self,
            _container_id: &str,
            _opts: LogOptions,
            _sender: UnboundedSender<String>,
            _cancel: CancellationToken,
        ) -> Result<(), conduit_core::ConduitError> {
            Ok(())
        }
        async fn exec(&self, _container_id: &str, _command: &[String]) -> Result<String, conduit_core::ConduitError> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn tick_promotes_degraded_to_running_when_healthy() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let policy = Arc::new(PolicyEngine::new(store.clone()));
        let runtime: Arc<dyn RuntimeProvider> = Arc::new(AlwaysRunning);
        let manager = LifecycleManager::new(
            store.clone(),
            policy,
            Some(runtime),
            Arc::new(EventBus::new()),
            Duration::from_secs(60),
            Duration::from_secs(30),
            Duration::from_secs(10),
        );

        let instance = manager
            .create_instance(
                "acme.weather".to_string(),
                "1.0.0".to_string(),
                "Weather".to_string(),
                "ghcr.io/acme/weather:1.0.0".to_string(),
                HashMap::new(),
            )
            .unwrap();
        store
            .update_instance_container(instance.instance_id, Some("c1"), "2026-01-01T00:00:00Z")
            .unwrap();
        store
            .update_instance_status(instance.instance_id, InstanceStatus::Degraded, None, "2026-01-01T00:00:00Z")
            .unwrap();

        tick(&manager).await;

        assert_eq!(
            manager.get_instance(instance.instance_id).unwrap().status,
            InstanceStatus::Running
        );
    }
}
