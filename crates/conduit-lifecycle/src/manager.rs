//! [`LifecycleManager`]: the state machine and pipelines described by
//! `SPEC_FULL.md` §4.5 — instance creation, install, start/stop,
//! disable/enable, and removal.

use crate::operations::OperationTracker;
use crate::transitions;
use conduit_core::{
    Actor, ConduitError, ConnectorInstance, EventType, HealthStatus, InstanceId, InstanceStatus,
    OperationId, OperationKind,
};
use conduit_events::EventBus;
use conduit_policy::{PolicyEngine, Request};
use conduit_runtime::{ContainerSpec, PullOptions, RuntimeProvider, SecurityConfig};
use conduit_storage::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Orchestrates the Store, Policy Engine, and Runtime Provider to carry
/// instances through their lifecycle. Cheaply cloneable (every field is an
/// `Arc`); the daemon holds one and shares it with the dispatcher and the
/// background health loop.
#[derive(Clone)]
pub struct LifecycleManager {
    pub(crate) store: Arc<Store>,
    policy: Arc<PolicyEngine>,
    pub(crate) runtime: Option<Arc<dyn RuntimeProvider>>,
    pub(crate) events: Arc<EventBus>,
    operations: Arc<OperationTracker>,
    pull_timeout: Duration,
    start_timeout: Duration,
    stop_timeout: Duration,
}

impl LifecycleManager {
    /// Build a manager. `runtime` is `None` when no container engine could
    /// be selected at startup (`SPEC_FULL.md` §4.3); instances can still be
    /// created and removed, but `install_instance`/`start_instance` fail
    /// with [`ConduitError::RuntimeUnavailable`].
    #[must_use]
    pub fn new(
        store: Arc<Store>,
        policy: Arc<PolicyEngine>,
        runtime: Option<Arc<dyn RuntimeProvider>>,
        events: Arc<EventBus>,
        pull_timeout: Duration,
        start_timeout: Duration,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            store,
            policy,
            runtime,
            events,
            operations: Arc::new(OperationTracker::new()),
            pull_timeout,
            start_timeout,
            stop_timeout,
        }
    }

    /// The operation tracker, shared with the health loop's GC sweep and
    /// with daemon shutdown's [`OperationTracker::wait_for_all`] call.
    #[must_use]
    pub fn operations(&self) -> &Arc<OperationTracker> {
        &self.operations
    }

    /// Fetch a snapshot of a tracked operation.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if `id` is not tracked.
    pub fn get_operation(&self, id: OperationId) -> Result<conduit_core::Operation, ConduitError> {
        self.operations.get(id)
    }

    fn require_runtime(&self) -> Result<&Arc<dyn RuntimeProvider>, ConduitError> {
        self.runtime.as_ref().ok_or(ConduitError::RuntimeUnavailable)
    }

    fn emit(&self, event_type: EventType, data: serde_json::Value) {
        self.events.publish(event_type, data);
    }

    fn now(&self) -> String {
        conduit_core::time::to_rfc3339(chrono::Utc::now())
    }

    /// Insert a new instance row in [`InstanceStatus::Created`].
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::Conflict`] if the store rejects the insert.
    pub fn create_instance(
        &self,
        package_id: String,
        package_version: String,
        display_name: String,
        image_ref: String,
        config: HashMap<String, String>,
    ) -> Result<ConnectorInstance, ConduitError> {
        let now = self.now();
        let instance = ConnectorInstance {
            instance_id: InstanceId::new(),
            package_id,
            package_version,
            display_name,
            image_ref,
            container_id: None,
            socket_path: None,
            runtime_provider_name: self.runtime.as_ref().map(|r| r.name().to_string()),
            status: InstanceStatus::Created,
            health_status: HealthStatus::Unknown,
            error_message: None,
            config,
            granted_perms: conduit_core::PermissionSet::empty(),
            audit_result: None,
            created_at: now.clone(),
            updated_at: now,
            started_at: None,
            stopped_at: None,
            last_health_check: None,
        };
        self.store.create_instance(&instance)?;
        self.emit(
            EventType::InstanceCreated,
            serde_json::json!({"instance_id": instance.instance_id}),
        );
        Ok(instance)
    }

    /// Start the install pipeline for `instance_id`: audit, policy
    /// evaluation, and image pull, run on a background task. Returns
    /// immediately with an [`OperationId`] the caller polls via
    /// [`Self::get_operation`].
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if `instance_id` doesn't exist, or
    /// [`ConduitError::Conflict`] if it isn't in [`InstanceStatus::Created`].
    pub fn install_instance(&self, instance_id: InstanceId) -> Result<OperationId, ConduitError> {
        let instance = self.store.get_instance(instance_id)?;
        if instance.status != InstanceStatus::Created {
            return Err(ConduitError::Conflict(format!(
                "instance {instance_id} is {:?}, install requires Created",
                instance.status
            )));
        }

        let operation_id = self.operations.create(OperationKind::Install, instance_id);
        let manager = self.clone();
        tokio::spawn(async move {
            manager.run_install_pipeline(instance_id, operation_id).await;
        });
        Ok(operation_id)
    }

    async fn run_install_pipeline(&self, instance_id: InstanceId, operation_id: OperationId) {
        if let Err(e) = self.install_pipeline_inner(instance_id, operation_id).await {
            error!(%instance_id, error = %e, "install pipeline failed");
            self.operations.fail(operation_id, e.to_string());
        }
    }

    async fn install_pipeline_inner(
        &self,
        instance_id: InstanceId,
        operation_id: OperationId,
    ) -> Result<(), ConduitError> {
        let now = self.now();
        self.transition(instance_id, InstanceStatus::Auditing, None, &now)?;
        self.operations.advance(operation_id, "auditing", 10);

        // The audit step itself is currently a no-op placeholder
        // (`ConnectorInstance::audit_result` stays `None`); only policy
        // evaluation and the image pull gate progress.
        self.operations.advance(operation_id, "evaluating policy", 25);
        let instance = self.store.get_instance(instance_id)?;
        let decision = self.policy.evaluate(
            Request::empty("install", Actor::System).with_instance(instance_id),
        )?;
        if decision.decision == conduit_core::Decision::Deny {
            let now = self.now();
            self.transition(instance_id, InstanceStatus::Blocked, Some(&decision.block_reasons.join("; ")), &now)?;
            self.operations.fail(operation_id, decision.block_reasons.join("; "));
            self.emit(
                EventType::InstanceFailed,
                serde_json::json!({"instance_id": instance_id, "reason": "policy_denied"}),
            );
            return Ok(());
        }

        if !instance.image_ref.is_empty() {
            self.operations.advance(operation_id, "pulling image", 40);
            let runtime = self.require_runtime()?;
            if let Err(e) = runtime
                .pull(
                    &instance.image_ref,
                    PullOptions {
                        timeout: Some(self.pull_timeout),
                        progress: None,
                    },
                )
                .await
            {
                // Failure: fail the operation; status remains AUDITING so
                // the caller can retry install without recreating the row.
                self.operations.fail(operation_id, e.to_string());
                self.emit(
                    EventType::InstanceFailed,
                    serde_json::json!({"instance_id": instance_id, "reason": "pull_failed"}),
                );
                return Ok(());
            }
            self.operations.advance(operation_id, "pull complete", 85);
        }

        let now = self.now();
        self.transition(instance_id, InstanceStatus::Installed, None, &now)?;
        self.operations
            .complete(operation_id, serde_json::json!({"status": "installed"}));
        Ok(())
    }

    fn transition(
        &self,
        instance_id: InstanceId,
        next: InstanceStatus,
        error_message: Option<&str>,
        timestamp: &str,
    ) -> Result<(), ConduitError> {
        let current = self.store.get_instance(instance_id)?.status;
        if !current.is_valid_transition(next) {
            return Err(ConduitError::Conflict(format!(
                "invalid transition {current:?} -> {next:?} for instance {instance_id}"
            )));
        }
        self.store
            .update_instance_status(instance_id, next, error_message, timestamp)
    }

    /// Start `instance_id`'s container. Requires [`InstanceStatus::Installed`]
    /// or [`InstanceStatus::Stopped`].
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::RuntimeUnavailable`] if no runtime was
    /// selected, or [`ConduitError::Conflict`] if the instance isn't in a
    /// startable state.
    pub async fn start_instance(&self, instance_id: InstanceId) -> Result<(), ConduitError> {
        let runtime = self.require_runtime()?.clone();
        let instance = self.store.get_instance(instance_id)?;

        let now = self.now();
        self.transition(instance_id, InstanceStatus::Starting, None, &now)?;

        let instance_hex = instance.instance_id.as_uuid().simple().to_string();
        let spec = ContainerSpec::new(format!("conduit-{}", &instance_hex[..8]), instance.image_ref.clone(), instance_id)
            .with_envs(instance.config.clone())
            .stdin(true)
            .with_security(SecurityConfig::hardened());

        let container_id = match tokio::time::timeout(self.start_timeout, runtime.run(&spec)).await {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => {
                let now = self.now();
                self.store
                    .update_instance_status(instance_id, InstanceStatus::Degraded, Some(&e.to_string()), &now)?;
                self.emit(
                    EventType::InstanceFailed,
                    serde_json::json!({"instance_id": instance_id, "reason": "run_failed"}),
                );
                return Err(e);
            }
            Err(_) => {
                let now = self.now();
                let message = "start timed out".to_string();
                self.store
                    .update_instance_status(instance_id, InstanceStatus::Degraded, Some(&message), &now)?;
                self.emit(
                    EventType::InstanceFailed,
                    serde_json::json!({"instance_id": instance_id, "reason": "start_timeout"}),
                );
                return Err(ConduitError::RuntimeFailed(message));
            }
        };

        let now = self.now();
        self.store
            .update_instance_container(instance_id, Some(&container_id), &now)?;

        let healthy = matches!(runtime.status(&container_id).await.as_deref(), Ok("running"));
        let now = self.now();
        self.store.update_instance_health(
            instance_id,
            if healthy { HealthStatus::Healthy } else { HealthStatus::Unhealthy },
            &now,
        )?;

        if healthy {
            let now = self.now();
            self.store.update_instance_started(instance_id, &now)?;
            self.emit(
                EventType::InstanceStarted,
                serde_json::json!({"instance_id": instance_id, "container_id": container_id}),
            );
            Ok(())
        } else {
            let now = self.now();
            let message = "container unhealthy immediately after start".to_string();
            self.store
                .update_instance_status(instance_id, InstanceStatus::Degraded, Some(&message), &now)?;
            self.emit(
                EventType::InstanceFailed,
                serde_json::json!({"instance_id": instance_id, "reason": "unhealthy_after_start"}),
            );
            Err(ConduitError::RuntimeFailed(message))
        }
    }

    /// Stop `instance_id`'s container. Requires [`InstanceStatus::Running`]
    /// or [`InstanceStatus::Degraded`]. A container stop failure is logged
    /// but never blocks the transition to [`InstanceStatus::Stopped`] — the
    /// row must always be able to reach a quiescent state.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::Conflict`] if the instance isn't running.
    pub async fn stop_instance(&self, instance_id: InstanceId) -> Result<(), ConduitError> {
        let instance = self.store.get_instance(instance_id)?;
        let now = self.now();
        self.transition(instance_id, InstanceStatus::Stopping, None, &now)?;

        if let Some(runtime) = &self.runtime {
            if let Some(container_id) = &instance.container_id {
                if let Err(e) = runtime.stop(container_id, self.stop_timeout).await {
                    warn!(%instance_id, error = %e, "container stop failed, proceeding to STOPPED anyway");
                }
            }
        }

        let now = self.now();
        self.store.update_instance_stopped(instance_id, &now)?;
        self.emit(EventType::InstanceStopped, serde_json::json!({"instance_id": instance_id}));
        Ok(())
    }

    /// Disable `instance_id`: best-effort stop if running, then transition
    /// directly to [`InstanceStatus::Disabled`] (the transition table
    /// allows `Running`/`Degraded`/`Installed` to reach `Disabled`
    /// directly, without passing through `Stopped`).
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::Conflict`] if the current status has no
    /// direct path to `Disabled`.
    pub async fn disable_instance(&self, instance_id: InstanceId) -> Result<(), ConduitError> {
        let instance = self.store.get_instance(instance_id)?;

        if matches!(instance.status, InstanceStatus::Running | InstanceStatus::Degraded) {
            if let Some(runtime) = &self.runtime {
                if let Some(container_id) = &instance.container_id {
                    if let Err(e) = runtime.stop(container_id, self.stop_timeout).await {
                        warn!(%instance_id, error = %e, "container stop failed while disabling");
                    }
                }
            }
            let now = self.now();
            self.store.update_instance_container(instance_id, None, &now)?;
        }

        let now = self.now();
        self.transition(instance_id, InstanceStatus::Disabled, None, &now)?;
        info!(%instance_id, "instance disabled");
        Ok(())
    }

    /// Re-enable a disabled instance, returning it to
    /// [`InstanceStatus::Installed`].
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::Conflict`] if the instance isn't
    /// [`InstanceStatus::Disabled`].
    pub fn enable_instance(&self, instance_id: InstanceId) -> Result<(), ConduitError> {
        let now = self.now();
        self.transition(instance_id, InstanceStatus::Installed, None, &now)
    }

    /// Tear down `instance_id`: best-effort container stop and removal,
    /// then delete its row (cascading to its bindings and grants). Runtime
    /// failures are logged but never block the deletion — an instance must
    /// always become removable, even with a broken runtime underneath it.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if `instance_id` doesn't exist, or
    /// [`ConduitError::Conflict`] if its current status has no path to
    /// [`InstanceStatus::Removing`].
    pub async fn remove_instance(&self, instance_id: InstanceId) -> Result<(), ConduitError> {
        let instance = self.store.get_instance(instance_id)?;

        if let (Some(runtime), Some(container_id)) = (&self.runtime, &instance.container_id) {
            if matches!(
                instance.status,
                InstanceStatus::Running
                    | InstanceStatus::Degraded
                    | InstanceStatus::Starting
                    | InstanceStatus::Stopping
            ) {
                if let Err(e) = runtime.stop(container_id, self.stop_timeout).await {
                    warn!(%instance_id, error = %e, "container stop failed while removing");
                }
            }
            if let Err(e) = runtime.remove(container_id, true).await {
                warn!(%instance_id, error = %e, "container remove failed, deleting row anyway");
            }
        }

        let current = self.store.get_instance(instance_id)?.status;
        if current != InstanceStatus::Removing {
            if let Some(path) = transitions::shortest_path(current, InstanceStatus::Removing) {
                for step in path {
                    let now = self.now();
                    self.transition(instance_id, step, None, &now)?;
                }
            } else {
                return Err(ConduitError::Conflict(format!(
                    "instance {instance_id} in {current:?} has no path to Removing"
                )));
            }
        }

        self.store.delete_instance(instance_id)?;
        self.emit(EventType::InstanceRemoved, serde_json::json!({"instance_id": instance_id}));
        Ok(())
    }

    /// Fetch an instance by id, unchanged from the Store.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if `instance_id` doesn't exist.
    pub fn get_instance(&self, instance_id: InstanceId) -> Result<ConnectorInstance, ConduitError> {
        self.store.get_instance(instance_id)
    }

    /// List every instance.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] on a query failure.
    pub fn list_instances(&self) -> Result<Vec<ConnectorInstance>, ConduitError> {
        self.store.list_instances()
    }
}
