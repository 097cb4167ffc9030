//! In-memory tracking of long-running Lifecycle Manager actions.
//!
//! Operations are never persisted: they describe a pipeline's progress
//! while it runs, not the instance's durable state (that lives in
//! `conduit_storage::Store`). A daemon restart loses in-flight operation
//! handles, which is why `install_instance` always leaves the instance in a
//! well-defined row state at every step — restart can resume by inspecting
//! `ConnectorInstance::status` alone.

use conduit_core::{ConduitError, Operation, OperationId, OperationKind, OperationStatus};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

/// Tracks every [`Operation`] started since the daemon came up, keyed by
/// [`OperationId`]. Completed operations are swept out after a grace period
/// so long-running daemons don't accumulate history forever.
pub struct OperationTracker {
    operations: Mutex<HashMap<OperationId, Operation>>,
}

impl OperationTracker {
    /// Build an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            operations: Mutex::new(HashMap::new()),
        }
    }

    /// Start tracking a new operation of `kind` against `instance_id`,
    /// returning its id.
    pub fn create(&self, kind: OperationKind, instance_id: conduit_core::InstanceId) -> OperationId {
        let operation_id = OperationId::new();
        let operation = Operation {
            operation_id,
            kind,
            instance_id,
            status: OperationStatus::Running,
            current_stage: "starting".to_string(),
            progress: 0,
            error: None,
            result: None,
            created_at: conduit_core::time::to_rfc3339(chrono::Utc::now()),
            completed_at: None,
        };
        self.operations
            .lock()
            .expect("operation tracker mutex poisoned")
            .insert(operation_id, operation);
        operation_id
    }

    /// Fetch a snapshot of `id`'s current state.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::NotFound`] if no such operation is tracked
    /// (including one that was already swept by [`Self::sweep`]).
    pub fn get(&self, id: OperationId) -> Result<Operation, ConduitError> {
        self.operations
            .lock()
            .expect("operation tracker mutex poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| ConduitError::not_found("operation", id.to_string()))
    }

    /// List every tracked operation, terminal or not.
    #[must_use]
    pub fn list(&self) -> Vec<Operation> {
        self.operations
            .lock()
            .expect("operation tracker mutex poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Update `id`'s stage description and progress percentage. A no-op if
    /// `id` is unknown (the operation may have already been swept, or this
    /// is a best-effort progress report racing completion).
    pub fn advance(&self, id: OperationId, stage: impl Into<String>, progress: u8) {
        if let Some(op) = self
            .operations
            .lock()
            .expect("operation tracker mutex poisoned")
            .get_mut(&id)
        {
            op.current_stage = stage.into();
            op.progress = progress.min(100);
        }
    }

    /// Mark `id` as completed with `result`.
    pub fn complete(&self, id: OperationId, result: serde_json::Value) {
        self.finish(id, OperationStatus::Completed, None, Some(result));
    }

    /// Mark `id` as failed with `error`.
    pub fn fail(&self, id: OperationId, error: impl Into<String>) {
        self.finish(id, OperationStatus::Failed, Some(error.into()), None);
    }

    fn finish(
        &self,
        id: OperationId,
        status: OperationStatus,
        error: Option<String>,
        result: Option<serde_json::Value>,
    ) {
        if let Some(op) = self
            .operations
            .lock()
            .expect("operation tracker mutex poisoned")
            .get_mut(&id)
        {
            op.status = status;
            op.progress = if status == OperationStatus::Completed { 100 } else { op.progress };
            op.error = error;
            op.result = result;
            op.completed_at = Some(conduit_core::time::to_rfc3339(chrono::Utc::now()));
        }
    }

    /// Remove every tracked operation that finished more than `max_age` ago.
    /// Called periodically from the health loop.
    pub fn sweep(&self, max_age: Duration) {
        let now = chrono::Utc::now();
        self.operations
            .lock()
            .expect("operation tracker mutex poisoned")
            .retain(|_, op| {
                let Some(completed_at) = &op.completed_at else {
                    return true;
                };
                match conduit_core::time::from_rfc3339(completed_at) {
                    Ok(completed_at) => {
                        now.signed_duration_since(completed_at)
                            < chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX)
                    }
                    Err(_) => true,
                }
            });
    }

    /// Block until every currently-tracked non-terminal operation reaches a
    /// terminal status, or `timeout` elapses — whichever comes first. Any
    /// operation still running once the timeout elapses is force-marked
    /// [`OperationStatus::Cancelled`] so a caller polling afterwards sees a
    /// definite outcome (used by graceful daemon shutdown).
    pub async fn wait_for_all(&self, timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let pending = self
                .operations
                .lock()
                .expect("operation tracker mutex poisoned")
                .values()
                .filter(|op| !op.status.is_terminal())
                .count();
            if pending == 0 || tokio::time::Instant::now() >= deadline {
                break;
            }
            sleep(Duration::from_millis(50)).await;
        }

        let mut operations = self.operations.lock().expect("operation tracker mutex poisoned");
        for op in operations.values_mut() {
            if !op.status.is_terminal() {
                op.status = OperationStatus::Cancelled;
                op.error = Some("cancelled: daemon shutdown deadline reached".to_string());
                op.completed_at = Some(conduit_core::time::to_rfc3339(chrono::Utc::now()));
            }
        }
    }
}

impl Default for OperationTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::InstanceId;

    #[test]
    fn create_then_get_starts_running_at_zero_progress() {
        let tracker = OperationTracker::new();
        let id = tracker.create(OperationKind::Install, InstanceId::new());
        let op = tracker.get(id).unwrap();
        assert_eq!(op.status, OperationStatus::Running);
        assert_eq!(op.progress, 0);
    }

    #[test]
    fn get_missing_operation_is_not_found() {
        let tracker = OperationTracker::new();
        let err = tracker.get(OperationId::new()).unwrap_err();
        assert!(matches!(err, ConduitError::NotFound { .. }));
    }

    #[test]
    fn advance_then_complete_sets_terminal_fields() {
        let tracker = OperationTracker::new();
        let id = tracker.create(OperationKind::Install, InstanceId::new());
        tracker.advance(id, "pulling image", 40);
        assert_eq!(tracker.get(id).unwrap().progress, 40);

        tracker.complete(id, serde_json::json!({"status": "installed"}));
        let op = tracker.get(id).unwrap();
        assert_eq!(op.status, OperationStatus::Completed);
        assert_eq!(op.progress, 100);
        assert!(op.completed_at.is_some());
    }

    #[test]
    fn fail_records_error_and_leaves_progress_unchanged() {
        let tracker = OperationTracker::new();
        let id = tracker.create(OperationKind::Install, InstanceId::new());
        tracker.advance(id, "pulling image", 40);
        tracker.fail(id, "image not found");
        let op = tracker.get(id).unwrap();
        assert_eq!(op.status, OperationStatus::Failed);
        assert_eq!(op.progress, 40);
        assert_eq!(op.error.as_deref(), Some("image not found"));
    }

    #[tokio::test]
    async fn wait_for_all_returns_once_every_operation_is_terminal() {
        let tracker = OperationTracker::new();
        let id = tracker.create(OperationKind::Remove, InstanceId::new());
        tracker.complete(id, serde_json::json!({}));
        tracker.wait_for_all(Duration::from_secs(5)).await;
        assert_eq!(tracker.get(id).unwrap().status, OperationStatus::Completed);
    }

    #[tokio::test]
    async fn wait_for_all_force_cancels_after_timeout() {
        let tracker = OperationTracker::new();
        let id = tracker.create(OperationKind::Install, InstanceId::new());
        tracker.wait_for_all(Duration::from_millis(50)).await;
        assert_eq!(tracker.get(id).unwrap().status, OperationStatus::Cancelled);
    }

    #[test]
    fn sweep_removes_only_old_completed_operations() {
        let tracker = OperationTracker::new();
        let id = tracker.create(OperationKind::Install, InstanceId::new());
        tracker.complete(id, serde_json::json!({}));
        tracker.sweep(Duration::from_secs(900));
        assert!(tracker.get(id).is_ok());

        {
            let mut ops = tracker.operations.lock().unwrap();
            let op = ops.get_mut(&id).unwrap();
            op.completed_at = Some(conduit_core::time::to_rfc3339(
                chrono::Utc::now() - chrono::Duration::seconds(1000),
            ));
        }
        tracker.sweep(Duration::from_secs(900));
        assert!(tracker.get(id).is_err());
    }
}
