//! The [`RuntimeProvider`] trait: the operations any OCI container engine
//! (Podman, Docker) must expose.

use crate::ContainerSpec;
use async_trait::async_trait;
use conduit_core::ConduitError;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Options for [`RuntimeProvider::pull`].
#[derive(Default)]
pub struct PullOptions {
    /// Abort the pull if it hasn't finished within this duration.
    pub timeout: Option<Duration>,
    /// If set, each line of the engine's pull progress output is forwarded
    /// here as it arrives.
    pub progress: Option<UnboundedSender<String>>,
}

/// Options for [`RuntimeProvider::logs`].
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Only return the last `tail` lines.
    pub tail: Option<u32>,
    /// Only return log lines at or after this timestamp (engine-specific format).
    pub since: Option<String>,
    /// Stream until the caller cancels, via [`RuntimeProvider::logs_stream`].
    /// [`RuntimeProvider::logs`] ignores this field and returns what's
    /// currently buffered.
    pub follow: bool,
}

/// The result of [`RuntimeProvider::inspect`].
#[derive(Debug, Clone, Default)]
pub struct ContainerInfo {
    /// The engine-assigned container id.
    pub id: String,
    /// The `--name` the container was created with.
    pub name: String,
    /// The image it was created from.
    pub image: String,
    /// Raw engine state string (`"running"`, `"exited"`, ...).
    pub state: String,
    /// Human-readable status (`"Up 3 minutes"`, ...).
    pub status: String,
    /// Labels attached to the container.
    pub labels: HashMap<String, String>,
    /// RFC 3339 creation timestamp, if the engine reported one.
    pub created_at: Option<String>,
}

/// Abstracts a single OCI container engine CLI (`podman` or `docker`).
///
/// Every operation accepts a cancellation-friendly shape: long-running
/// calls (`pull`, `logs` with `follow`) take a timeout or are driven via
/// [`tokio::select!`] by the caller against the child process's `wait()`.
/// Command failures capture stderr and surface it as
/// [`ConduitError::RuntimeFailed`].
#[async_trait]
pub trait RuntimeProvider: Send + Sync {
    /// The provider's stable name (`"podman"` or `"docker"`), written to
    /// `ConnectorInstance::runtime_provider_name`.
    fn name(&self) -> &'static str;

    /// Whether this engine's executable resolves and responds to a version
    /// check within a few seconds.
    async fn is_available(&self) -> bool;

    /// Pull `image`.
    ///
    /// # Errors
    /// Returns [`ConduitError::RuntimeFailed`] with the captured stderr on
    /// non-zero exit or timeout.
    async fn pull(&self, image: &str, opts: PullOptions) -> Result<(), ConduitError>;

    /// Create and start a container from `spec`, returning its engine id.
    ///
    /// # Errors
    /// Returns [`ConduitError::RuntimeFailed`] on a non-zero exit.
    async fn run(&self, spec: &ContainerSpec) -> Result<String, ConduitError>;

    /// Gracefully stop `container_id`, allowing `timeout` before a forced
    /// kill. A container id of `""` is treated as a no-op success (the
    /// caller never had a running container to stop).
    ///
    /// # Errors
    /// Returns [`ConduitError::RuntimeFailed`] on a non-zero exit.
    async fn stop(&self, container_id: &str, timeout: Duration) -> Result<(), ConduitError>;

    /// Remove `container_id`. `force` kills it first if still running.
    ///
    /// # Errors
    /// Returns [`ConduitError::RuntimeFailed`] on a non-zero exit.
    async fn remove(&self, container_id: &str, force: bool) -> Result<(), ConduitError>;

    /// The engine's current state string for `container_id`
    /// (`"running"`, `"exited"`, `"paused"`, ...).
    ///
    /// # Errors
    /// Returns [`ConduitError::RuntimeFailed`] on a non-zero exit.
    async fn status(&self, container_id: &str) -> Result<String, ConduitError>;

    /// Full inspection record for `container_id`.
    ///
    /// # Errors
    /// Returns [`ConduitError::RuntimeFailed`] on a non-zero exit.
    async fn inspect(&self, container_id: &str) -> Result<ContainerInfo, ConduitError>;

    /// Fetch (non-streaming) logs for `container_id`.
    ///
    /// # Errors
    /// Returns [`ConduitError::RuntimeFailed`] on a non-zero exit.
    async fn logs(&self, container_id: &str, opts: LogOptions) -> Result<String, ConduitError>;

    /// Stream logs for `container_id` (`opts.follow` is implied; each line is
    /// sent to `sender` as it arrives), until the container's log process
    /// exits on its own or `cancel` fires, whichever comes first.
    ///
    /// # Errors
    /// Returns [`ConduitError::RuntimeFailed`] if the log process could not
    /// be spawned or a read off its output failed.
    async fn logs_stream(
        &self,
        container_id: &str,
        opts: LogOptions,
        sender: UnboundedSender<String>,
        cancel: CancellationToken,
    ) -> Result<(), ConduitError>;

    /// Execute `command` inside the running container, returning stdout.
    ///
    /// # Errors
    /// Returns [`ConduitError::RuntimeFailed`] on a non-zero exit.
    async fn exec(&self, container_id: &str, command: &[String]) -> Result<String, ConduitError>;

    /// Run `spec` in the foreground with the caller's stdio wired through
    /// (`-i --rm`), blocking until exit. Used for stdio MCP pass-through.
    ///
    /// Only the Docker provider implements this (`SPEC_FULL.md` §4.3); the
    /// default implementation reports the engine as unable to do it.
    ///
    /// # Errors
    /// Returns [`ConduitError::RuntimeUnavailable`] unless overridden.
    async fn run_interactive(&self, _spec: &ContainerSpec) -> Result<i32, ConduitError> {
        Err(ConduitError::RuntimeUnavailable)
    }
}
