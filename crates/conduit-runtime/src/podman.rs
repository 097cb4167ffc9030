//! The Podman [`RuntimeProvider`] implementation.

use crate::cli;
use crate::provider::{ContainerInfo, LogOptions, PullOptions, RuntimeProvider};
use crate::ContainerSpec;
use async_trait::async_trait;
use conduit_core::ConduitError;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Drives the `podman` CLI.
#[derive(Debug, Default)]
pub struct PodmanProvider;

impl PodmanProvider {
    /// Build a Podman provider. The binary is looked up on `PATH` (plus
    /// macOS Homebrew locations) at call time, not at construction.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RuntimeProvider for PodmanProvider {
    fn name(&self) -> &'static str {
        "podman"
    }

    async fn is_available(&self) -> bool {
        cli::is_available("podman").await
    }

    async fn pull(&self, image: &str, opts: PullOptions) -> Result<(), ConduitError> {
        let timeout = opts.timeout.or(Some(Duration::from_secs(600)));
        cli::run("podman", &["pull".to_string(), image.to_string()], timeout).await?;
        Ok(())
    }

    async fn run(&self, spec: &ContainerSpec) -> Result<String, ConduitError> {
        let args = spec.to_run_args(false);
        let id = cli::run("podman", &args, Some(Duration::from_secs(30))).await?;
        Ok(id.lines().next().unwrap_or_default().to_string())
    }

    async fn stop(&self, container_id: &str, timeout: Duration) -> Result<(), ConduitError> {
        if container_id.is_empty() {
            return Ok(());
        }
        let args = vec![
            "stop".to_string(),
            "--time".to_string(),
            timeout.as_secs().to_string(),
            container_id.to_string(),
        ];
        cli::run("podman", &args, Some(timeout + Duration::from_secs(5))).await?;
        Ok(())
    }

    async fn remove(&self, container_id: &str, force: bool) -> Result<(), ConduitError> {
        if container_id.is_empty() {
            return Ok(());
        }
        let mut args = vec!["rm".to_string()];
        if force {
            args.push("-f".to_string());
        }
        args.push(container_id.to_string());
        cli::run("podman", &args, Some(Duration::from_secs(30))).await?;
        Ok(())
    }

    async fn status(&self, container_id: &str) -> Result<String, ConduitError> {
        let args = vec![
            "inspect".to_string(),
            "--format".to_string(),
            "{{.State.Status}}".to_string(),
            container_id.to_string(),
        ];
        cli::run("podman", &args, Some(Duration::from_secs(10))).await
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerInfo, ConduitError> {
        let args = vec!["inspect".to_string(), container_id.to_string()];
        let raw = cli::run("podman", &args, Some(Duration::from_secs(10))).await?;
        crate::inspect::parse_docker_like_inspect(&raw)
    }

    async fn logs(&self, container_id: &str, opts: LogOptions) -> Result<String, ConduitError> {
        let args = cli::logs_args(container_id, &opts, false);
        cli::run("podman", &args, Some(Duration::from_secs(30))).await
    }

    async fn logs_stream(
        &self,
        container_id: &str,
        opts: LogOptions,
        sender: UnboundedSender<String>,
        cancel: CancellationToken,
    ) -> Result<(), ConduitError> {
        let args = cli::logs_args(container_id, &opts, true);
        cli::stream_lines("podman", &args, sender, cancel).await
    }

    async fn exec(&self, container_id: &str, command: &[String]) -> Result<String, ConduitError> {
        let mut args = vec!["exec".to_string(), container_id.to_string()];
        args.extend(command.iter().cloned());
        cli::run("podman", &args, Some(Duration::from_secs(30))).await
    }
}
