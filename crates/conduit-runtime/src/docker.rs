//! The Docker [`RuntimeProvider`] implementation.
//!
//! The only provider that implements [`RuntimeProvider::run_interactive`]
//! (`SPEC_FULL.md` §4.3): stdio MCP pass-through wires the caller's stdio
//! straight through to `docker run -i --rm`.

use crate::cli;
use crate::provider::{ContainerInfo, LogOptions, PullOptions, RuntimeProvider};
use crate::ContainerSpec;
use async_trait::async_trait;
use conduit_core::ConduitError;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Drives the `docker` CLI.
#[derive(Debug, Default)]
pub struct DockerProvider;

impl DockerProvider {
    /// Build a Docker provider. The binary is looked up on `PATH` at call
    /// time, not at construction.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RuntimeProvider for DockerProvider {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn is_available(&self) -> bool {
        cli::is_available("docker").await
    }

    async fn pull(&self, image: &str, opts: PullOptions) -> Result<(), ConduitError> {
        let timeout = opts.timeout.or(Some(Duration::from_secs(600)));
        cli::run("docker", &["pull".to_string(), image.to_string()], timeout).await?;
        Ok(())
    }

    async fn run(&self, spec: &ContainerSpec) -> Result<String, ConduitError> {
        let args = spec.to_run_args(false);
        let id = cli::run("docker", &args, Some(Duration::from_secs(30))).await?;
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
        cli::run("docker", &args, Some(timeout + Duration::from_secs(5))).await?;
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
        cli::run("docker", &args, Some(Duration::from_secs(30))).await?;
        Ok(())
    }

    async fn status(&self, container_id: &str) -> Result<String, ConduitError> {
        let args = vec![
            "inspect".to_string(),
            "--format".to_string(),
            "{{.State.Status}}".to_string(),
            container_id.to_string(),
        ];
        cli::run("docker", &args, Some(Duration::from_secs(10))).await
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerInfo, ConduitError> {
        let args = vec!["inspect".to_string(), container_id.to_string()];
        let raw = cli::run("docker", &args, Some(Duration::from_secs(10))).await?;
        crate::inspect::parse_docker_like_inspect(&raw)
    }

    async fn logs(&self, container_id: &str, opts: LogOptions) -> Result<String, ConduitError> {
        let args = cli::logs_args(container_id, &opts, false);
        cli::run("docker", &args, Some(Duration::from_secs(30))).await
    }

    async fn logs_stream(
        &self,
        container_id: &str,
        opts: LogOptions,
        sender: UnboundedSender<String>,
        cancel: CancellationToken,
    ) -> Result<(), ConduitError> {
        let args = cli::logs_args(container_id, &opts, true);
        cli::stream_lines("docker", &args, sender, cancel).await
    }

    async fn exec(&self, container_id: &str, command: &[String]) -> Result<String, ConduitError> {
        let mut args = vec!["exec".to_string(), container_id.to_string()];
        args.extend(command.iter().cloned());
        cli::run("docker", &args, Some(Duration::from_secs(30))).await
    }

    async fn run_interactive(&self, spec: &ContainerSpec) -> Result<i32, ConduitError> {
        let args = spec.to_run_args(true);
        let status = Command::new("docker")
            .args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| ConduitError::RuntimeFailed(format!("failed to spawn docker run: {e}")))?;
        Ok(status.code().unwrap_or(-1))
    }
}
