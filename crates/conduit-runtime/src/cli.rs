//! Shared child-process plumbing for the Docker-CLI-compatible engines.

use conduit_core::ConduitError;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Run `binary args...`, waiting up to `timeout` (if given) and returning
/// captured stdout on success.
///
/// # Errors
/// Returns [`ConduitError::RuntimeFailed`] if the process could not be
/// spawned, exited non-zero, or exceeded `timeout`.
pub(crate) async fn run(
    binary: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<String, ConduitError> {
    let mut command = Command::new(binary);
    command.args(args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let child = command
        .spawn()
        .map_err(|e| ConduitError::RuntimeFailed(format!("failed to spawn {binary}: {e}")))?;

    let output = match timeout {
        Some(duration) => tokio::time::timeout(duration, child.wait_with_output())
            .await
            .map_err(|_| ConduitError::RuntimeFailed(format!("{binary} {} timed out", args.join(" "))))?
            .map_err(|e| ConduitError::RuntimeFailed(e.to_string()))?,
        None => child
            .wait_with_output()
            .await
            .map_err(|e| ConduitError::RuntimeFailed(e.to_string()))?,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ConduitError::RuntimeFailed(if stderr.is_empty() {
            format!("{binary} {} exited with {}", args.join(" "), output.status)
        } else {
            stderr
        }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Run `binary args...` (expected to end in a `-f`/follow-style flag),
/// forwarding each line of its stdout to `sender` as it arrives until either
/// the child exits on its own or `cancel` fires, whichever comes first.
/// Cancellation kills the child rather than waiting for it to notice EOF.
///
/// # Errors
/// Returns [`ConduitError::RuntimeFailed`] if the process could not be
/// spawned or a read off its stdout failed.
pub(crate) async fn stream_lines(
    binary: &str,
    args: &[String],
    sender: UnboundedSender<String>,
    cancel: CancellationToken,
) -> Result<(), ConduitError> {
    let mut command = Command::new(binary);
    command.args(args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::null());
    let mut child = command
        .spawn()
        .map_err(|e| ConduitError::RuntimeFailed(format!("failed to spawn {binary}: {e}")))?;
    let stdout = child.stdout.take().expect("stdout was piped");
    let mut lines = BufReader::new(stdout).lines();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = child.start_kill();
                break;
            }
            next = lines.next_line() => {
                match next {
                    Ok(Some(line)) => {
                        if sender.send(line).is_err() {
                            // Receiver dropped; nobody is listening anymore.
                            let _ = child.start_kill();
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = child.start_kill();
                        return Err(ConduitError::RuntimeFailed(e.to_string()));
                    }
                }
            }
        }
    }
    let _ = child.wait().await;
    Ok(())
}

/// Build the arg vector shared by `docker logs`/`podman logs`: `tail`,
/// `since`, and (for [`stream_lines`] callers) a trailing `-f`.
pub(crate) fn logs_args(container_id: &str, opts: &crate::provider::LogOptions, follow: bool) -> Vec<String> {
    let mut args = vec!["logs".to_string()];
    if let Some(tail) = opts.tail {
        args.push("--tail".to_string());
        args.push(tail.to_string());
    }
    if let Some(since) = &opts.since {
        args.push("--since".to_string());
        args.push(since.clone());
    }
    if follow {
        args.push("-f".to_string());
    }
    args.push(container_id.to_string());
    args
}

/// Whether `binary` resolves on `PATH` (plus, on macOS, the common Homebrew
/// and `/usr/local/bin` install locations) and responds to `--version`
/// within 5 seconds.
pub(crate) async fn is_available(binary: &str) -> bool {
    if which::which(binary).is_err() && !extra_macos_location(binary).is_some_and(|p| p.exists()) {
        return false;
    }
    tokio::time::timeout(Duration::from_secs(5), run(binary, &["version".to_string()], None))
        .await
        .is_ok_and(|r| r.is_ok())
}

#[cfg(target_os = "macos")]
fn extra_macos_location(binary: &str) -> Option<std::path::PathBuf> {
    for root in ["/opt/homebrew/bin", "/usr/local/bin"] {
        let candidate = std::path::Path::new(root).join(binary);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(not(target_os = "macos"))]
fn extra_macos_location(_binary: &str) -> Option<std::path::PathBuf> {
    None
}
