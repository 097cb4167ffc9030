//! Unix-domain-socket transport for the Dispatcher (`SPEC_FULL.md` §10.6).
//!
//! Framing: a 4-byte big-endian length prefix followed by a UTF-8 JSON
//! [`DispatchRequest`]/[`DispatchResponse`]. Each accepted connection runs
//! on its own task; a frame larger than [`MAX_FRAME_BYTES`] is rejected
//! rather than buffered without bound.

use crate::dispatcher::Dispatcher;
use crate::wire::{DispatchRequest, DispatchResponse};
use conduit_core::ConduitError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{error, info, warn};

/// Frames larger than this are rejected outright; guards against a
/// misbehaving or malicious peer forcing an unbounded allocation.
pub const MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

/// Binds `socket_path`, removing a stale socket file left behind by a
/// previous run, and returns the listener plus its resolved path.
///
/// # Errors
///
/// Returns [`ConduitError::Io`] if the parent directory cannot be created
/// or the socket cannot be bound.
pub fn bind(socket_path: &Path) -> Result<(UnixListener, PathBuf), ConduitError> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let listener = UnixListener::bind(socket_path)?;
    Ok((listener, socket_path.to_path_buf()))
}

/// Accept connections on `listener` until `dispatcher`'s shutdown token
/// fires, handing each one to its own task.
pub async fn serve(listener: UnixListener, dispatcher: Dispatcher) {
    let shutdown = dispatcher.shutdown_token();
    info!("dispatcher listening for local IPC connections");
    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                info!("dispatcher transport shutting down, no longer accepting connections");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let dispatcher = dispatcher.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, dispatcher).await;
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to accept IPC connection");
                    }
                }
            }
        }
    }
}

async fn handle_connection(mut stream: UnixStream, dispatcher: Dispatcher) {
    loop {
        let request = match read_frame(&mut stream).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read IPC frame, closing connection");
                break;
            }
        };

        let response = match serde_json::from_slice::<DispatchRequest>(&request) {
            Ok(req) => {
                let result = dispatcher.dispatch(&req.method, req.params).await;
                match result {
                    Ok(value) => DispatchResponse::ok(req.id, value),
                    Err(e) => DispatchResponse::err(req.id, &e),
                }
            }
            Err(e) => DispatchResponse::err(
                serde_json::Value::Null,
                &ConduitError::InvalidRequest(format!("malformed request frame: {e}")),
            ),
        };

        if let Err(e) = write_frame(&mut stream, &response).await {
            warn!(error = %e, "failed to write IPC response, closing connection");
            break;
        }
    }
}

async fn read_frame(stream: &mut UnixStream) -> std::io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0_u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds the {MAX_FRAME_BYTES}-byte ceiling"),
        ));
    }
    let mut payload = vec![0_u8; len as usize];
    stream.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

async fn write_frame(stream: &mut UnixStream, response: &DispatchResponse) -> std::io::Result<()> {
    let bytes = serde_json::to_vec(response)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(bytes.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "response too large"))?;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(&bytes).await?;
    Ok(())
}

/// Spawn [`serve`] on a background task, returning its handle so the
/// caller can await it during shutdown.
#[must_use]
pub fn spawn(listener: UnixListener, dispatcher: Arc<Dispatcher>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        serve(listener, (*dispatcher).clone()).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use conduit_adapters::AdapterRegistry;
    use conduit_events::EventBus;
    use conduit_lifecycle::LifecycleManager;
    use conduit_policy::PolicyEngine;
    use conduit_runtime::RuntimeProvider;
    use conduit_storage::Store;
    use serde_json::json;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

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
    async fn round_trips_a_request_over_the_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("conduit.sock");
        let (listener, _) = bind(&socket_path).unwrap();
        let dispatcher = Arc::new(make_dispatcher());
        let server = spawn(listener, dispatcher.clone());

        let mut client = UnixStream::connect(&socket_path).await.unwrap();
        let request = DispatchRequest {
            id: json!(1),
            method: "daemon.status".to_string(),
            params: serde_json::Value::Null,
        };
        let bytes = serde_json::to_vec(&request).unwrap();
        client.write_all(&(bytes.len() as u32).to_be_bytes()).await.unwrap();
        client.write_all(&bytes).await.unwrap();

        let mut len_buf = [0_u8; 4];
        client.read_exact(&mut len_buf).await.unwrap();
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut payload = vec![0_u8; len];
        client.read_exact(&mut payload).await.unwrap();
        let response: DispatchResponse = serde_json::from_slice(&payload).unwrap();

        assert_eq!(response.id, json!(1));
        assert!(response.result.is_some());

        dispatcher.begin_shutdown();
        drop(client);
        let _ = server.await;
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("conduit.sock");
        let (listener, _) = bind(&socket_path).unwrap();
        let dispatcher = Arc::new(make_dispatcher());
        let server = spawn(listener, dispatcher.clone());

        let mut client = UnixStream::connect(&socket_path).await.unwrap();
        client.write_all(&(MAX_FRAME_BYTES + 1).to_be_bytes()).await.unwrap();

        // The server closes the connection without reading the (never-sent)
        // oversized payload.
        let mut buf = [0_u8; 1];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);

        dispatcher.begin_shutdown();
        let _ = server.await;
    }
}
