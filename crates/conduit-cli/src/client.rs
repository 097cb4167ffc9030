//! A minimal client for the Dispatcher's Unix-domain-socket transport:
//! connects, writes one length-prefixed [`DispatchRequest`], and reads back
//! its [`DispatchResponse`] (`SPEC_FULL.md` §10.6).

use anyhow::{anyhow, Context, Result};
use conduit_dispatcher::{DispatchRequest, DispatchResponse};
use serde_json::Value;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

/// A short-lived connection to `conduitd`, good for a single request.
pub struct DaemonClient {
    stream: UnixStream,
}

impl DaemonClient {
    /// Connect to the daemon's socket at `path`.
    ///
    /// # Errors
    /// Returns an error if the socket does not exist or refuses the
    /// connection (the daemon most likely isn't running).
    pub async fn connect(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .await
            .with_context(|| format!("failed to connect to conduitd at {}", path.display()))?;
        Ok(Self { stream })
    }

    /// Issue one `{method, params}` request and return its `result`.
    ///
    /// # Errors
    /// Returns an error if the connection fails, the response is malformed,
    /// or the daemon returned an `error` payload.
    pub async fn call(&mut self, method: &str, params: Value) -> Result<Value> {
        let request = DispatchRequest {
            id: Value::String(uuid::Uuid::new_v4().to_string()),
            method: method.to_string(),
            params,
        };
        let bytes = serde_json::to_vec(&request).context("failed to encode request")?;
        let len = u32::try_from(bytes.len()).context("request too large")?;
        self.stream.write_all(&len.to_be_bytes()).await?;
        self.stream.write_all(&bytes).await?;

        let mut len_buf = [0_u8; 4];
        self.stream
            .read_exact(&mut len_buf)
            .await
            .context("daemon closed the connection before responding")?;
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut payload = vec![0_u8; len];
        self.stream.read_exact(&mut payload).await?;

        let response: DispatchResponse =
            serde_json::from_slice(&payload).context("malformed response frame")?;
        if let Some(error) = response.error {
            return Err(anyhow!("{}: {}", error.kind, error.message));
        }
        response
            .result
            .ok_or_else(|| anyhow!("daemon response carried neither result nor error"))
    }
}
