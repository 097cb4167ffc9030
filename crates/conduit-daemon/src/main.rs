//! `conduitd` - the Conduit background daemon.
//!
//! Wires together the Store, Policy Engine, Runtime Provider, Event Bus,
//! Adapter Registry, and Lifecycle Manager, then exposes them over the
//! local Unix-domain-socket Dispatcher transport (`SPEC_FULL.md` §10).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use anyhow::{Context, Result};
use clap::Parser;
use conduit_adapters::AdapterRegistry;
use conduit_dispatcher::Dispatcher;
use conduit_events::EventBus;
use conduit_config::PreferredRuntime;
use conduit_lifecycle::{health, LifecycleManager};
use conduit_policy::PolicyEngine;
use conduit_runtime::{Preference, RuntimeProvider, RuntimeSelector};
use conduit_storage::Store;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Conduit daemon - local control plane for AI client/connector lifecycle.
#[derive(Parser)]
#[command(name = "conduitd")]
#[command(author, version, about = "Conduit daemon - background connector lifecycle manager")]
struct Args {
    /// Override the system config layer path (defaults to `/etc/conduit/conduit.yaml`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging, overriding `log_level` from config.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => conduit_config::load_from(path),
        None => conduit_config::load(),
    }
    .context("failed to load configuration")?;

    if args.verbose {
        config.log_level = "debug".to_string();
    }

    let _telemetry_guard = conduit_telemetry::init(&config).context("failed to initialize logging")?;

    info!(data_dir = %config.data_dir.display(), socket = %config.socket.display(), "starting conduitd");

    let store = Arc::new(
        Store::open(&config.data_dir.join("conduit.db")).context("failed to open the embedded store")?,
    );
    let policy = Arc::new(PolicyEngine::new(store.clone()));
    let events = Arc::new(EventBus::new());
    let adapters = Arc::new(AdapterRegistry::with_builtins());

    let preferred = match config.runtime.preferred {
        PreferredRuntime::Auto => Preference::Auto,
        PreferredRuntime::Podman => Preference::Podman,
        PreferredRuntime::Docker => Preference::Docker,
    };
    let runtime: Option<Arc<dyn RuntimeProvider>> =
        match RuntimeSelector::select(preferred).await {
            Ok(provider) => Some(provider),
            Err(e) => {
                warn!(error = %e, "no container runtime available; instances can be persisted but not started");
                None
            }
        };

    let lifecycle = LifecycleManager::new(
        store.clone(),
        policy.clone(),
        runtime,
        events.clone(),
        Duration::from_secs(config.runtime.pull_timeout_secs),
        Duration::from_secs(config.runtime.start_timeout_secs),
        Duration::from_secs(config.runtime.stop_timeout_secs),
    );

    let shutdown = CancellationToken::new();
    let health_handle = health::spawn(
        lifecycle.clone(),
        Duration::from_secs(config.runtime.health_interval_secs),
        shutdown.clone(),
    );

    let dispatcher = Arc::new(Dispatcher::new(
        lifecycle.clone(),
        policy,
        adapters,
        events,
        store,
        shutdown.clone(),
    ));
    let (listener, socket_path) =
        conduit_dispatcher::bind(&config.socket).context("failed to bind the IPC socket")?;
    info!(socket = %socket_path.display(), "dispatcher listening for local IPC connections");
    let server_handle = conduit_dispatcher::spawn(listener, dispatcher.clone());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received interrupt signal, shutting down");
        }
        () = shutdown.cancelled() => {
            info!("shutdown requested internally");
        }
    }

    shutdown.cancel();
    dispatcher.begin_shutdown();

    if let Err(e) = server_handle.await {
        error!(error = %e, "dispatcher transport task panicked during shutdown");
    }
    health_handle.abort();

    info!("waiting for in-flight operations to settle");
    lifecycle.operations().wait_for_all(Duration::from_secs(10)).await;

    info!("conduitd stopped");
    Ok(())
}
