//! `conduit` - thin CLI client for the Conduit daemon.
//!
//! The rich interactive/administrative CLI described for the wider product
//! is out of scope here; this binary is the thin piece actually required by
//! the MCP server entries the Adapter Registry writes into AI client
//! configs (`conduit mcp stdio --instance <id>`), plus a couple of
//! operator convenience subcommands that talk to the daemon over the same
//! socket (`SPEC_FULL.md` §10.1).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod client;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::DaemonClient;
use conduit_core::InstanceId;
use conduit_runtime::{ContainerSpec, Preference, RuntimeSelector};
use serde_json::json;
use std::path::PathBuf;

/// Conduit - local MCP connector lifecycle client.
#[derive(Parser)]
#[command(name = "conduit")]
#[command(author, version, about = "Conduit - thin client for the conduitd daemon")]
struct Cli {
    /// Override the daemon socket path (defaults to the configured `socket`).
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether the daemon is reachable and a summary of its state.
    Status,

    /// Connector instance operations.
    Instance {
        #[command(subcommand)]
        command: InstanceCommands,
    },

    /// Model Context Protocol entry points. The MCP server entry written
    /// into AI client configs by the Adapter Registry invokes this.
    Mcp {
        #[command(subcommand)]
        command: McpCommands,
    },
}

#[derive(Subcommand)]
enum InstanceCommands {
    /// List every known connector instance.
    List,
}

#[derive(Subcommand)]
enum McpCommands {
    /// Run an instance's container in the foreground with stdio wired
    /// through, for clients that speak MCP over stdio directly.
    Stdio {
        /// The instance to run.
        #[arg(long)]
        instance: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let socket_path = match cli.socket {
        Some(path) => path,
        None => conduit_config::load().context("failed to load configuration")?.socket,
    };

    match cli.command {
        Commands::Status => status(&socket_path).await,
        Commands::Instance {
            command: InstanceCommands::List,
        } => instance_list(&socket_path).await,
        Commands::Mcp {
            command: McpCommands::Stdio { instance },
        } => mcp_stdio(&socket_path, &instance).await,
    }
}

async fn status(socket_path: &std::path::Path) -> Result<()> {
    let mut client = DaemonClient::connect(socket_path).await?;
    let status = client.call("daemon.status", serde_json::Value::Null).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn instance_list(socket_path: &std::path::Path) -> Result<()> {
    let mut client = DaemonClient::connect(socket_path).await?;
    let instances = client.call("instance.list", serde_json::Value::Null).await?;
    println!("{}", serde_json::to_string_pretty(&instances)?);
    Ok(())
}

/// Resolves the instance's image/config via the daemon, then runs it
/// directly with the caller's stdio attached. Implemented in-process
/// (rather than tunnelling bytes over the IPC socket) since
/// `RuntimeProvider::run_interactive` already wires the calling process's
/// own stdin/stdout/stderr through to the container; the daemon is only
/// consulted for the instance's identity and configuration.
async fn mcp_stdio(socket_path: &std::path::Path, instance_id_raw: &str) -> Result<()> {
    let instance_id = InstanceId::parse(instance_id_raw).context("invalid --instance id")?;

    let mut client = DaemonClient::connect(socket_path).await?;
    let instance = client
        .call("instance.get", json!({"instance_id": instance_id_raw}))
        .await
        .context("failed to fetch instance from daemon")?;

    let image_ref = instance["image_ref"]
        .as_str()
        .context("daemon response missing image_ref")?;
    let env: std::collections::BTreeMap<String, String> = instance["config"]
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default();

    let spec = ContainerSpec::new(format!("conduit-{}", short_id(&instance_id)), image_ref, instance_id)
        .with_envs(env)
        .stdin(true)
        .with_security(conduit_runtime::SecurityConfig::hardened());

    let runtime = RuntimeSelector::select(Preference::Docker)
        .await
        .context("no runtime capable of interactive stdio pass-through is available")?;
    let exit_code = runtime.run_interactive(&spec).await?;
    std::process::exit(exit_code);
}

fn short_id(id: &InstanceId) -> String {
    id.to_string().chars().take(8).collect()
}
