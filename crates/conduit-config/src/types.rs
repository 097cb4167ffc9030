//! Configuration types for the Conduit daemon.
//!
//! Every struct implements [`Default`] with sensible production defaults so
//! that a bare/missing `[section]` in `conduit.yaml` produces a working
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the `conduitd` daemon.
///
/// Loaded from layered YAML files (embedded defaults, `/etc/conduit/`,
/// user data dir, CWD) with `CONDUIT_*` environment variable overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory for all daemon-owned state (default `~/.conduit`).
    pub data_dir: PathBuf,
    /// Path to the loopback Unix domain socket.
    pub socket: PathBuf,
    /// `tracing` env-filter directive (e.g. `"info"`, `"conduit=debug"`).
    pub log_level: String,
    /// Output format for the log layer.
    pub log_format: LogFormat,
    /// Container Runtime Provider settings.
    pub runtime: RuntimeConfig,
    /// Policy Engine settings.
    pub policy: PolicyConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            socket: data_dir.join("conduit.sock"),
            data_dir,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            runtime: RuntimeConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|d| d.home_dir().join(".conduit"))
        .unwrap_or_else(|| PathBuf::from(".conduit"))
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line-per-event format.
    #[default]
    Compact,
    /// Newline-delimited JSON, one object per event.
    Json,
}

/// Which container runtime to prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredRuntime {
    /// Try the preferred runtime, falling back to autodetect order.
    #[default]
    Auto,
    /// Prefer Podman.
    Podman,
    /// Prefer Docker.
    Docker,
}

/// Container Runtime Provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Which runtime to prefer when both are available.
    pub preferred: PreferredRuntime,
    /// Timeout for `Pull`, in seconds.
    pub pull_timeout_secs: u64,
    /// Timeout for `Run`/start, in seconds.
    pub start_timeout_secs: u64,
    /// Grace period for `Stop`, in seconds.
    pub stop_timeout_secs: u64,
    /// Health-loop tick interval, in seconds.
    pub health_interval_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            preferred: PreferredRuntime::default(),
            pull_timeout_secs: 600,
            start_timeout_secs: 30,
            stop_timeout_secs: 10,
            health_interval_secs: 30,
        }
    }
}

/// Policy Engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Additional paths (beyond the built-in blocklist) that are always
    /// denied.
    pub forbidden_paths: Vec<String>,
    /// Additional paths that always generate a warning (but not a denial)
    /// when ungranted.
    pub warn_paths: Vec<String>,
    /// Whether egress network requests are considered at all; when `false`,
    /// every egress request is downgraded to `none` regardless of grants.
    pub allow_network_egress: bool,
}
