//! [`ContainerSpec`]: the runtime-agnostic description of a container to
//! run, produced by the Lifecycle Manager and consumed by a
//! [`crate::RuntimeProvider`].

use conduit_core::InstanceId;
use std::collections::BTreeMap;

/// Network mode a container is attached with. Distinct from
/// [`conduit_core::NetworkMode`], which describes a *permission* (whether
/// egress is granted at all); this describes the actual container network
/// attachment the runtime provider is asked to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerNetworkMode {
    /// No network namespace sharing; the container has no network access.
    #[default]
    None,
    /// Attached to the runtime's default bridge network.
    Bridge,
    /// Shares the host's network namespace.
    Host,
}

impl ContainerNetworkMode {
    /// The CLI argument value accepted by `--network`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bridge => "bridge",
            Self::Host => "host",
        }
    }
}

/// Transport protocol of a published port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// TCP.
    Tcp,
    /// UDP.
    Udp,
}

/// A bind mount from the host into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Host path.
    pub source: String,
    /// Path inside the container.
    pub target: String,
    /// Whether the container may only read it.
    pub readonly: bool,
}

/// A host-to-container port mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    /// Host port.
    pub host: u16,
    /// Container port.
    pub container: u16,
    /// Protocol.
    pub protocol: Protocol,
}

/// Security hardening options for a container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecurityConfig {
    /// Mount the container's root filesystem read-only.
    pub readonly_rootfs: bool,
    /// Disallow privilege escalation via setuid/setgid binaries.
    pub no_new_privileges: bool,
    /// Linux capabilities to drop, e.g. `["ALL"]`.
    pub drop_capabilities: Vec<String>,
    /// Run as this user (`uid`, `uid:gid`, or name), if set.
    pub user: Option<String>,
    /// Named or path-referenced seccomp profile.
    pub seccomp_profile: Option<String>,
    /// Named AppArmor profile.
    pub apparmor_profile: Option<String>,
}

impl SecurityConfig {
    /// The hardened defaults the Lifecycle Manager always requests for
    /// connector containers (`SPEC_FULL.md` §4.3): read-only root
    /// filesystem, no privilege escalation, every Linux capability dropped.
    #[must_use]
    pub fn hardened() -> Self {
        Self {
            readonly_rootfs: true,
            no_new_privileges: true,
            drop_capabilities: vec!["ALL".to_string()],
            user: None,
            seccomp_profile: None,
            apparmor_profile: None,
        }
    }
}

/// Resource limits. A value of zero means "unlimited" — the runtime's own
/// default applies.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Resources {
    /// Memory limit in megabytes, or 0 for unlimited.
    pub memory_mb: u64,
    /// CPU limit (fractional cores), or 0.0 for unlimited.
    pub cpus: f64,
}

/// A runtime-agnostic container specification. Argument construction from a
/// spec is deterministic: `env`/`labels` are `BTreeMap`s, so the same spec
/// always produces the same argument vector regardless of insertion order.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Container name, conventionally `conduit-<instance_id[:8]>`.
    pub name: String,
    /// OCI image reference.
    pub image: String,
    /// Command to run, overriding the image's default `CMD`.
    pub command: Option<Vec<String>>,
    /// Entrypoint override.
    pub entrypoint: Option<Vec<String>>,
    /// Environment variables.
    pub env: BTreeMap<String, String>,
    /// Container labels. Always carries `conduit.managed` and
    /// `conduit.instance_id`.
    pub labels: BTreeMap<String, String>,
    /// Working directory inside the container.
    pub working_dir: Option<String>,
    /// Whether stdin should be kept open — `true` for MCP-stdio connectors.
    pub stdin: bool,
    /// Bind mounts.
    pub mounts: Vec<Mount>,
    /// Published ports.
    pub ports: Vec<PortMapping>,
    /// Network attachment mode. Defaults to
    /// [`ContainerNetworkMode::None`] and the runtime provider must honour
    /// that default even if a caller leaves the field at its zero value.
    pub network_mode: ContainerNetworkMode,
    /// Security hardening options.
    pub security: SecurityConfig,
    /// Resource limits.
    pub resources: Resources,
}

impl ContainerSpec {
    /// The label value that marks every container this daemon manages.
    pub const MANAGED_LABEL: &'static str = "conduit.managed";
    /// The label key carrying the owning instance's id.
    pub const INSTANCE_LABEL: &'static str = "conduit.instance_id";

    /// Start a new spec for `instance_id`, seeding the two labels every
    /// managed container must carry.
    #[must_use]
    pub fn new(name: impl Into<String>, image: impl Into<String>, instance_id: InstanceId) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(Self::MANAGED_LABEL.to_string(), "true".to_string());
        labels.insert(Self::INSTANCE_LABEL.to_string(), instance_id.to_string());
        Self {
            name: name.into(),
            image: image.into(),
            command: None,
            entrypoint: None,
            env: BTreeMap::new(),
            labels,
            working_dir: None,
            stdin: false,
            mounts: Vec::new(),
            ports: Vec::new(),
            network_mode: ContainerNetworkMode::None,
            security: SecurityConfig::default(),
            resources: Resources::default(),
        }
    }

    /// Override the image's default command.
    #[must_use]
    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = Some(command);
        self
    }

    /// Override the image's entrypoint.
    #[must_use]
    pub fn with_entrypoint(mut self, entrypoint: Vec<String>) -> Self {
        self.entrypoint = Some(entrypoint);
        self
    }

    /// Set one environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Merge in a batch of environment variables.
    #[must_use]
    pub fn with_envs(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env.extend(vars);
        self
    }

    /// Set one label, in addition to the two always-present managed labels.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Enable or disable keeping stdin open.
    #[must_use]
    pub fn stdin(mut self, enabled: bool) -> Self {
        self.stdin = enabled;
        self
    }

    /// Add a bind mount.
    #[must_use]
    pub fn with_mount(mut self, mount: Mount) -> Self {
        self.mounts.push(mount);
        self
    }

    /// Add a published port.
    #[must_use]
    pub fn with_port(mut self, port: PortMapping) -> Self {
        self.ports.push(port);
        self
    }

    /// Set the network attachment mode.
    #[must_use]
    pub fn with_network_mode(mut self, mode: ContainerNetworkMode) -> Self {
        self.network_mode = mode;
        self
    }

    /// Set security hardening options.
    #[must_use]
    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    /// Set resource limits.
    #[must_use]
    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    /// Build the `run` argument vector a Docker-CLI-compatible engine
    /// (Podman or Docker) accepts for this spec. `interactive` selects
    /// `-i --rm` (foreground, for `RunInteractive`) versus `-d` (detached,
    /// for `Run`).
    #[must_use]
    pub fn to_run_args(&self, interactive: bool) -> Vec<String> {
        let mut args = vec!["run".to_string()];
        if interactive {
            args.push("-i".to_string());
            args.push("--rm".to_string());
        } else {
            args.push("-d".to_string());
            if self.stdin {
                args.push("-i".to_string());
            }
        }

        args.push("--name".to_string());
        args.push(self.name.clone());

        for (key, value) in &self.labels {
            args.push("-l".to_string());
            args.push(format!("{key}={value}"));
        }
        for (key, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        for mount in &self.mounts {
            let suffix = if mount.readonly { ":ro" } else { "" };
            args.push("-v".to_string());
            args.push(format!("{}:{}{suffix}", mount.source, mount.target));
        }
        for port in &self.ports {
            let proto = match port.protocol {
                Protocol::Tcp => "tcp",
                Protocol::Udp => "udp",
            };
            args.push("-p".to_string());
            args.push(format!("{}:{}/{proto}", port.host, port.container));
        }

        args.push("--network".to_string());
        args.push(self.network_mode.as_str().to_string());

        if self.security.readonly_rootfs {
            args.push("--read-only".to_string());
        }
        if self.security.no_new_privileges {
            args.push("--security-opt".to_string());
            args.push("no-new-privileges".to_string());
        }
        for cap in &self.security.drop_capabilities {
            args.push("--cap-drop".to_string());
            args.push(cap.clone());
        }
        if let Some(user) = &self.security.user {
            args.push("--user".to_string());
            args.push(user.clone());
        }
        if let Some(seccomp) = &self.security.seccomp_profile {
            args.push("--security-opt".to_string());
            args.push(format!("seccomp={seccomp}"));
        }
        if let Some(apparmor) = &self.security.apparmor_profile {
            args.push("--security-opt".to_string());
            args.push(format!("apparmor={apparmor}"));
        }

        if self.resources.memory_mb > 0 {
            args.push("--memory".to_string());
            args.push(format!("{}m", self.resources.memory_mb));
        }
        if self.resources.cpus > 0.0 {
            args.push("--cpus".to_string());
            args.push(self.resources.cpus.to_string());
        }

        if let Some(dir) = &self.working_dir {
            args.push("-w".to_string());
            args.push(dir.clone());
        }
        if let Some(entrypoint) = self.entrypoint.as_ref().and_then(|e| e.first()) {
            args.push("--entrypoint".to_string());
            args.push(entrypoint.clone());
        }

        args.push(self.image.clone());
        if let Some(command) = &self.command {
            args.extend(command.clone());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_managed_labels() {
        let spec = ContainerSpec::new("conduit-abc", "ghcr.io/acme/echo:latest", InstanceId::new());
        assert_eq!(spec.labels.get(ContainerSpec::MANAGED_LABEL).map(String::as_str), Some("true"));
        assert!(spec.labels.contains_key(ContainerSpec::INSTANCE_LABEL));
    }

    #[test]
    fn network_defaults_to_none_even_when_unset() {
        let spec = ContainerSpec::new("n", "i", InstanceId::new());
        let args = spec.to_run_args(false);
        let idx = args.iter().position(|a| a == "--network").unwrap();
        assert_eq!(args[idx + 1], "none");
    }

    #[test]
    fn same_spec_produces_identical_args_every_time() {
        let spec = ContainerSpec::new("n", "i", InstanceId::new())
            .with_env("B", "2")
            .with_env("A", "1")
            .with_security(SecurityConfig::hardened());
        assert_eq!(spec.to_run_args(false), spec.to_run_args(false));

        let a_idx = spec.to_run_args(false).iter().position(|a| a == "A=1").unwrap();
        let b_idx = spec.to_run_args(false).iter().position(|a| a == "B=2").unwrap();
        assert!(a_idx < b_idx, "BTreeMap iteration must be key-sorted");
    }

    #[test]
    fn hardened_security_emits_expected_flags() {
        let spec = ContainerSpec::new("n", "i", InstanceId::new()).with_security(SecurityConfig::hardened());
        let args = spec.to_run_args(false);
        assert!(args.iter().any(|a| a == "--read-only"));
        assert!(args.windows(2).any(|w| w == ["--cap-drop", "ALL"]));
    }

    #[test]
    fn interactive_mode_uses_dash_i_dash_dash_rm() {
        let spec = ContainerSpec::new("n", "i", InstanceId::new());
        let args = spec.to_run_args(true);
        assert_eq!(&args[1..3], ["-i", "--rm"]);
    }
}
