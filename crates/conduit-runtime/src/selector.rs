//! Chooses between the Podman and Docker providers.
//!
//! Mirrors the preferred+autodetect-fallback idiom used elsewhere in this
//! codebase for picking between alternative backends: try the caller's
//! preference first, then fall back through a fixed autodetect order.

use crate::docker::DockerProvider;
use crate::podman::PodmanProvider;
use crate::provider::RuntimeProvider;
use conduit_core::ConduitError;
use std::sync::Arc;

/// Which engine the caller prefers, from `config.runtime.preferred`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preference {
    /// No preference: use the autodetect order (Podman, then Docker).
    #[default]
    Auto,
    /// Try Podman first.
    Podman,
    /// Try Docker first.
    Docker,
}

impl Preference {
    /// Parse a `config.runtime.preferred` value. An empty string or any
    /// value other than `"podman"`/`"docker"` is treated as `Auto`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "podman" => Self::Podman,
            "docker" => Self::Docker,
            _ => Self::Auto,
        }
    }
}

/// Selects and returns an available [`RuntimeProvider`].
pub struct RuntimeSelector;

impl RuntimeSelector {
    /// Try `preferred` first, then fall back through the autodetect order
    /// `podman` → `docker`. "Available" means the executable resolves and
    /// responds to a version check within 5 s (`SPEC_FULL.md` §4.3).
    ///
    /// # Errors
    /// Returns [`ConduitError::RuntimeUnavailable`] if neither engine is
    /// available. Callers (the Lifecycle Manager) may still persist
    /// instances in this case; only start/stop-shaped operations fail.
    pub async fn select(preferred: Preference) -> Result<Arc<dyn RuntimeProvider>, ConduitError> {
        let candidates: Vec<Box<dyn RuntimeProvider>> = match preferred {
            Preference::Docker => vec![Box::new(DockerProvider::new()), Box::new(PodmanProvider::new())],
            Preference::Podman | Preference::Auto => {
                vec![Box::new(PodmanProvider::new()), Box::new(DockerProvider::new())]
            }
        };

        for candidate in candidates {
            if candidate.is_available().await {
                tracing::info!(provider = candidate.name(), "selected container runtime");
                return Ok(Arc::from(candidate));
            }
        }
        Err(ConduitError::RuntimeUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_preference_strings() {
        assert_eq!(Preference::parse("podman"), Preference::Podman);
        assert_eq!(Preference::parse("Docker"), Preference::Docker);
        assert_eq!(Preference::parse(""), Preference::Auto);
        assert_eq!(Preference::parse("nonsense"), Preference::Auto);
    }
}
