//! `CONDUIT_*` environment variable overrides, applied as the final layer.

use crate::types::{Config, LogFormat, PreferredRuntime};
use std::collections::HashMap;
use std::path::PathBuf;

/// Snapshot every `CONDUIT_*` environment variable into a map, so the
/// override layer can be applied (and tested) without touching the live
/// process environment more than once.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("CONDUIT_"))
        .collect()
}

/// Apply the `CONDUIT_*` overrides in `env_vars` on top of an already-merged
/// [`Config`]. Only the specific fields named in `SPEC_FULL.md` §10.4 are
/// overridable this way; anything else requires a config file.
pub fn apply_env_overrides(config: &mut Config, env_vars: &HashMap<String, String>) {
    if let Some(v) = env_vars.get("CONDUIT_DATA_DIR") {
        config.data_dir = PathBuf::from(v);
    }
    if let Some(v) = env_vars.get("CONDUIT_SOCKET") {
        config.socket = PathBuf::from(v);
    }
    if let Some(v) = env_vars.get("CONDUIT_LOG_LEVEL") {
        config.log_level = v.clone();
    }
    if let Some(v) = env_vars.get("CONDUIT_LOG_FORMAT") {
        config.log_format = match v.as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        };
    }
    if let Some(v) = env_vars.get("CONDUIT_RUNTIME_PREFERRED") {
        config.runtime.preferred = match v.as_str() {
            "podman" => PreferredRuntime::Podman,
            "docker" => PreferredRuntime::Docker,
            _ => PreferredRuntime::Auto,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_replaces_log_level_and_leaves_others_default() {
        let mut env_vars = HashMap::new();
        env_vars.insert("CONDUIT_LOG_LEVEL".to_string(), "debug".to_string());
        let mut config = Config::default();
        apply_env_overrides(&mut config, &env_vars);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.runtime.preferred, PreferredRuntime::Auto);
    }

    #[test]
    fn unknown_prefix_is_not_collected() {
        // collect_env_vars only reads from the real process env; this test
        // only exercises the filter predicate indirectly via a fixed map.
        let env_vars: HashMap<String, String> =
            [("CONDUIT_LOG_LEVEL".to_string(), "warn".to_string())].into();
        let mut config = Config::default();
        apply_env_overrides(&mut config, &env_vars);
        assert_eq!(config.log_level, "warn");
    }
}
