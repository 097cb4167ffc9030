//! Layered config loading.
//!
//! Implements the algorithm from `SPEC_FULL.md` §10.4:
//! 1. Start from compiled-in defaults.
//! 2. Merge `/etc/conduit/conduit.yaml` if present.
//! 3. Merge `<data_dir>/conduit.yaml` if present.
//! 4. Merge `./conduit.yaml` (CWD) if present.
//! 5. Apply `CONDUIT_*` environment variable overrides.
//! 6. Validate, creating `data_dir` if it does not yet exist.

use crate::env::{apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::types::Config;
use std::path::{Path, PathBuf};
use tracing::info;

fn try_load_file(path: &Path) -> ConfigResult<Option<serde_yaml::Value>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let value =
                serde_yaml::from_str(&contents).map_err(|source| ConfigError::ParseError {
                    path: path.display().to_string(),
                    source,
                })?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::IoError {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Load the daemon's configuration with layered file precedence.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file present on disk is
/// malformed YAML, or if `data_dir` cannot be created.
pub fn load() -> ConfigResult<Config> {
    load_from(&PathBuf::from("/etc/conduit/conduit.yaml"))
}

/// As [`load`], but with the system-layer path overridable for tests.
pub fn load_from(system_path: &Path) -> ConfigResult<Config> {
    let defaults = Config::default();
    let mut merged = serde_yaml::to_value(&defaults).map_err(|source| ConfigError::ParseError {
        path: "<embedded defaults>".to_string(),
        source,
    })?;

    if let Some(overlay) = try_load_file(system_path)? {
        deep_merge(&mut merged, &overlay);
        info!(path = %system_path.display(), "loaded system config");
    }

    // The user-level file lives under the data dir the defaults/system
    // layers have established so far.
    let data_dir_so_far: Config =
        serde_yaml::from_value(merged.clone()).map_err(|source| ConfigError::ParseError {
            path: "<merged>".to_string(),
            source,
        })?;
    let user_path = data_dir_so_far.data_dir.join("conduit.yaml");
    if let Some(overlay) = try_load_file(&user_path)? {
        deep_merge(&mut merged, &overlay);
        info!(path = %user_path.display(), "loaded user config");
    }

    let cwd_path = PathBuf::from("conduit.yaml");
    if let Some(overlay) = try_load_file(&cwd_path)? {
        deep_merge(&mut merged, &overlay);
        info!(path = %cwd_path.display(), "loaded cwd config");
    }

    let mut config: Config =
        serde_yaml::from_value(merged).map_err(|source| ConfigError::ParseError {
            path: "<merged>".to_string(),
            source,
        })?;

    apply_env_overrides(&mut config, &collect_env_vars());

    validate(&config)?;
    std::fs::create_dir_all(&config.data_dir).map_err(|source| ConfigError::IoError {
        path: config.data_dir.display().to_string(),
        source,
    })?;

    Ok(config)
}

fn validate(config: &Config) -> ConfigResult<()> {
    if config.runtime.health_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "runtime.health_interval_secs must be non-zero".to_string(),
        ));
    }
    if config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "data_dir must not be empty".to_string(),
        ));
    }
    Ok(())
}
