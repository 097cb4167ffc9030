//! `tracing`-based logging setup for `conduitd`.

use crate::error::{TelemetryError, TelemetryResult};
use conduit_config::{Config, LogFormat};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Keeps the non-blocking file writer's background thread alive. Drop this
/// only at process shutdown.
pub struct TelemetryGuard {
    _file_guard: WorkerGuard,
}

/// Install the global `tracing` subscriber for `conduitd`.
///
/// Logs to stderr in the format named by `config.log_format`, and to a
/// daily-rotating file at `<data_dir>/conduit.log`, both gated by an
/// [`EnvFilter`] seeded from `config.log_level`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidDirective`] if `config.log_level` is not
/// a valid `tracing` filter directive, or [`TelemetryError::IoError`] if
/// `data_dir` cannot be created.
pub fn init(config: &Config) -> TelemetryResult<TelemetryGuard> {
    std::fs::create_dir_all(&config.data_dir).map_err(|source| TelemetryError::IoError {
        path: config.data_dir.display().to_string(),
        source,
    })?;

    let filter = EnvFilter::try_new(&config.log_level).map_err(|e| {
        TelemetryError::InvalidDirective {
            directive: config.log_level.clone(),
            reason: e.to_string(),
        }
    })?;

    let file_appender =
        RollingFileAppender::new(Rotation::DAILY, &config.data_dir, "conduit.log");
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Compact => {
            registry
                .with(stderr_layer.compact())
                .with(file_layer.compact())
                .try_init()
                .map_err(|_| TelemetryError::AlreadyInitialized)?;
        }
        LogFormat::Json => {
            registry
                .with(stderr_layer.json())
                .with(file_layer.json())
                .try_init()
                .map_err(|_| TelemetryError::AlreadyInitialized)?;
        }
    }

    Ok(TelemetryGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_data_dir_if_missing() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested").join("data");
        let mut config = Config::default();
        config.data_dir = nested.clone();
        config.log_level = "info".to_string();
        // Subsequent test binaries may already hold the global subscriber;
        // only the directory side effect is asserted here.
        let _ = init(&config);
        assert!(nested.is_dir());
    }
}
