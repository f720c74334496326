//! Logging infrastructure for streamvault
//!
//! Logs go to stdout. When `LOG_DIR` is set they are also written to
//! `$LOG_DIR/streamvault.log` with daily rotation.
//!
//! Components never hold a logger of their own; they emit `tracing` events
//! into whatever subscriber is in scope. Tests scope a subscriber per test
//! with [`tracing::subscriber::with_default`].

use crate::config::LoggingConfig;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// File name used for the rotated log file
pub const LOG_FILE_NAME: &str = "streamvault.log";

/// Initialize the logging system
///
/// Sets up tracing with:
/// - Stdout output
/// - Optional file output with daily rotation
/// - Configurable log level via config or RUST_LOG env var
pub fn init(config: &LoggingConfig) -> crate::error::Result<LoggingGuard> {
    // Build the filter from config or env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let stdout_layer = fmt::layer().with_target(true);

    let (file_layer, guard) = match &config.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;

            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_NAME);

            // Non-blocking writer for better performance
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);

            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::error::Error::Config(format!("failed to install logger: {}", e)))?;

    tracing::debug!(
        level = %config.level,
        log_dir = ?config.dir,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Initialize logging for tests (logs to the test writer)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any pending log writes.
pub struct LoggingGuard {
    _guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_init_creates_log_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("logs");
        let config = LoggingConfig {
            level: "info".to_string(),
            dir: Some(PathBuf::from(&dir)),
        };

        // Another test may have installed a global subscriber already; the
        // directory is created before installation either way.
        let _ = init(&config);
        assert!(dir.is_dir());
    }
}
