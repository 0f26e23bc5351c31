//! Logging setup.
//!
//! This module provides:
//! - Console output filtered by `RUST_LOG` with local timezone timestamps
//! - A message-only run log written to the working log file, which the
//!   publisher later moves over the final log
//! - Size-bounded rotation of the run log

pub mod rotating;

use std::path::PathBuf;

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::utils::fs;
use rotating::RotatingFileWriter;

/// Default console filter directive.
pub const DEFAULT_CONSOLE_FILTER: &str = "tvsrc=warn";

/// Filter directive for the run log file.
pub const FILE_LOG_FILTER: &str = "tvsrc=info";

/// Custom timer that uses the local timezone via chrono.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Keeps the run log writer alive.
///
/// Closing the guard flushes the working log and releases the file handle,
/// after which the file may be published. Events logged afterwards are dropped.
pub struct LogGuard {
    guard: Option<WorkerGuard>,
}

impl LogGuard {
    /// Flush and close the working log file.
    pub fn close(mut self) {
        self.guard.take();
    }
}

/// Logging parameters derived from the update configuration.
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    pub working_log: PathBuf,
    pub max_bytes: u64,
    pub max_backups: usize,
}

/// Initialize console and run-log output.
///
/// # Returns
/// A [`LogGuard`]; keep it until the run log is about to be published.
pub fn init_logging(options: &LoggingOptions) -> crate::Result<LogGuard> {
    if let Some(parent) = options.working_log.parent() {
        if !parent.as_os_str().is_empty() {
            fs::ensure_dir_all_sync(parent)?;
        }
    }

    let writer = RotatingFileWriter::create(
        &options.working_log,
        options.max_bytes,
        options.max_backups,
    )
    .map_err(|e| fs::io_error("creating log file", &options.working_log, e))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(writer);

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_CONSOLE_FILTER));
    let file_filter = EnvFilter::new(FILE_LOG_FILTER);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(true)
                .with_timer(LocalTimer)
                .with_filter(console_filter),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .without_time()
                .with_level(false)
                .with_target(false)
                .with_filter(file_filter),
        )
        .try_init()
        .map_err(|e| {
            crate::Error::Other(format!("Failed to set global default subscriber: {}", e))
        })?;

    Ok(LogGuard {
        guard: Some(guard),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters() {
        assert!(DEFAULT_CONSOLE_FILTER.contains("tvsrc=warn"));
        assert!(FILE_LOG_FILTER.contains("tvsrc=info"));
        assert!(EnvFilter::try_new(DEFAULT_CONSOLE_FILTER).is_ok());
        assert!(EnvFilter::try_new(FILE_LOG_FILTER).is_ok());
    }
}
