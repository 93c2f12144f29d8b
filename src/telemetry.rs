//! Logging setup.
//!
//! Console output always; a daily rolling file as well when a log directory
//! is configured.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

pub const DEFAULT_FILTER: &str = "leasehold=info";

/// Keeps the file writer flushing until dropped
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_logging(log_dir: Option<&Path>) -> Result<LogGuard> {
    let console = tracing_subscriber::fmt::layer().with_target(false).with_filter(filter());

    let (file, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "leasehold.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to set tracing subscriber")?;

    Ok(LogGuard { _file: guard })
}
