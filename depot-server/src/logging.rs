//! Console logging plus an optional daily log file.

use crate::config::LogConfig;
use anyhow::Context;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Log files are named `depot.YYYY-MM-DD.log`.
pub const FILE_PREFIX: &str = "depot";
const FILE_SUFFIX: &str = "log";

/// A daily rotating file writer under `dir` keeping `retention` files.
pub fn file_appender(dir: &Path, retention: usize) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(FILE_PREFIX)
        .filename_suffix(FILE_SUFFIX)
        .max_log_files(retention.max(1))
        .build(dir)
}

/// Deletes the oldest log files in `dir` beyond `retention`.
///
/// Rotation only prunes when a day rolls over, so a service that restarts
/// often would otherwise keep every file. Returns the number removed.
pub fn prune(dir: &Path, retention: usize) -> std::io::Result<usize> {
    let prefix = format!("{FILE_PREFIX}.");
    let suffix = format!(".{FILE_SUFFIX}");
    let mut logs: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(&suffix))
        })
        .collect();
    if logs.len() <= retention {
        return Ok(0);
    }
    // Dated names sort oldest first.
    logs.sort();
    let excess = logs.len() - retention;
    for path in &logs[..excess] {
        std::fs::remove_file(path)?;
    }
    Ok(excess)
}

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `level`. With `[log] dir` set, events
/// also go to a daily file there; the returned guard flushes that file and
/// must be held until the process exits.
pub fn init(level: &str, log: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let console = fmt::layer().with_target(false).compact();

    let (file, guard) = match &log.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            prune(dir, log.retention)
                .with_context(|| format!("failed to prune logs in {}", dir.display()))?;
            let appender = file_appender(dir, log.retention)
                .with_context(|| format!("failed to open log file in {}", dir.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;
    Ok(guard)
}
