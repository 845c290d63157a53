use std::path::PathBuf;

use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    filter::EnvFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
    Layer,
};

// Log targets
pub const STAMP_CONFIG: &str = "stamp_config";
pub const STAMP_EXTRACT: &str = "stamp_extract";
pub const STAMP_MATCH: &str = "stamp_match";
pub const STAMP_DRAW: &str = "stamp_draw";

const LOG_FILE_NAME: &str = "pdf-stamp.log";

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber: a stderr fmt layer filtered by `RUST_LOG`
/// (default `info`), plus a non-blocking file layer when `log_dir` is given.
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for the whole run. Fails when `log_dir` is given but a global subscriber
/// is already installed, since the file layer could not be attached.
pub fn init_logging(log_dir: Option<PathBuf>) -> std::io::Result<Option<WorkerGuard>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(default_filter());

    let Some(log_dir) = log_dir else {
        // A subscriber may already be installed (tests); keep it.
        let _ = tracing_subscriber::registry().with(stderr_layer).try_init();
        return Ok(None);
    };

    std::fs::create_dir_all(&log_dir)?;
    let file_appender = RollingFileAppender::new(Rotation::NEVER, log_dir, LOG_FILE_NAME);
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(non_blocking_appender)
        .with_filter(default_filter());

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::AlreadyExists, e))?;

    Ok(Some(guard))
}
