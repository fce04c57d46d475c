//! Logging Infrastructure
//!
//! Structured logging via `tracing-subscriber`. `RUST_LOG` wins over the
//! configured level; `LOG_DIR` adds a daily rolling file.

use std::path::Path;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "seckill-server";

/// Initialize the global subscriber
///
/// Calling it again (e.g. from several tests) is a no-op.
pub fn init_logger(log_level: &str, json: bool, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    // 目录不存在时退回 stdout
    let file_appender = log_dir
        .map(Path::new)
        .filter(|dir| dir.is_dir())
        .map(|dir| tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX));

    let result = match (json, file_appender) {
        (true, Some(file)) => builder.json().with_writer(file).try_init(),
        (true, None) => builder.json().try_init(),
        (false, Some(file)) => builder.with_writer(file).try_init(),
        (false, None) => builder.try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Logger already initialized");
    }
}
