//! Tracing subscriber whose filter follows the configured log level.
//!
//! Logging starts from `RUST_LOG` (or `info`) so config loading itself is
//! visible, then switches to `[logging] log_level` once the file is read.

use super::models::LogLevel;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

pub type LogReloadHandle = reload::Handle<EnvFilter, Registry>;

const STARTUP_LEVEL: LogLevel = LogLevel::Info;

/// Install the global subscriber, writing to stderr.
pub fn init_tracing() -> LogReloadHandle {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for(STARTUP_LEVEL));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stderr)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

/// Replace the active filter with `level`.
pub fn apply_log_level(handle: &LogReloadHandle, level: LogLevel) {
    if let Err(err) = handle.modify(|filter| *filter = filter_for(level)) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}

fn filter_for(level: LogLevel) -> EnvFilter {
    EnvFilter::builder()
        .parse(level.as_filter_str())
        .unwrap_or_else(|_| EnvFilter::new(STARTUP_LEVEL.as_filter_str()))
}
