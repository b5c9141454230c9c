//! Configuration loading for the progress tracker.
//!
//! All user-tunable settings are centralized here and loaded from
//! `conf/config.toml` if present. Any missing or invalid entries fall back to
//! sensible defaults so reading can always resume.

mod defaults;
mod io;
mod logging;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use logging::{LogReloadHandle, apply_log_level, init_tracing};
pub use models::{AppConfig, LogLevel};
