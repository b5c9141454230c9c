use serde::Deserialize;

/// Flattened app configuration. On disk it is grouped into tables, see
/// `tables.rs`.
#[derive(Debug, Clone, Deserialize, serde::Serialize, PartialEq)]
pub struct AppConfig {
    /// Gap between ticks, in seconds, treated as not reading.
    #[serde(default = "crate::config::defaults::default_idle_threshold_secs")]
    pub idle_threshold_secs: f64,
    /// Slack for page alignment, in surface units.
    #[serde(default = "crate::config::defaults::default_snap_tolerance")]
    pub snap_tolerance: f64,
    /// Restoring at or beyond this fraction opens the last page.
    #[serde(default = "crate::config::defaults::default_end_of_chapter_progress")]
    pub end_of_chapter_progress: f64,
    #[serde(default = "crate::config::defaults::default_lookup_max_results")]
    pub lookup_max_results: usize,
    #[serde(default = "crate::config::defaults::default_cache_dir")]
    pub cache_dir: String,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            idle_threshold_secs: crate::config::defaults::default_idle_threshold_secs(),
            snap_tolerance: crate::config::defaults::default_snap_tolerance(),
            end_of_chapter_progress: crate::config::defaults::default_end_of_chapter_progress(),
            lookup_max_results: crate::config::defaults::default_lookup_max_results(),
            cache_dir: crate::config::defaults::default_cache_dir(),
            log_level: crate::config::defaults::default_log_level(),
        }
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
