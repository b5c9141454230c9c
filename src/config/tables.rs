use super::defaults;
use super::models::{AppConfig, LogLevel};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    tracking: TrackingConfig,
    #[serde(default)]
    pagination: PaginationConfig,
    #[serde(default)]
    lookup: LookupConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            idle_threshold_secs: tables.tracking.idle_threshold_secs,
            snap_tolerance: tables.pagination.snap_tolerance,
            end_of_chapter_progress: tables.pagination.end_of_chapter_progress,
            lookup_max_results: tables.lookup.max_results,
            cache_dir: tables.storage.cache_dir,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            tracking: TrackingConfig {
                idle_threshold_secs: config.idle_threshold_secs,
            },
            pagination: PaginationConfig {
                snap_tolerance: config.snap_tolerance,
                end_of_chapter_progress: config.end_of_chapter_progress,
            },
            lookup: LookupConfig {
                max_results: config.lookup_max_results,
            },
            storage: StorageConfig {
                cache_dir: config.cache_dir.clone(),
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct TrackingConfig {
    #[serde(default = "defaults::default_idle_threshold_secs")]
    idle_threshold_secs: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            idle_threshold_secs: defaults::default_idle_threshold_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PaginationConfig {
    #[serde(default = "defaults::default_snap_tolerance")]
    snap_tolerance: f64,
    #[serde(default = "defaults::default_end_of_chapter_progress")]
    end_of_chapter_progress: f64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig {
            snap_tolerance: defaults::default_snap_tolerance(),
            end_of_chapter_progress: defaults::default_end_of_chapter_progress(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LookupConfig {
    #[serde(default = "defaults::default_lookup_max_results")]
    max_results: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        LookupConfig {
            max_results: defaults::default_lookup_max_results(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_cache_dir")]
    cache_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            cache_dir: defaults::default_cache_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
