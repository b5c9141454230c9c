use super::models::AppConfig;
use super::tables::ConfigTables;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            AppConfig::default()
        }
    }
}

/// Parse the tabled TOML form into a sanitized config.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let tables: ConfigTables = toml::from_str(contents).context("Failed to parse config TOML")?;
    Ok(sanitize(AppConfig::from(tables)))
}

pub fn serialize_config(config: &AppConfig) -> Result<String> {
    toml::to_string(&ConfigTables::from(config)).context("Failed to serialize config")
}

fn sanitize(mut config: AppConfig) -> AppConfig {
    let defaults = AppConfig::default();
    if !config.idle_threshold_secs.is_finite() || config.idle_threshold_secs <= 0.0 {
        warn!(
            value = config.idle_threshold_secs,
            "Idle threshold must be positive; using default"
        );
        config.idle_threshold_secs = defaults.idle_threshold_secs;
    }
    if !config.snap_tolerance.is_finite() || config.snap_tolerance < 0.0 {
        config.snap_tolerance = defaults.snap_tolerance;
    }
    if !(config.end_of_chapter_progress > 0.0 && config.end_of_chapter_progress <= 1.0) {
        config.end_of_chapter_progress = defaults.end_of_chapter_progress;
    }
    config.lookup_max_results = config.lookup_max_results.max(1);
    config
}
