pub(crate) fn default_idle_threshold_secs() -> f64 {
    crate::tracking::DEFAULT_IDLE_THRESHOLD_SECS
}

pub(crate) fn default_snap_tolerance() -> f64 {
    crate::pagination::DEFAULT_SNAP_TOLERANCE
}

pub(crate) fn default_end_of_chapter_progress() -> f64 {
    crate::locator::DEFAULT_END_OF_CHAPTER_PROGRESS
}

pub(crate) fn default_lookup_max_results() -> usize {
    16
}

pub(crate) fn default_cache_dir() -> String {
    ".cache".to_string()
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}
