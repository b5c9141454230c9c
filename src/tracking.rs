//! Reading-speed tracking.
//!
//! While active, every tick folds the time since the previous tick and the
//! forward character delta into the session totals. Long gaps are treated as
//! the reader having walked away and are dropped entirely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Gaps longer than this between ticks don't count as reading time.
pub const DEFAULT_IDLE_THRESHOLD_SECS: f64 = 120.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatistics {
    pub active_duration_seconds: f64,
    /// Only forward movement accumulates; going back never lowers it.
    pub characters_read: u64,
    /// Characters per hour over the whole session so far.
    pub last_speed: u64,
    pub max_speed: u64,
    pub min_speed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TrackerState {
    Idle,
    Active { last_timestamp: Duration, last_count: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    NotTracking,
    /// The clock didn't move forward.
    ClockSkew,
    IdleGapDiscarded { gap_secs: f64 },
    Accumulated { delta_secs: f64, characters: u64 },
}

#[derive(Debug, Clone)]
pub struct ReadingSessionTracker {
    idle_threshold_secs: f64,
    state: TrackerState,
    stats: SessionStatistics,
    min_speed_set: bool,
}

impl Default for ReadingSessionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_THRESHOLD_SECS)
    }
}

impl ReadingSessionTracker {
    pub fn new(idle_threshold_secs: f64) -> Self {
        let idle_threshold_secs = if idle_threshold_secs.is_finite() && idle_threshold_secs > 0.0
        {
            idle_threshold_secs
        } else {
            DEFAULT_IDLE_THRESHOLD_SECS
        };
        Self {
            idle_threshold_secs,
            state: TrackerState::Idle,
            stats: SessionStatistics::default(),
            min_speed_set: false,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, TrackerState::Active { .. })
    }

    pub fn idle_threshold_secs(&self) -> f64 {
        self.idle_threshold_secs
    }

    pub fn statistics(&self) -> &SessionStatistics {
        &self.stats
    }

    /// Begin a fresh session. Returns false if one is already running.
    pub fn start_tracking(&mut self, now: Duration, current_count: u64) -> bool {
        if self.is_active() {
            debug!("Tracking already active");
            return false;
        }
        self.stats = SessionStatistics::default();
        self.min_speed_set = false;
        self.state = TrackerState::Active {
            last_timestamp: now,
            last_count: current_count,
        };
        info!(count = current_count, "Started reading session");
        true
    }

    pub fn tick(&mut self, now: Duration, current_count: u64) -> TickOutcome {
        let TrackerState::Active {
            last_timestamp,
            last_count,
        } = self.state
        else {
            return TickOutcome::NotTracking;
        };

        let delta_secs = now.as_secs_f64() - last_timestamp.as_secs_f64();
        if delta_secs <= 0.0 {
            return TickOutcome::ClockSkew;
        }

        self.state = TrackerState::Active {
            last_timestamp: now,
            last_count: current_count,
        };

        if delta_secs > self.idle_threshold_secs {
            debug!(gap_secs = delta_secs, "Discarded idle gap");
            return TickOutcome::IdleGapDiscarded {
                gap_secs: delta_secs,
            };
        }

        let characters = current_count.saturating_sub(last_count);
        let stats = &mut self.stats;
        stats.active_duration_seconds += delta_secs;
        stats.characters_read = stats.characters_read.saturating_add(characters);
        let speed = (stats.characters_read as f64 / stats.active_duration_seconds * 3600.0) as u64;
        stats.last_speed = speed;
        stats.max_speed = stats.max_speed.max(speed);
        stats.min_speed = if self.min_speed_set {
            stats.min_speed.min(speed)
        } else {
            speed
        };
        self.min_speed_set = true;

        debug!(
            delta_secs,
            characters,
            total = stats.characters_read,
            speed,
            "Reading session tick"
        );
        TickOutcome::Accumulated {
            delta_secs,
            characters,
        }
    }

    /// Final tick, then back to idle. Returns the finished statistics.
    pub fn stop_tracking(&mut self, now: Duration, current_count: u64) -> Option<SessionStatistics> {
        if !self.is_active() {
            return None;
        }
        self.tick(now, current_count);
        self.state = TrackerState::Idle;
        info!(
            seconds = self.stats.active_duration_seconds,
            characters = self.stats.characters_read,
            speed = self.stats.last_speed,
            "Stopped reading session"
        );
        Some(self.stats)
    }
}

/// Per-day statistics entry in the ttu reader format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsRecord {
    pub title: String,
    /// UTC day, `YYYY-MM-DD`.
    pub date_key: String,
    pub characters_read: u64,
    /// Whole seconds.
    pub reading_time: u64,
    pub min_reading_speed: u64,
    pub alt_min_reading_speed: u64,
    pub last_reading_speed: u64,
    pub max_reading_speed: u64,
    /// Milliseconds since the Unix epoch.
    pub last_statistic_modified: u64,
}

impl StatisticsRecord {
    pub fn from_session(title: &str, stats: &SessionStatistics, now: Duration) -> Self {
        Self {
            title: title.to_string(),
            date_key: date_key(now),
            characters_read: stats.characters_read,
            reading_time: stats.active_duration_seconds.max(0.0).round() as u64,
            min_reading_speed: stats.min_speed,
            alt_min_reading_speed: stats.min_speed,
            last_reading_speed: stats.last_speed,
            max_reading_speed: stats.max_speed,
            last_statistic_modified: now.as_millis() as u64,
        }
    }

    pub fn same_day(&self, other: &Self) -> bool {
        self.title == other.title && self.date_key == other.date_key
    }

    /// Fold a later session of the same day into this record.
    pub fn merge(&mut self, later: &Self) {
        self.characters_read = self.characters_read.saturating_add(later.characters_read);
        self.reading_time = self.reading_time.saturating_add(later.reading_time);
        self.min_reading_speed = min_nonzero(self.min_reading_speed, later.min_reading_speed);
        self.alt_min_reading_speed =
            min_nonzero(self.alt_min_reading_speed, later.alt_min_reading_speed);
        self.max_reading_speed = self.max_reading_speed.max(later.max_reading_speed);
        self.last_reading_speed = later.last_reading_speed;
        self.last_statistic_modified = self
            .last_statistic_modified
            .max(later.last_statistic_modified);
    }
}

fn min_nonzero(a: u64, b: u64) -> u64 {
    match (a, b) {
        (0, b) => b,
        (a, 0) => a,
        (a, b) => a.min(b),
    }
}

/// `YYYY-MM-DD` for a time since the Unix epoch, in UTC.
pub fn date_key(since_epoch: Duration) -> String {
    let timestamp = i64::try_from(since_epoch.as_secs())
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_default();
    timestamp.format("%Y-%m-%d").to_string()
}
