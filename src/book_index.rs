//! Book-wide character offsets.
//!
//! The import step measures every chapter in book characters and records where
//! each one starts. With that table an absolute offset maps to a chapter and a
//! fraction of it, and back, without touching the rendering surface.
//!
//! Chapters are keyed by content path. Manifest paths stay stable across
//! re-renders; spine order is derived separately.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterEntry {
    #[serde(default)]
    pub spine_index: Option<usize>,
    #[serde(alias = "currentTotal")]
    pub start_offset: u64,
    #[serde(alias = "chapterCount")]
    pub length: u64,
}

impl ChapterEntry {
    pub fn end_offset(&self) -> u64 {
        self.start_offset.saturating_add(self.length)
    }

    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.start_offset && offset < self.end_offset()
    }
}

/// Where the reader is inside the book, in chapter terms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReadingPosition {
    pub chapter_index: usize,
    pub fractional_progress: f64,
}

impl ReadingPosition {
    /// Progress is clamped into `[0, 1]`; NaN becomes 0.
    pub fn new(chapter_index: usize, fractional_progress: f64) -> Self {
        Self {
            chapter_index,
            fractional_progress: clamp_fraction(fractional_progress),
        }
    }
}

/// A chapter-list entry for navigation UIs.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterRow {
    pub chapter_index: usize,
    pub content_path: String,
    pub start_percent: f64,
    pub length: u64,
    pub is_current: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BookIndex {
    #[serde(alias = "characterCount")]
    total_character_count: u64,
    #[serde(alias = "chapterInfo", default)]
    chapters: BTreeMap<String, ChapterEntry>,
}

impl BookIndex {
    /// Builds an index whose total is the sum of the chapter lengths.
    pub fn new(chapters: BTreeMap<String, ChapterEntry>) -> Self {
        let total_character_count = chapters
            .values()
            .fold(0u64, |total, entry| total.saturating_add(entry.length));
        Self {
            total_character_count,
            chapters,
        }
    }

    /// Lays out chapters back to back in the given spine order.
    pub fn from_spine<'a>(chapters: impl IntoIterator<Item = (&'a str, u64)>) -> Self {
        let mut offset = 0u64;
        let mut map = BTreeMap::new();
        for (spine_index, (path, length)) in chapters.into_iter().enumerate() {
            map.insert(
                path.to_string(),
                ChapterEntry {
                    spine_index: Some(spine_index),
                    start_offset: offset,
                    length,
                },
            );
            offset = offset.saturating_add(length);
        }
        Self::new(map)
    }

    pub fn total_character_count(&self) -> u64 {
        self.total_character_count
    }

    pub fn chapter(&self, content_path: &str) -> Option<&ChapterEntry> {
        self.chapters.get(content_path)
    }

    pub fn chapters(&self) -> impl Iterator<Item = (&str, &ChapterEntry)> {
        self.chapters
            .iter()
            .map(|(path, entry)| (path.as_str(), entry))
    }

    /// Content paths by spine index. Gaps in the spine are empty strings,
    /// which resolve to no chapter. Entries whose spine index can't belong to
    /// this table are left out.
    pub fn spine_paths(&self) -> Vec<String> {
        let mut spine = vec![String::new(); self.chapters.len()];
        let mut len = 0;
        for (path, entry) in &self.chapters {
            let Some(idx) = entry.spine_index else {
                continue;
            };
            match spine.get_mut(idx) {
                Some(slot) => {
                    *slot = path.clone();
                    len = len.max(idx + 1);
                }
                None => warn!(path = %path, spine_index = idx, "Ignoring out-of-range spine index"),
            }
        }
        spine.truncate(len);
        spine
    }

    fn spine_index(&self, entry: &ChapterEntry) -> Option<usize> {
        entry.spine_index.filter(|&idx| idx < self.chapters.len())
    }

    /// Map an absolute offset to a chapter and the fraction read of it.
    ///
    /// The offset is clamped into the book first. `None` means the position
    /// can't be resolved (empty book, gap in the table); it is not the end of
    /// the book.
    pub fn resolve_character_position(&self, absolute_count: u64) -> Option<ReadingPosition> {
        if self.total_character_count == 0 {
            return None;
        }
        let clamped = absolute_count.min(self.total_character_count - 1);
        let resolved = self.chapters.values().find_map(|entry| {
            let spine_index = self.spine_index(entry)?;
            if entry.length == 0 || !entry.contains(clamped) {
                return None;
            }
            let progress = (clamped - entry.start_offset) as f64 / entry.length as f64;
            Some(ReadingPosition::new(spine_index, progress))
        });
        if resolved.is_none() {
            debug!(absolute_count, clamped, "No chapter covers character offset");
        }
        resolved
    }

    /// Absolute offset of a position; 0 when its chapter isn't in the table.
    pub fn current_character_count(&self, spine: &[String], position: ReadingPosition) -> u64 {
        let Some(entry) = spine
            .get(position.chapter_index)
            .and_then(|path| self.chapters.get(path))
        else {
            return 0;
        };
        let progress = clamp_fraction(position.fractional_progress);
        let within = (entry.length as f64 * progress).floor() as u64;
        entry.start_offset.saturating_add(within.min(entry.length))
    }

    /// Fraction of the whole book at `absolute_count`.
    pub fn book_progress(&self, absolute_count: u64) -> f64 {
        if self.total_character_count == 0 {
            return 0.0;
        }
        (absolute_count as f64 / self.total_character_count as f64).clamp(0.0, 1.0)
    }

    pub fn chapter_rows(&self, spine: &[String], current_index: usize) -> Vec<ChapterRow> {
        spine
            .iter()
            .enumerate()
            .filter_map(|(chapter_index, path)| {
                let entry = self.chapters.get(path)?;
                Some(ChapterRow {
                    chapter_index,
                    content_path: path.clone(),
                    start_percent: self.book_progress(entry.start_offset) * 100.0,
                    length: entry.length,
                    is_current: chapter_index == current_index,
                })
            })
            .collect()
    }
}

fn clamp_fraction(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
