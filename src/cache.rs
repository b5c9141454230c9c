//! Per-book persistence on disk.
//!
//! Every book gets its own directory under the cache dir, named by a hash of
//! the book path so odd file names can't cause filesystem trouble. It holds:
//! - `book_index.json`: chapter table written by the import step.
//! - `bookmark.toml`: last saved reading position.
//! - `statistics.json`: daily reading statistics.

use crate::book_index::BookIndex;
use crate::tracking::StatisticsRecord;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const BOOK_INDEX_FILE: &str = "book_index.json";
const BOOKMARK_FILE: &str = "bookmark.toml";
const STATISTICS_FILE: &str = "statistics.json";

/// Persisted snapshot of the reading position.
///
/// `absolute_character_count` is derived from the other two fields when the
/// bookmark is written and is never read back as a source of truth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub chapter_index: usize,
    #[serde(alias = "progress")]
    pub fractional_progress: f64,
    #[serde(alias = "characterCount")]
    pub absolute_character_count: u64,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_modified: u64,
}

/// Storage collaborator for bookmarks and statistics.
///
/// Writes are best-effort: callers log failures and move on.
pub trait ProgressStore: Send {
    fn load_book_index(&self) -> Option<BookIndex>;
    fn load_bookmark(&self) -> Option<Bookmark>;
    fn save_bookmark(&self, bookmark: &Bookmark) -> Result<()>;
    fn save_statistics(&self, record: &StatisticsRecord) -> Result<()>;
}

pub fn hash_dir(cache_dir: &Path, book_path: &Path) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(book_path.as_os_str().to_string_lossy().as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    cache_dir.join(hash)
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn for_book(cache_dir: &Path, book_path: &Path) -> Self {
        Self {
            dir: hash_dir(cache_dir, book_path),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Used by the import step; the reader itself only loads the index.
    pub fn save_book_index(&self, index: &BookIndex) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(index).context("Failed to serialize book index")?;
        self.write(BOOK_INDEX_FILE, &contents)
    }

    pub fn load_statistics(&self) -> Vec<StatisticsRecord> {
        let path = self.dir.join(STATISTICS_FILE);
        let Ok(data) = fs::read_to_string(&path) else {
            return Vec::new();
        };
        match serde_json::from_str(&data) {
            Ok(records) => records,
            Err(err) => {
                warn!(path = %path.display(), "Ignoring unreadable statistics: {err}");
                Vec::new()
            }
        }
    }

    fn write(&self, file: &str, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.dir.join(file);
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), "Wrote cache file");
        Ok(())
    }
}

impl ProgressStore for FileStore {
    fn load_book_index(&self) -> Option<BookIndex> {
        let path = self.dir.join(BOOK_INDEX_FILE);
        let data = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&data) {
            Ok(index) => Some(index),
            Err(err) => {
                warn!(path = %path.display(), "Invalid book index: {err}");
                None
            }
        }
    }

    fn load_bookmark(&self) -> Option<Bookmark> {
        let data = fs::read_to_string(self.dir.join(BOOKMARK_FILE)).ok()?;
        toml::from_str(&data).ok()
    }

    fn save_bookmark(&self, bookmark: &Bookmark) -> Result<()> {
        let contents = toml::to_string(bookmark).context("Failed to serialize bookmark")?;
        self.write(BOOKMARK_FILE, &contents)
    }

    fn save_statistics(&self, record: &StatisticsRecord) -> Result<()> {
        let mut records = self.load_statistics();
        match records.iter_mut().find(|existing| existing.same_day(record)) {
            Some(existing) => existing.merge(record),
            None => records.push(record.clone()),
        }
        let contents =
            serde_json::to_string_pretty(&records).context("Failed to serialize statistics")?;
        self.write(STATISTICS_FILE, &contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::SessionStatistics;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn scratch_store(label: &str) -> (FileStore, PathBuf) {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after epoch")
            .as_nanos();
        let cache_dir = std::env::temp_dir().join(format!("reading-progress-{label}-{nonce}"));
        let store = FileStore::for_book(&cache_dir, Path::new("/books/kokoro.epub"));
        (store, cache_dir)
    }

    #[test]
    fn hash_dir_is_stable_per_book() {
        let root = Path::new(".cache");
        let a = hash_dir(root, Path::new("/books/a.epub"));
        assert_eq!(a, hash_dir(root, Path::new("/books/a.epub")));
        assert_ne!(a, hash_dir(root, Path::new("/books/b.epub")));
        assert!(a.starts_with(root));
    }

    #[test]
    fn bookmark_round_trips_through_toml() {
        let (store, cache_dir) = scratch_store("bookmark");
        assert_eq!(store.load_bookmark(), None);

        let bookmark = Bookmark {
            chapter_index: 3,
            fractional_progress: 0.25,
            absolute_character_count: 1_234,
            last_modified: 1_700_000_000_000,
        };
        store.save_bookmark(&bookmark).expect("bookmark saved");
        assert_eq!(store.load_bookmark(), Some(bookmark));

        let _ = fs::remove_dir_all(&cache_dir);
    }

    #[test]
    fn legacy_bookmark_fields_are_accepted() {
        let legacy: Bookmark =
            serde_json::from_str(r#"{"chapterIndex":2,"progress":0.5,"characterCount":99}"#)
                .unwrap();
        assert_eq!(legacy.fractional_progress, 0.5);
        assert_eq!(legacy.absolute_character_count, 99);
        assert_eq!(legacy.last_modified, 0);
    }

    #[test]
    fn book_index_loads_what_import_saved() {
        let (store, cache_dir) = scratch_store("index");
        assert!(store.load_book_index().is_none());
        let index = BookIndex::from_spine([("a.xhtml", 10), ("b.xhtml", 20)]);
        store.save_book_index(&index).expect("index saved");
        assert_eq!(store.load_book_index(), Some(index));
        let _ = fs::remove_dir_all(&cache_dir);
    }

    #[test]
    fn statistics_merge_per_title_and_day() {
        let (store, cache_dir) = scratch_store("stats");
        let stats = SessionStatistics {
            active_duration_seconds: 30.0,
            characters_read: 100,
            last_speed: 12_000,
            max_speed: 12_000,
            min_speed: 12_000,
        };
        let day_one = Duration::from_secs(86_400);
        let day_two = Duration::from_secs(2 * 86_400);
        store
            .save_statistics(&StatisticsRecord::from_session("Kokoro", &stats, day_one))
            .unwrap();
        store
            .save_statistics(&StatisticsRecord::from_session("Kokoro", &stats, day_one))
            .unwrap();
        store
            .save_statistics(&StatisticsRecord::from_session("Kokoro", &stats, day_two))
            .unwrap();

        let records = store.load_statistics();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].characters_read, 200);
        assert_eq!(records[0].reading_time, 60);
        assert_eq!(records[1].characters_read, 100);
        let _ = fs::remove_dir_all(&cache_dir);
    }
}
