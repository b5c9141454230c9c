//! Host-side reading session.
//!
//! One `ReaderSession` owns the book index, the volatile reading position and
//! the speed tracker for an open book. It is the single writer of bookmarks:
//! commands from the surface and the UI are applied one at a time, either
//! directly or through [`SharedSession`]. Persistence is fire-and-forget; a
//! failed write is logged and never changes in-memory state.

use crate::book_index::{BookIndex, ChapterRow, ReadingPosition};
use crate::cache::{Bookmark, ProgressStore};
use crate::config::AppConfig;
use crate::surface::{PageDirection, PaginationResult, Rect, SurfaceMessage};
use crate::tracking::{ReadingSessionTracker, SessionStatistics, StatisticsRecord};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use ts_rs::TS;

/// Wall-clock source, injectable for tests.
pub trait Clock: Send {
    /// Time since the Unix epoch.
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupMatch {
    /// The prefix of the query that matched a dictionary term.
    pub matched: String,
    pub term: String,
}

/// Dictionary collaborator. Matches come back best first.
pub trait Lookup: Send {
    /// `sentence` is the text around the selection, for deinflection and
    /// card context.
    fn lookup(&self, text: &str, sentence: &str, max_results: usize) -> Vec<LookupMatch>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSelection {
    pub text: String,
    pub sentence: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionSnapshot {
    pub chapter_index: usize,
    pub fractional_progress: f64,
    pub absolute_character_count: u64,
    pub total_character_count: u64,
    pub book_percent: f64,
    pub tracking: bool,
    pub characters_read: u64,
    pub last_speed: u64,
    pub popup_visible: bool,
    /// Selection box the lookup popup is anchored to, while it is open.
    pub popup_rect: Option<Rect>,
}

#[derive(Debug, Clone)]
pub enum SessionCommand {
    GetSnapshot,
    UpdateProgress { progress: f64 },
    SaveBookmark { progress: f64 },
    SetChapter { chapter_index: usize, progress: f64 },
    NextChapter,
    PreviousChapter,
    JumpToCharacter { count: u64 },
    StartTracking,
    StopTracking,
    Surface(SurfaceMessage),
    ClosePopup,
}

impl SessionCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetSnapshot => "reader_get_snapshot",
            Self::UpdateProgress { .. } => "reader_update_progress",
            Self::SaveBookmark { .. } => "reader_save_bookmark",
            Self::SetChapter { .. } => "reader_set_chapter",
            Self::NextChapter => "reader_next_chapter",
            Self::PreviousChapter => "reader_previous_chapter",
            Self::JumpToCharacter { .. } => "reader_jump_to_character",
            Self::StartTracking => "reader_start_tracking",
            Self::StopTracking => "reader_stop_tracking",
            Self::Surface(_) => "reader_surface_message",
            Self::ClosePopup => "reader_close_popup",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub action: &'static str,
    pub snapshot: SessionSnapshot,
}

pub struct ReaderSession {
    title: String,
    index: BookIndex,
    spine: Vec<String>,
    position: ReadingPosition,
    tracker: ReadingSessionTracker,
    store: Box<dyn ProgressStore>,
    clock: Box<dyn Clock>,
    lookup: Option<Box<dyn Lookup>>,
    lookup_max_results: usize,
    popup_rect: Option<Rect>,
    lookup_results: Vec<LookupMatch>,
    restores_completed: u64,
}

impl ReaderSession {
    /// Open a book and resume from its saved bookmark, if any.
    ///
    /// The bookmark's cached character count is ignored; only its chapter and
    /// fraction are used.
    pub fn open(
        title: &str,
        index: BookIndex,
        spine: Vec<String>,
        store: Box<dyn ProgressStore>,
        clock: Box<dyn Clock>,
        config: &AppConfig,
    ) -> Self {
        let position = store
            .load_bookmark()
            .map(|bookmark| {
                let last_chapter = spine.len().saturating_sub(1);
                ReadingPosition::new(
                    bookmark.chapter_index.min(last_chapter),
                    bookmark.fractional_progress,
                )
            })
            .unwrap_or_default();
        info!(
            title,
            chapter = position.chapter_index,
            progress = position.fractional_progress,
            total = index.total_character_count(),
            "Opened reading session"
        );
        Self {
            title: title.to_string(),
            index,
            spine,
            position,
            tracker: ReadingSessionTracker::new(config.idle_threshold_secs),
            store,
            clock,
            lookup: None,
            lookup_max_results: config.lookup_max_results,
            popup_rect: None,
            lookup_results: Vec::new(),
            restores_completed: 0,
        }
    }

    pub fn with_lookup(mut self, lookup: Box<dyn Lookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn index(&self) -> &BookIndex {
        &self.index
    }

    pub fn spine(&self) -> &[String] {
        &self.spine
    }

    pub fn position(&self) -> ReadingPosition {
        self.position
    }

    pub fn statistics(&self) -> &SessionStatistics {
        self.tracker.statistics()
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_active()
    }

    pub fn lookup_results(&self) -> &[LookupMatch] {
        &self.lookup_results
    }

    pub fn restores_completed(&self) -> u64 {
        self.restores_completed
    }

    /// Absolute offset of the current position, recomputed every call.
    pub fn current_character_count(&self) -> u64 {
        self.index
            .current_character_count(&self.spine, self.position)
    }

    pub fn book_progress(&self) -> f64 {
        self.index.book_progress(self.current_character_count())
    }

    pub fn chapter_rows(&self) -> Vec<ChapterRow> {
        self.index
            .chapter_rows(&self.spine, self.position.chapter_index)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let count = self.current_character_count();
        let stats = self.tracker.statistics();
        SessionSnapshot {
            chapter_index: self.position.chapter_index,
            fractional_progress: self.position.fractional_progress,
            absolute_character_count: count,
            total_character_count: self.index.total_character_count(),
            book_percent: self.index.book_progress(count) * 100.0,
            tracking: self.tracker.is_active(),
            characters_read: stats.characters_read,
            last_speed: stats.last_speed,
            popup_visible: !self.lookup_results.is_empty(),
            popup_rect: self.popup_rect,
        }
    }

    pub fn apply_command(&mut self, command: SessionCommand) -> SessionEvent {
        let action = command.action();
        match command {
            SessionCommand::GetSnapshot => {}
            SessionCommand::UpdateProgress { progress } => self.update_progress(progress),
            SessionCommand::SaveBookmark { progress } => {
                self.save_bookmark(progress);
            }
            SessionCommand::SetChapter {
                chapter_index,
                progress,
            } => self.set_chapter(chapter_index, progress),
            SessionCommand::NextChapter => {
                self.next_chapter();
            }
            SessionCommand::PreviousChapter => {
                self.previous_chapter();
            }
            SessionCommand::JumpToCharacter { count } => {
                self.jump_to_character(count);
            }
            SessionCommand::StartTracking => self.start_tracking(),
            SessionCommand::StopTracking => {
                self.stop_tracking();
            }
            SessionCommand::Surface(message) => self.handle_surface_message(message),
            SessionCommand::ClosePopup => self.close_popup(),
        }
        SessionEvent {
            action,
            snapshot: self.snapshot(),
        }
    }

    /// Track scroll progress in memory without persisting it.
    pub fn update_progress(&mut self, progress: f64) {
        self.position = ReadingPosition::new(self.position.chapter_index, progress);
    }

    /// Persist the current position with `progress` in the current chapter.
    ///
    /// Ticks the tracker first so the statistics and the bookmark timestamp
    /// describe the same instant.
    pub fn save_bookmark(&mut self, progress: f64) -> Bookmark {
        self.update_progress(progress);
        let now = self.clock.now();
        let count = self.current_character_count();
        self.tracker.tick(now, count);

        let bookmark = Bookmark {
            chapter_index: self.position.chapter_index,
            fractional_progress: self.position.fractional_progress,
            absolute_character_count: count,
            last_modified: now.as_millis() as u64,
        };
        if let Err(err) = self.store.save_bookmark(&bookmark) {
            warn!("Failed to save bookmark: {err:#}");
        } else {
            debug!(
                chapter = bookmark.chapter_index,
                progress = bookmark.fractional_progress,
                count,
                "Saved bookmark"
            );
        }
        bookmark
    }

    pub fn set_chapter(&mut self, chapter_index: usize, progress: f64) {
        let chapter_index = chapter_index.min(self.spine.len().saturating_sub(1));
        info!(chapter = chapter_index, progress, "Changed chapter");
        self.position = ReadingPosition::new(chapter_index, progress);
        self.save_bookmark(self.position.fractional_progress);
    }

    /// Open the next chapter at its start. False on the last chapter.
    pub fn next_chapter(&mut self) -> bool {
        let next = self.position.chapter_index + 1;
        if next >= self.spine.len() {
            debug!("Already at the last chapter");
            return false;
        }
        self.set_chapter(next, 0.0);
        true
    }

    /// Open the previous chapter at its end. False on the first chapter.
    pub fn previous_chapter(&mut self) -> bool {
        let Some(previous) = self.position.chapter_index.checked_sub(1) else {
            debug!("Already at the first chapter");
            return false;
        };
        self.set_chapter(previous, 1.0);
        true
    }

    /// Route a pagination result; `Limit` crosses into the adjacent chapter.
    pub fn handle_pagination(&mut self, direction: PageDirection, result: PaginationResult) -> bool {
        match (result, direction) {
            (PaginationResult::Scrolled, _) => false,
            (PaginationResult::Limit, PageDirection::Forward) => self.next_chapter(),
            (PaginationResult::Limit, PageDirection::Backward) => self.previous_chapter(),
        }
    }

    /// Move to a book-wide character offset. Unresolvable offsets leave the
    /// position untouched and return false.
    pub fn jump_to_character(&mut self, count: u64) -> bool {
        let Some(position) = self.index.resolve_character_position(count) else {
            warn!(count, "Cannot resolve character offset");
            return false;
        };
        info!(
            count,
            chapter = position.chapter_index,
            progress = position.fractional_progress,
            "Jumping to character"
        );
        self.set_chapter(position.chapter_index, position.fractional_progress);
        true
    }

    pub fn start_tracking(&mut self) {
        let now = self.clock.now();
        let count = self.current_character_count();
        self.tracker.start_tracking(now, count);
    }

    /// Finish the session and hand its statistics to the store.
    pub fn stop_tracking(&mut self) -> Option<SessionStatistics> {
        let now = self.clock.now();
        let count = self.current_character_count();
        let stats = self.tracker.stop_tracking(now, count)?;
        let record = StatisticsRecord::from_session(&self.title, &stats, now);
        if let Err(err) = self.store.save_statistics(&record) {
            warn!("Failed to save reading statistics: {err:#}");
        }
        Some(stats)
    }

    /// Look up selected text. Returns the matched length of the best result,
    /// in characters, or `None` when nothing matched.
    pub fn handle_text_selected(&mut self, selection: TextSelection) -> Option<usize> {
        let results = self
            .lookup
            .as_ref()
            .map(|lookup| {
                lookup.lookup(&selection.text, &selection.sentence, self.lookup_max_results)
            })
            .unwrap_or_default();
        debug!(
            text = %selection.text,
            results = results.len(),
            "Looked up selection"
        );
        self.popup_rect = Some(selection.rect);
        self.lookup_results = results;
        let matched = self
            .lookup_results
            .first()
            .map(|first| first.matched.chars().count());
        if matched.is_none() {
            self.close_popup();
        }
        matched
    }

    pub fn close_popup(&mut self) {
        self.lookup_results.clear();
        self.popup_rect = None;
    }

    pub fn handle_surface_message(&mut self, message: SurfaceMessage) {
        match message {
            SurfaceMessage::RestoreCompleted => {
                self.restores_completed += 1;
                debug!(total = self.restores_completed, "Surface finished restoring");
            }
            SurfaceMessage::TextSelected {
                text,
                sentence,
                rect,
            } => {
                self.handle_text_selected(TextSelection {
                    text,
                    sentence,
                    rect,
                });
            }
            SurfaceMessage::Paginated { direction, result } => {
                self.handle_pagination(direction, result);
            }
        }
    }
}

/// The session behind a mutex, for hosts that receive input on several
/// threads. Commands are applied one at a time.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<ReaderSession>>,
}

impl SharedSession {
    pub fn new(session: ReaderSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn dispatch(&self, command: SessionCommand) -> SessionEvent {
        let mut session = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        session.apply_command(command)
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut ReaderSession) -> R) -> R {
        let mut session = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }
}
