//! Synthetic collaborators for unit tests.

use crate::cache::{Bookmark, ProgressStore};
use crate::book_index::BookIndex;
use crate::content::{ContentTree, NodeData, NodeId};
use crate::session::{Clock, Lookup, LookupMatch};
use crate::surface::{Axis, Rect, RenderSurface, SurfaceMessage, WritingMode};
use crate::tracking::StatisticsRecord;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Paged layout where every character has the same extent along the page
/// axis and the chapter exactly fills `page_count` pages.
pub struct ColumnSurface {
    pub scroll: (f64, f64),
    /// Report no boxes at all, as for content that hasn't been laid out.
    pub hide_layout: bool,
    mode: WritingMode,
    page_size: f64,
    page_count: usize,
    tree: ContentTree,
    /// Absolute start and extent of each text run along the page axis.
    runs: HashMap<NodeId, (f64, f64)>,
    char_extent: f64,
    anchors: HashMap<NodeId, f64>,
}

impl ColumnSurface {
    /// One `p` per run, laid out back to back.
    pub fn pages(mode: WritingMode, page_size: f64, page_count: usize, runs: &[&str]) -> Self {
        let mut tree = ContentTree::new();
        let total_chars: usize = runs.iter().map(|run| run.chars().count()).sum();
        let extent = page_size * page_count as f64;
        let char_extent = if total_chars == 0 {
            0.0
        } else {
            extent / total_chars as f64
        };

        let mut layout = HashMap::new();
        let mut chars_before = 0usize;
        for run in runs {
            let paragraph = tree.append_element(tree.root(), "p");
            let text = tree.append_text(paragraph, run);
            let len = run.chars().count();
            layout.insert(
                text,
                (chars_before as f64 * char_extent, len as f64 * char_extent),
            );
            chars_before += len;
        }

        Self {
            scroll: (0.0, 0.0),
            hide_layout: false,
            mode,
            page_size,
            page_count,
            tree,
            runs: layout,
            char_extent,
            anchors: HashMap::new(),
        }
    }

    /// Add an empty element with `id` at an absolute page-axis position.
    pub fn set_element_position(&mut self, id: &str, position: f64) {
        let anchor = self.tree.append_element(self.tree.root(), "a");
        self.tree.set_attr(anchor, "id", id);
        self.anchors.insert(anchor, position);
    }

    /// Like [`Self::set_element_position`], addressed by `name`.
    pub fn set_named_anchor(&mut self, name: &str, position: f64) {
        let anchor = self.tree.append_element(self.tree.root(), "a");
        self.tree.set_attr(anchor, "name", name);
        self.anchors.insert(anchor, position);
    }

    fn axis(&self) -> Axis {
        Axis::for_mode(self.mode)
    }

    fn rect_at(&self, absolute: f64, extent: f64) -> Rect {
        match self.axis() {
            Axis::Horizontal => Rect {
                left: absolute - self.scroll.0,
                top: 0.0,
                width: extent,
                height: self.page_size,
            },
            Axis::Vertical => Rect {
                left: 0.0,
                top: absolute - self.scroll.1,
                width: self.page_size,
                height: extent,
            },
        }
    }

    fn first_text_descendant(&self, element: NodeId) -> Option<NodeId> {
        let node = self.tree.node(element)?;
        node.children.iter().find_map(|&child| {
            match self.tree.node(child).map(|node| &node.data) {
                Some(NodeData::Text(_)) => Some(child),
                Some(NodeData::Element { .. }) => self.first_text_descendant(child),
                None => None,
            }
        })
    }
}

impl RenderSurface for ColumnSurface {
    fn content(&self) -> &ContentTree {
        &self.tree
    }

    fn writing_mode(&self) -> WritingMode {
        self.mode
    }

    fn viewport_size(&self) -> (f64, f64) {
        (self.page_size, self.page_size)
    }

    fn content_size(&self) -> (f64, f64) {
        let extent = self.page_size * self.page_count as f64;
        match self.axis() {
            Axis::Horizontal => (extent, self.page_size),
            Axis::Vertical => (self.page_size, extent),
        }
    }

    fn scroll_position(&self) -> (f64, f64) {
        self.scroll
    }

    fn scroll_to(&mut self, x: f64, y: f64) {
        self.scroll = (x, y);
    }

    fn run_rect(&self, run: NodeId) -> Option<Rect> {
        if self.hide_layout {
            return None;
        }
        let &(start, extent) = self.runs.get(&run)?;
        Some(self.rect_at(start, extent))
    }

    fn first_char_rect(&self, run: NodeId) -> Option<Rect> {
        if self.hide_layout {
            return None;
        }
        let &(start, _) = self.runs.get(&run)?;
        Some(self.rect_at(start, self.char_extent))
    }

    fn element_rect(&self, element: NodeId) -> Option<Rect> {
        if self.hide_layout {
            return None;
        }
        if let Some(&position) = self.anchors.get(&element) {
            return Some(self.rect_at(position, 0.0));
        }
        self.run_rect(self.first_text_descendant(element)?)
    }
}

pub fn completions(outbox: &[SurfaceMessage]) -> usize {
    outbox
        .iter()
        .filter(|message| matches!(message, SurfaceMessage::RestoreCompleted))
        .count()
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn at(now: Duration) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    index: Option<BookIndex>,
    bookmarks: Vec<Bookmark>,
    statistics: Vec<StatisticsRecord>,
    fail_writes: bool,
}

/// In-memory store. Clones share state so tests can inspect what a session
/// wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn put_bookmark(&self, bookmark: Bookmark) {
        self.state.lock().unwrap().bookmarks.push(bookmark);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    pub fn bookmarks(&self) -> Vec<Bookmark> {
        self.state.lock().unwrap().bookmarks.clone()
    }

    pub fn statistics(&self) -> Vec<StatisticsRecord> {
        self.state.lock().unwrap().statistics.clone()
    }
}

impl ProgressStore for MemoryStore {
    fn load_book_index(&self) -> Option<BookIndex> {
        self.state.lock().unwrap().index.clone()
    }

    fn load_bookmark(&self) -> Option<Bookmark> {
        self.state.lock().unwrap().bookmarks.last().copied()
    }

    fn save_bookmark(&self, bookmark: &Bookmark) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(anyhow!("disk full"));
        }
        state.bookmarks.push(*bookmark);
        Ok(())
    }

    fn save_statistics(&self, record: &StatisticsRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(anyhow!("disk full"));
        }
        match state
            .statistics
            .iter_mut()
            .find(|existing| existing.same_day(record))
        {
            Some(existing) => existing.merge(record),
            None => state.statistics.push(record.clone()),
        }
        Ok(())
    }
}

/// Dictionary of `(term, matched prefix)` pairs. A pair matches when the
/// query starts with its prefix. Sentences passed in are recorded.
pub struct FixedLookup {
    entries: Vec<(String, String)>,
    sentences: Arc<Mutex<Vec<String>>>,
}

impl FixedLookup {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(term, matched)| (term.to_string(), matched.to_string()))
                .collect(),
            sentences: Arc::default(),
        }
    }

    pub fn sentences(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.sentences)
    }
}

impl Lookup for FixedLookup {
    fn lookup(&self, text: &str, sentence: &str, max_results: usize) -> Vec<LookupMatch> {
        self.sentences.lock().unwrap().push(sentence.to_string());
        self.entries
            .iter()
            .filter(|(_, matched)| text.starts_with(matched.as_str()))
            .take(max_results)
            .map(|(term, matched)| LookupMatch {
                matched: matched.clone(),
                term: term.clone(),
            })
            .collect()
    }
}
