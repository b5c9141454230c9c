//! Conversion between in-chapter fractional progress and scroll offsets.
//!
//! Progress is measured in book characters, not pixels: a run counts as read
//! once its leading edge has scrolled past the viewport origin. Restoring a
//! fraction walks the runs to the one holding the target character and lands
//! on the page that contains it.
//!
//! Every restore and fragment jump posts exactly one
//! [`SurfaceMessage::RestoreCompleted`], on every path.

use crate::char_count::CharacterCounter;
use crate::config::AppConfig;
use crate::content::TextWalker;
use crate::pagination::{PaginationEngine, ScrollContext};
use crate::surface::{RenderSurface, SurfaceMessage};
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use tracing::{debug, info, warn};

/// Progress at or beyond this restores to the last page of the chapter.
pub const DEFAULT_END_OF_CHAPTER_PROGRESS: f64 = 0.99;

/// Offset to write once more after the next paint, when layout has settled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeferredCorrection {
    pub offset: f64,
    /// Post the completion signal when the correction is applied.
    pub completes_restore: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressLocator {
    counter: CharacterCounter,
    pagination: PaginationEngine,
    end_of_chapter_progress: f64,
    pending: Option<DeferredCorrection>,
}

impl Default for ProgressLocator {
    fn default() -> Self {
        Self::new(CharacterCounter::default(), PaginationEngine::default())
    }
}

impl ProgressLocator {
    pub fn new(counter: CharacterCounter, pagination: PaginationEngine) -> Self {
        Self {
            counter,
            pagination,
            end_of_chapter_progress: DEFAULT_END_OF_CHAPTER_PROGRESS,
            pending: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            CharacterCounter::default(),
            PaginationEngine::new(config.snap_tolerance),
        )
        .with_end_of_chapter_progress(config.end_of_chapter_progress)
    }

    pub fn with_end_of_chapter_progress(mut self, threshold: f64) -> Self {
        if threshold.is_finite() && threshold > 0.0 {
            self.end_of_chapter_progress = threshold.min(1.0);
        }
        self
    }

    pub fn counter(&self) -> &CharacterCounter {
        &self.counter
    }

    pub fn pagination(&self) -> &PaginationEngine {
        &self.pagination
    }

    pub fn pagination_mut(&mut self) -> &mut PaginationEngine {
        &mut self.pagination
    }

    pub fn pending_correction(&self) -> Option<DeferredCorrection> {
        self.pending
    }

    /// A new document replaced the old one: drop its snap handler and settle
    /// any correction still owed to it.
    pub fn document_loaded(&mut self, outbox: &mut Vec<SurfaceMessage>) {
        self.pagination.reset_for_document();
        self.supersede_pending(outbox);
    }

    /// Fraction of the chapter's book characters already scrolled past.
    pub fn calculate_progress<S: RenderSurface + ?Sized>(&self, surface: &S) -> f64 {
        let context = self.pagination.scroll_context(surface);
        let tree = surface.content();
        let mut total_chars = 0usize;
        let mut explored_chars = 0usize;

        for run in TextWalker::new(tree, tree.root()) {
            let run_len = self.counter.count_run(tree, run);
            total_chars += run_len;
            if run_len == 0 {
                continue;
            }
            let passed = surface
                .run_rect(run)
                .is_some_and(|rect| rect.leading(context.axis) < 0.0);
            if passed {
                explored_chars += run_len;
            }
        }

        if total_chars == 0 {
            return 0.0;
        }
        explored_chars as f64 / total_chars as f64
    }

    /// Scroll to the page holding `progress` of the chapter's characters.
    pub fn restore_progress<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        progress: f64,
        outbox: &mut Vec<SurfaceMessage>,
    ) {
        self.supersede_pending(outbox);
        let context = self.pagination.scroll_context(surface);

        if context.page_size <= 0.0 {
            debug!("Restore skipped: surface has no page extent");
            self.finish_without_target(outbox);
            return;
        }

        if progress.is_nan() || progress <= 0.0 {
            self.pagination.set_scroll_offset(surface, &context, 0.0);
            self.pagination.register_snap_scroll(0.0);
            outbox.push(SurfaceMessage::RestoreCompleted);
            return;
        }

        if progress >= self.end_of_chapter_progress {
            let last_page = context.last_page_offset();
            let applied = self.pagination.set_scroll_offset(surface, &context, last_page);
            self.pagination.register_snap_scroll(applied);
            info!(progress, offset = applied, "Restored to last page");
            outbox.push(SurfaceMessage::RestoreCompleted);
            return;
        }

        match self.target_offset(surface, &context, progress) {
            Some(target) => {
                let applied = self.pagination.set_scroll_offset(surface, &context, target);
                self.pending = Some(DeferredCorrection {
                    offset: applied,
                    completes_restore: false,
                });
                info!(progress, offset = applied, "Restored reading progress");
            }
            None => {
                debug!(progress, "Restore found no target run");
                self.pagination.register_snap_scroll(0.0);
            }
        }
        outbox.push(SurfaceMessage::RestoreCompleted);
    }

    /// Scroll to the page holding a named anchor. Returns whether it exists.
    pub fn jump_to_fragment<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        fragment: &str,
        outbox: &mut Vec<SurfaceMessage>,
    ) -> bool {
        self.supersede_pending(outbox);
        let context = self.pagination.scroll_context(surface);
        if context.page_size <= 0.0 {
            self.finish_without_target(outbox);
            return false;
        }

        let raw = fragment.trim();
        let raw = raw.strip_prefix('#').unwrap_or(raw);
        if raw.is_empty() {
            self.finish_without_target(outbox);
            return false;
        }
        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .unwrap_or(Cow::Borrowed(raw));

        let tree = surface.content();
        let Some(target) = tree
            .find_by_id(&decoded)
            .or_else(|| tree.find_by_name(&decoded))
        else {
            warn!(fragment = %decoded, "Fragment not found in chapter");
            self.finish_without_target(outbox);
            return false;
        };

        let Some(rect) = surface.element_rect(target) else {
            debug!(fragment = %decoded, "Fragment has no layout box");
            self.finish_without_target(outbox);
            return true;
        };

        let anchor = rect.leading(context.axis) + self.pagination.current_offset(surface, &context);
        let target = context.align_to_page(anchor);
        let applied = self.pagination.set_scroll_offset(surface, &context, target);
        self.pending = Some(DeferredCorrection {
            offset: applied,
            completes_restore: true,
        });
        info!(fragment = %decoded, offset = applied, "Jumped to fragment");
        true
    }

    /// Next paint happened: apply the one pending correction, if any.
    pub fn after_paint<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        outbox: &mut Vec<SurfaceMessage>,
    ) -> bool {
        let Some(correction) = self.pending.take() else {
            return false;
        };
        let context = self.pagination.scroll_context(surface);
        let applied = self
            .pagination
            .set_scroll_offset(surface, &context, correction.offset);
        self.pagination.register_snap_scroll(applied);
        debug!(offset = applied, "Applied post-paint scroll correction");
        if correction.completes_restore {
            outbox.push(SurfaceMessage::RestoreCompleted);
        }
        true
    }

    fn target_offset<S: RenderSurface + ?Sized>(
        &self,
        surface: &S,
        context: &ScrollContext,
        progress: f64,
    ) -> Option<f64> {
        let tree = surface.content();
        let mut walker = TextWalker::new(tree, tree.root());
        let total_chars: usize = walker
            .by_ref()
            .map(|run| self.counter.count_run(tree, run))
            .sum();
        if total_chars == 0 {
            return None;
        }

        let target_count = (total_chars as f64 * progress).ceil() as usize;
        let mut running = 0usize;
        walker.reset();
        let target_run = walker.find(|run| {
            running += self.counter.count_run(tree, *run);
            running > target_count
        })?;

        let rect = surface
            .first_char_rect(target_run)
            .or_else(|| surface.run_rect(target_run))?;
        let anchor = rect.leading(context.axis) + self.pagination.current_offset(surface, context);
        Some(context.align_to_page(anchor))
    }

    /// Drop a correction owed to an earlier request, settling its completion.
    fn supersede_pending(&mut self, outbox: &mut Vec<SurfaceMessage>) {
        if let Some(superseded) = self.pending.take() {
            debug!(offset = superseded.offset, "Dropped superseded scroll correction");
            if superseded.completes_restore {
                outbox.push(SurfaceMessage::RestoreCompleted);
            }
        }
    }

    fn finish_without_target(&mut self, outbox: &mut Vec<SurfaceMessage>) {
        self.pagination.register_snap_scroll(0.0);
        outbox.push(SurfaceMessage::RestoreCompleted);
    }
}
