//! Page-aligned scroll geometry.
//!
//! Content is consumed one full viewport at a time: a valid resting offset is
//! always a whole multiple of the viewport extent along the page axis. All
//! geometry is re-read from the surface on every call. The only state kept
//! between calls is the [`SnapGuard`], which belongs to one document load.

use crate::surface::{Axis, PageDirection, PaginationResult, RenderSurface};
use tracing::{debug, trace};

/// Default slack, in surface units, for rounding in layout values.
pub const DEFAULT_SNAP_TOLERANCE: f64 = 1.0;

/// Geometry snapshot along the page axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollContext {
    pub axis: Axis,
    pub page_size: f64,
    pub max_scroll: f64,
}

impl ScrollContext {
    pub fn vertical(&self) -> bool {
        self.axis == Axis::Vertical
    }

    /// Offset of the last page that starts on a page boundary.
    pub fn last_page_offset(&self) -> f64 {
        if self.page_size <= 0.0 {
            return 0.0;
        }
        ((self.max_scroll / self.page_size).floor() * self.page_size).max(0.0)
    }

    /// Round `anchor` down to the start of its page.
    ///
    /// The result never exceeds [`last_page_offset`](Self::last_page_offset),
    /// so aligning an aligned value returns it unchanged.
    pub fn align_to_page(&self, anchor: f64) -> f64 {
        if self.page_size <= 0.0 || !anchor.is_finite() {
            return 0.0;
        }
        let page_index = (anchor.max(0.0) / self.page_size).floor();
        (page_index * self.page_size).clamp(0.0, self.last_page_offset())
    }
}

/// Scroll-snap state for one loaded document.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SnapGuard {
    armed: bool,
    last_page_offset: f64,
}

impl SnapGuard {
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn baseline(&self) -> Option<f64> {
        self.armed.then_some(self.last_page_offset)
    }
}

/// What the snap handler did with a raw scroll event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnapOutcome {
    /// No handler installed for this document yet.
    Inactive,
    /// Offset sits on a page boundary and became the new baseline.
    Adopted(f64),
    /// Offset drifted off a boundary; the surface was put back here.
    Reverted(f64),
}

#[derive(Debug, Clone)]
pub struct PaginationEngine {
    snap: SnapGuard,
    tolerance: f64,
}

impl Default for PaginationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SNAP_TOLERANCE)
    }
}

impl PaginationEngine {
    pub fn new(tolerance: f64) -> Self {
        let tolerance = if tolerance.is_finite() {
            tolerance.max(0.0)
        } else {
            DEFAULT_SNAP_TOLERANCE
        };
        Self {
            snap: SnapGuard::default(),
            tolerance,
        }
    }

    /// Forget the snap handler; call once per newly loaded document.
    pub fn reset_for_document(&mut self) {
        self.snap = SnapGuard::default();
    }

    pub fn snap_guard(&self) -> SnapGuard {
        self.snap
    }

    pub fn is_vertical<S: RenderSurface + ?Sized>(&self, surface: &S) -> bool {
        Axis::for_mode(surface.writing_mode()) == Axis::Vertical
    }

    pub fn scroll_context<S: RenderSurface + ?Sized>(&self, surface: &S) -> ScrollContext {
        let axis = Axis::for_mode(surface.writing_mode());
        let page_size = sanitize(axis.pick(surface.viewport_size()));
        let content_extent = sanitize(axis.pick(surface.content_size()));
        ScrollContext {
            axis,
            page_size,
            max_scroll: (content_extent - page_size).max(0.0),
        }
    }

    pub fn current_offset<S: RenderSurface + ?Sized>(
        &self,
        surface: &S,
        context: &ScrollContext,
    ) -> f64 {
        sanitize(context.axis.pick(surface.scroll_position()))
    }

    /// Clamp `desired` into `[0, max_scroll]` and apply it along the page
    /// axis. Returns the offset actually applied.
    pub fn set_scroll_offset<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        context: &ScrollContext,
        desired: f64,
    ) -> f64 {
        let desired = if desired.is_finite() { desired } else { 0.0 };
        let clamped = desired.clamp(0.0, context.max_scroll);
        let (x, y) = surface.scroll_position();
        match context.axis {
            Axis::Horizontal => surface.scroll_to(clamped, y),
            Axis::Vertical => surface.scroll_to(x, clamped),
        }
        trace!(offset = clamped, vertical = context.vertical(), "Applied scroll offset");
        clamped
    }

    pub fn align_to_page(&self, context: &ScrollContext, anchor: f64) -> f64 {
        context.align_to_page(anchor)
    }

    /// Move exactly one page. `Limit` tells the caller to switch chapters.
    pub fn paginate<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        direction: PageDirection,
    ) -> PaginationResult {
        let context = self.scroll_context(surface);
        if context.page_size <= 0.0 {
            return PaginationResult::Limit;
        }
        let current = self.current_offset(surface, &context);
        let target = match direction {
            PageDirection::Forward => {
                if current + context.page_size <= context.last_page_offset() + self.tolerance {
                    Some(current + context.page_size)
                } else {
                    None
                }
            }
            PageDirection::Backward => (current > 0.0).then(|| current - context.page_size),
        };
        match target {
            Some(target) => {
                let applied = self.set_scroll_offset(surface, &context, target);
                debug!(?direction, from = current, to = applied, "Paginated");
                PaginationResult::Scrolled
            }
            None => {
                debug!(?direction, offset = current, "Pagination hit chapter limit");
                PaginationResult::Limit
            }
        }
    }

    /// Install the snap handler with `initial_offset` as the known-good
    /// baseline. Only the first call per document has any effect.
    pub fn register_snap_scroll(&mut self, initial_offset: f64) -> bool {
        if self.snap.armed {
            return false;
        }
        self.snap = SnapGuard {
            armed: true,
            last_page_offset: sanitize(initial_offset),
        };
        debug!(baseline = self.snap.last_page_offset, "Registered snap scroll");
        true
    }

    /// Raw scroll event from the surface.
    pub fn handle_scroll<S: RenderSurface + ?Sized>(&mut self, surface: &mut S) -> SnapOutcome {
        if !self.snap.armed {
            return SnapOutcome::Inactive;
        }
        let context = self.scroll_context(surface);
        if context.page_size <= 0.0 {
            return SnapOutcome::Inactive;
        }
        let current = self.current_offset(surface, &context);
        let snapped = (current / context.page_size).round() * context.page_size;
        if (current - snapped).abs() > self.tolerance {
            let baseline = self.snap.last_page_offset;
            let (x, y) = surface.scroll_position();
            match context.axis {
                Axis::Horizontal => surface.scroll_to(baseline, y),
                Axis::Vertical => surface.scroll_to(x, baseline),
            }
            debug!(drifted = current, baseline, "Reverted unaligned scroll");
            SnapOutcome::Reverted(baseline)
        } else {
            self.snap.last_page_offset = snapped;
            SnapOutcome::Adopted(snapped)
        }
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::WritingMode;
    use crate::test_support::ColumnSurface;

    fn context(page_size: f64, max_scroll: f64) -> ScrollContext {
        ScrollContext {
            axis: Axis::Horizontal,
            page_size,
            max_scroll,
        }
    }

    #[test]
    fn align_rounds_down_to_page_start() {
        let ctx = context(100.0, 900.0);
        assert_eq!(ctx.align_to_page(0.0), 0.0);
        assert_eq!(ctx.align_to_page(99.9), 0.0);
        assert_eq!(ctx.align_to_page(100.0), 100.0);
        assert_eq!(ctx.align_to_page(450.0), 400.0);
        assert_eq!(ctx.align_to_page(-30.0), 0.0);
        assert_eq!(ctx.align_to_page(5000.0), 900.0);
    }

    #[test]
    fn align_is_idempotent_even_with_ragged_content() {
        let ctx = context(100.0, 950.0);
        for anchor in [0.0, 42.0, 199.0, 870.0, 949.0, 950.0, 12_000.0] {
            let once = ctx.align_to_page(anchor);
            assert_eq!(ctx.align_to_page(once), once, "anchor {anchor}");
            assert!(once <= ctx.max_scroll);
        }
    }

    #[test]
    fn zero_page_size_aligns_to_origin() {
        let ctx = context(0.0, 500.0);
        assert_eq!(ctx.align_to_page(250.0), 0.0);
        assert_eq!(ctx.last_page_offset(), 0.0);
    }

    #[test]
    fn scroll_context_follows_writing_mode() {
        let engine = PaginationEngine::default();
        let horizontal = ColumnSurface::pages(WritingMode::HorizontalTb, 100.0, 5, &[]);
        let ctx = engine.scroll_context(&horizontal);
        assert!(!ctx.vertical());
        assert_eq!(ctx.page_size, 100.0);
        assert_eq!(ctx.max_scroll, 400.0);

        let vertical = ColumnSurface::pages(WritingMode::VerticalRl, 80.0, 3, &[]);
        let ctx = engine.scroll_context(&vertical);
        assert!(engine.is_vertical(&vertical));
        assert_eq!(ctx.page_size, 80.0);
        assert_eq!(ctx.max_scroll, 160.0);
    }

    #[test]
    fn set_scroll_offset_clamps_and_touches_page_axis_only() {
        let engine = PaginationEngine::default();
        let mut surface = ColumnSurface::pages(WritingMode::VerticalRl, 100.0, 4, &[]);
        surface.scroll = (7.0, 0.0);
        let ctx = engine.scroll_context(&surface);
        assert_eq!(engine.set_scroll_offset(&mut surface, &ctx, 1_000.0), 300.0);
        assert_eq!(surface.scroll, (7.0, 300.0));
        assert_eq!(engine.set_scroll_offset(&mut surface, &ctx, -5.0), 0.0);
        assert_eq!(surface.scroll, (7.0, 0.0));
    }

    #[test]
    fn forward_pagination_stops_at_last_aligned_page() {
        let engine = PaginationEngine::default();
        let mut surface = ColumnSurface::pages(WritingMode::HorizontalTb, 100.0, 3, &[]);
        assert_eq!(
            engine.paginate(&mut surface, PageDirection::Forward),
            PaginationResult::Scrolled
        );
        assert_eq!(
            engine.paginate(&mut surface, PageDirection::Forward),
            PaginationResult::Scrolled
        );
        assert_eq!(surface.scroll.0, 200.0);
        assert_eq!(
            engine.paginate(&mut surface, PageDirection::Forward),
            PaginationResult::Limit
        );
        assert_eq!(surface.scroll.0, 200.0);
    }

    #[test]
    fn forward_pagination_tolerates_subunit_rounding() {
        let engine = PaginationEngine::default();
        let mut surface = ColumnSurface::pages(WritingMode::HorizontalTb, 100.0, 3, &[]);
        surface.scroll = (100.6, 0.0);
        assert_eq!(
            engine.paginate(&mut surface, PageDirection::Forward),
            PaginationResult::Scrolled
        );
    }

    #[test]
    fn backward_pagination_at_origin_is_limit() {
        let engine = PaginationEngine::default();
        let mut surface = ColumnSurface::pages(WritingMode::HorizontalTb, 100.0, 3, &[]);
        assert_eq!(
            engine.paginate(&mut surface, PageDirection::Backward),
            PaginationResult::Limit
        );
        surface.scroll = (200.0, 0.0);
        assert_eq!(
            engine.paginate(&mut surface, PageDirection::Backward),
            PaginationResult::Scrolled
        );
        assert_eq!(surface.scroll.0, 100.0);
    }

    #[test]
    fn pagination_without_viewport_is_limit() {
        let engine = PaginationEngine::default();
        let mut surface = ColumnSurface::pages(WritingMode::HorizontalTb, 0.0, 3, &[]);
        assert_eq!(
            engine.paginate(&mut surface, PageDirection::Forward),
            PaginationResult::Limit
        );
    }

    #[test]
    fn snap_registration_is_idempotent_per_document() {
        let mut engine = PaginationEngine::default();
        assert!(engine.register_snap_scroll(200.0));
        assert!(!engine.register_snap_scroll(0.0));
        assert_eq!(engine.snap_guard().baseline(), Some(200.0));

        engine.reset_for_document();
        assert!(!engine.snap_guard().is_armed());
        assert!(engine.register_snap_scroll(0.0));
        assert_eq!(engine.snap_guard().baseline(), Some(0.0));
    }

    #[test]
    fn snap_handler_reverts_drift_and_adopts_aligned_offsets() {
        let mut engine = PaginationEngine::default();
        let mut surface = ColumnSurface::pages(WritingMode::HorizontalTb, 100.0, 5, &[]);
        surface.scroll = (130.0, 0.0);
        assert_eq!(engine.handle_scroll(&mut surface), SnapOutcome::Inactive);

        engine.register_snap_scroll(100.0);
        assert_eq!(engine.handle_scroll(&mut surface), SnapOutcome::Reverted(100.0));
        assert_eq!(surface.scroll.0, 100.0);

        surface.scroll = (300.5, 0.0);
        assert_eq!(engine.handle_scroll(&mut surface), SnapOutcome::Adopted(300.0));
        assert_eq!(engine.snap_guard().baseline(), Some(300.0));

        surface.scroll = (260.0, 0.0);
        assert_eq!(engine.handle_scroll(&mut surface), SnapOutcome::Reverted(300.0));
        assert_eq!(surface.scroll.0, 300.0);
    }
}
