//! Rendering-surface contract.
//!
//! The surface owns layout. The engines here only read geometry through
//! [`RenderSurface`] and write scroll offsets back, so they can run against a
//! live web view or a synthetic layout in tests. Messages crossing the
//! surface/host boundary are plain serde types with TypeScript bindings.

use crate::content::{ContentTree, NodeId};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum WritingMode {
    #[default]
    HorizontalTb,
    VerticalRl,
}

/// Axis along which pages advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn for_mode(mode: WritingMode) -> Self {
        match mode {
            WritingMode::VerticalRl => Axis::Vertical,
            WritingMode::HorizontalTb => Axis::Horizontal,
        }
    }

    pub fn pick(self, (x, y): (f64, f64)) -> f64 {
        match self {
            Axis::Horizontal => x,
            Axis::Vertical => y,
        }
    }
}

/// Viewport-relative box, in surface units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default, TS)]
#[ts(export)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Leading edge along the page axis.
    pub fn leading(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.left,
            Axis::Vertical => self.top,
        }
    }
}

pub trait RenderSurface {
    fn content(&self) -> &ContentTree;

    fn writing_mode(&self) -> WritingMode;

    /// Visible extent as `(width, height)`.
    fn viewport_size(&self) -> (f64, f64);

    /// Scrollable extent as `(width, height)`.
    fn content_size(&self) -> (f64, f64);

    fn scroll_position(&self) -> (f64, f64);

    fn scroll_to(&mut self, x: f64, y: f64);

    /// Bounding box of a whole text run.
    fn run_rect(&self, run: NodeId) -> Option<Rect>;

    /// Box of the first character of a text run.
    fn first_char_rect(&self, run: NodeId) -> Option<Rect>;

    fn element_rect(&self, element: NodeId) -> Option<Rect>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PageDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaginationResult {
    Scrolled,
    /// No page left in that direction; the host switches chapters.
    Limit,
}

/// Messages the surface posts to the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(tag = "type", rename_all = "camelCase")]
#[ts(export)]
pub enum SurfaceMessage {
    /// Exactly one per restore or fragment jump.
    RestoreCompleted,
    TextSelected {
        text: String,
        sentence: String,
        rect: Rect,
    },
    Paginated {
        direction: PageDirection,
        result: PaginationResult,
    },
}
