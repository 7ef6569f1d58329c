//! Viewport windowing for the gallery grid
//!
//! Computes which contiguous slice of the collection should be mounted for a
//! given scroll position, and tells the caller when that slice is close enough
//! to the end of the loaded data to warrant fetching another page.

use crate::config::WindowConfig;

/// Viewport widths below these get 1 and 2 columns; wider gets 3
pub const BREAKPOINT_SINGLE_COLUMN: f64 = 768.0;
pub const BREAKPOINT_TWO_COLUMNS: f64 = 1024.0;

/// Grid columns for a viewport width
pub fn columns_for_width(width: f64) -> usize {
    if width < BREAKPOINT_SINGLE_COLUMN {
        1
    } else if width < BREAKPOINT_TWO_COLUMNS {
        2
    } else {
        3
    }
}

/// Scroll container geometry in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_top: f64,
    pub height: f64,
    pub width: f64,
}

impl Viewport {
    pub fn new(scroll_top: f64, height: f64, width: f64) -> Self {
        Self {
            scroll_top: scroll_top.max(0.0),
            height: height.max(0.0),
            width: width.max(0.0),
        }
    }
}

/// Half-open index interval into the collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowRange {
    pub start: usize,
    pub end: usize,
}

impl WindowRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end).contains(&index)
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Message from the window to the pagination side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSignal {
    /// The mounted slice is near the end of the loaded data and more exists
    ApproachingEnd,
}

/// Whether an item should load its full image right away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPriority {
    Eager,
    Lazy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowUpdate {
    pub range: WindowRange,
    pub columns: usize,
    /// `false` when the collection is small enough to render whole
    pub windowed: bool,
    pub signal: Option<WindowSignal>,
}

pub struct WindowCalculator {
    config: WindowConfig,
}

impl WindowCalculator {
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    fn row_height(&self) -> f64 {
        self.config.item_height_px.max(1.0)
    }

    /// Most rows ever mounted at once
    pub fn max_window_rows(&self) -> usize {
        let span = self.config.max_viewport_height_px + 2.0 * self.config.buffer_px;
        (span / self.row_height()).ceil() as usize + 1
    }

    /// Upper bound on `end - start` for a windowed range
    pub fn max_window_len(&self, columns: usize) -> usize {
        self.max_window_rows() * columns.max(1)
    }

    /// Rows intersecting `[top, bottom)`, as `(first_row, end_row)`
    fn rows_between(&self, top: f64, bottom: f64) -> (usize, usize) {
        let row_h = self.row_height();
        let first = (top.max(0.0) / row_h).floor() as usize;
        let end = (bottom.max(0.0) / row_h).ceil() as usize;
        (first, end.max(first))
    }

    /// Rows intersecting the viewport itself, without buffer
    fn visible_rows(&self, viewport: &Viewport) -> (usize, usize) {
        self.rows_between(viewport.scroll_top, viewport.scroll_top + viewport.height)
    }

    /// Compute the mounted range for `len` items
    pub fn compute(&self, viewport: &Viewport, len: usize, has_more: bool) -> WindowUpdate {
        let columns = columns_for_width(viewport.width);

        if len < self.config.min_items_for_windowing {
            let (_, visible_end_row) = self.visible_rows(viewport);
            return WindowUpdate {
                range: WindowRange::new(0, len),
                columns,
                windowed: false,
                signal: self.end_signal(visible_end_row * columns, len, columns, has_more),
            };
        }

        let total_rows = len.div_ceil(columns);
        let buffer = self.config.buffer_px;
        let (mut first_row, mut end_row) = self.rows_between(
            viewport.scroll_top - buffer,
            viewport.scroll_top + viewport.height + buffer,
        );
        end_row = end_row.min(total_rows);
        first_row = first_row.min(end_row);

        let (visible_first, visible_end) = self.visible_rows(viewport);
        let visible_first = visible_first.clamp(first_row, end_row);
        let visible_end = visible_end.clamp(visible_first, end_row);

        // Trim the buffer rows evenly around the visible rows if over the cap
        let max_rows = self.max_window_rows();
        let mut excess = (end_row - first_row).saturating_sub(max_rows);
        if excess > 0 {
            let above = visible_first - first_row;
            let below = end_row - visible_end;
            let trim_above = above.min(excess.div_ceil(2));
            excess -= trim_above;
            let trim_below = below.min(excess);
            excess -= trim_below;
            first_row += trim_above;
            end_row -= trim_below;
            // Only reachable when the viewport itself is taller than the cap
            end_row -= excess.min(end_row - first_row);
        }

        let start = (first_row * columns).min(len);
        let end = (end_row * columns).min(len).max(start);

        WindowUpdate {
            range: WindowRange::new(start, end),
            columns,
            windowed: true,
            signal: self.end_signal(end, len, columns, has_more),
        }
    }

    fn end_signal(
        &self,
        end: usize,
        len: usize,
        columns: usize,
        has_more: bool,
    ) -> Option<WindowSignal> {
        let threshold = self.config.end_threshold_rows * columns;
        (has_more && end + threshold >= len).then_some(WindowSignal::ApproachingEnd)
    }

    /// Eager for items in rows intersecting the unbuffered viewport
    pub fn priority(&self, index: usize, viewport: &Viewport, columns: usize) -> LoadPriority {
        let row = index / columns.max(1);
        let (first, end) = self.visible_rows(viewport);
        if (first..end).contains(&row) {
            LoadPriority::Eager
        } else {
            LoadPriority::Lazy
        }
    }

    /// Pixel offset of the top of an item's row
    pub fn item_top(&self, index: usize, columns: usize) -> f64 {
        (index / columns.max(1)) as f64 * self.row_height()
    }

    /// Total scrollable height for `len` items
    pub fn content_height(&self, len: usize, columns: usize) -> f64 {
        len.div_ceil(columns.max(1)) as f64 * self.row_height()
    }
}

/// Coalesces scroll/resize events to at most one recompute per frame.
///
/// `schedule` stores the latest viewport and reports whether the host must
/// request an animation frame; `take_frame` hands that viewport out once.
#[derive(Debug, Default)]
pub struct RecomputeThrottle {
    latest: Option<Viewport>,
    frame_requested: bool,
}

impl RecomputeThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event; `true` means a new frame must be requested
    pub fn schedule(&mut self, viewport: Viewport) -> bool {
        self.latest = Some(viewport);
        if self.frame_requested {
            return false;
        }
        self.frame_requested = true;
        true
    }

    /// Frame callback: the most recent viewport since the last frame
    pub fn take_frame(&mut self) -> Option<Viewport> {
        self.frame_requested = false;
        self.latest.take()
    }

    pub fn is_pending(&self) -> bool {
        self.frame_requested
    }
}
