use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const DEFAULT_ROW_HEIGHT: f64 = 45.0;
pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 600.0;
pub const DEFAULT_OVERSCAN: usize = 5;

/// Scroll position and sizing of the scrollable row container.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct ViewportMetrics {
    pub scroll_offset: f64,
    pub viewport_height: f64,
    pub row_height: f64,
    pub overscan: usize,
}

impl Default for ViewportMetrics {
    fn default() -> Self {
        Self {
            scroll_offset: 0.0,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            row_height: DEFAULT_ROW_HEIGHT,
            overscan: DEFAULT_OVERSCAN,
        }
    }
}

/// A row that must be materialized, and where to put it.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct VirtualItem {
    pub index: usize,
    pub start: f64,
    pub size: f64,
}

/// Output of one planning pass.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct WindowPlan {
    /// Height of the full list, `count × row_height`
    pub total_size: f64,
    /// Scroll offset after clamping to the scrollable extent
    pub scroll_offset: f64,
    pub range: Range<usize>,
    pub items: Vec<VirtualItem>,
}

impl WindowPlan {
    pub fn empty() -> Self {
        WindowPlan {
            total_size: 0.0,
            scroll_offset: 0.0,
            range: 0..0,
            items: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Largest valid scroll offset for `count` rows.
fn max_scroll_offset(count: usize, metrics: &ViewportMetrics) -> f64 {
    let total = count as f64 * metrics.row_height;
    (total - metrics.viewport_height.max(0.0)).max(0.0)
}

fn clamp_offset(offset: f64, count: usize, metrics: &ViewportMetrics) -> f64 {
    if offset.is_nan() {
        return 0.0;
    }
    offset.clamp(0.0, max_scroll_offset(count, metrics))
}

/// Compute the rows intersecting the viewport, padded by the overscan.
///
/// Cost is proportional to the window size, never to `count`.
///
/// # Arguments
/// * `count` - Number of rows in the filtered and sorted view
/// * `metrics` - Current scroll offset, viewport height, row height, overscan
///
/// # Returns
/// * `WindowPlan` - Total extent, clamped offset, realized range and the
///   position of each realized row
///
/// # Examples
/// ```
/// use datatable::virtualizer::{plan_window, ViewportMetrics};
///
/// let metrics = ViewportMetrics { scroll_offset: 4500.0, ..Default::default() };
/// let plan = plan_window(1000, &metrics);
/// assert_eq!(plan.range, 95..119);
/// assert_eq!(plan.total_size, 45_000.0);
/// ```
pub fn plan_window(count: usize, metrics: &ViewportMetrics) -> WindowPlan {
    if count == 0 || !(metrics.row_height > 0.0) {
        return WindowPlan::empty();
    }

    let row_height = metrics.row_height;
    let offset = clamp_offset(metrics.scroll_offset, count, metrics);
    let viewport = metrics.viewport_height.max(0.0);

    let first_visible = ((offset / row_height).floor() as usize).min(count - 1);
    let last_visible = (((offset + viewport) / row_height).ceil() as usize)
        .max(first_visible + 1)
        .min(count);

    let start = first_visible.saturating_sub(metrics.overscan);
    let end = last_visible.saturating_add(metrics.overscan).min(count);

    let items = (start..end)
        .map(|index| VirtualItem {
            index,
            start: index as f64 * row_height,
            size: row_height,
        })
        .collect();

    WindowPlan {
        total_size: count as f64 * row_height,
        scroll_offset: offset,
        range: start..end,
        items,
    }
}

/// Row-list virtualizer: owns the metrics and the current row count.
#[derive(Clone, Debug, PartialEq)]
pub struct Virtualizer {
    count: usize,
    metrics: ViewportMetrics,
}

impl Virtualizer {
    pub fn new(metrics: ViewportMetrics) -> Self {
        Virtualizer { count: 0, metrics }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn metrics(&self) -> &ViewportMetrics {
        &self.metrics
    }

    /// Called after every filter or sort recomputation.
    pub fn set_count(&mut self, count: usize) {
        self.count = count;
        self.metrics.scroll_offset = clamp_offset(self.metrics.scroll_offset, count, &self.metrics);
    }

    pub fn scroll_to(&mut self, offset: f64) {
        self.metrics.scroll_offset = clamp_offset(offset, self.count, &self.metrics);
    }

    /// Scroll so the row at `index` sits at the top of the viewport.
    pub fn scroll_to_index(&mut self, index: usize) {
        self.scroll_to(index as f64 * self.metrics.row_height);
    }

    pub fn resize(&mut self, viewport_height: f64) {
        self.metrics.viewport_height = viewport_height.max(0.0);
        self.metrics.scroll_offset =
            clamp_offset(self.metrics.scroll_offset, self.count, &self.metrics);
    }

    pub fn total_size(&self) -> f64 {
        self.count as f64 * self.metrics.row_height.max(0.0)
    }

    pub fn window(&self) -> WindowPlan {
        plan_window(self.count, &self.metrics)
    }
}

impl Default for Virtualizer {
    fn default() -> Self {
        Virtualizer::new(ViewportMetrics::default())
    }
}
