use super::today::TodayMarker;

/// Maps pixel offsets on the chart to a horizontal scroll position for a
/// viewport narrower than the chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollController {
    viewport_width: f64,
    content_width: f64,
}

impl ScrollController {
    pub fn new(viewport_width: f64, content_width: f64) -> Self {
        Self {
            viewport_width: viewport_width.max(0.0),
            content_width: content_width.max(0.0),
        }
    }

    pub fn max_scroll(&self) -> f64 {
        (self.content_width - self.viewport_width).max(0.0)
    }

    pub fn clamp(&self, scroll_left: f64) -> f64 {
        scroll_left.clamp(0.0, self.max_scroll())
    }

    /// Scroll position that puts `offset_px` in the middle of the viewport.
    pub fn center_on(&self, offset_px: f64) -> f64 {
        self.clamp(offset_px - self.viewport_width / 2.0)
    }

    pub fn scroll_to_today(&self, marker: &TodayMarker) -> Option<f64> {
        marker.left_px().map(|left| self.center_on(left))
    }
}
