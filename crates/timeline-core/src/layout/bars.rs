use chrono::NaiveDate;
use serde::Serialize;
use timeline_shared::TimelineItem;
use tracing::trace;

use super::AVG_DAYS_PER_MONTH;
use super::range::DateRange;
use crate::datetime::parse_day;

/// Fixed width of a one-day bar so it stays visible at month scale.
pub const SINGLE_DAY_BAR_WIDTH_PX: f64 = 5.0;
/// Added after shifting a one-day bar left by half its width.
pub const SINGLE_DAY_CENTER_NUDGE_PX: f64 = 1.5;
/// Gap kept between a bar and the right edge of the grid.
pub const RIGHT_EDGE_MARGIN_PX: f64 = 10.0;
/// Bars no wider than this are not emitted.
pub const MIN_DRAWN_WIDTH_PX: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarSpan {
    Closed,
    Ongoing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarLength {
    SingleDay,
    MultiDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bar {
    pub item_id: i64,
    pub left_px: f64,
    /// Drawn width, after clamping to the grid.
    pub width_px: f64,
    pub visual_days: i64,
    pub span: BarSpan,
    pub length: BarLength,
}

impl Bar {
    pub fn right_px(&self) -> f64 {
        self.left_px + self.width_px
    }

    pub fn is_ongoing(&self) -> bool {
        self.span == BarSpan::Ongoing
    }

    pub fn is_single_day(&self) -> bool {
        self.length == BarLength::SingleDay
    }
}

/// Inclusive days a bar covers. Ongoing items run to `today`; an end before
/// the start (or an ongoing item that has not started yet) gives 0.
pub fn visual_days(start: NaiveDate, end: Option<NaiveDate>, today: NaiveDate) -> i64 {
    let until = end.unwrap_or(today);
    let delta = (until - start).num_days();
    if delta < 0 { 0 } else { delta + 1 }
}

/// Converts item intervals into pixel geometry for one layout pass.
#[derive(Debug, Clone, Copy)]
pub struct BarPositioner {
    range: DateRange,
    today: NaiveDate,
    pixels_per_day: f64,
    total_width: f64,
}

impl BarPositioner {
    pub fn new(range: DateRange, today: NaiveDate, month_width: f64, total_width: f64) -> Self {
        Self {
            range,
            today,
            pixels_per_day: month_width / AVG_DAYS_PER_MONTH,
            total_width,
        }
    }

    /// Raw left offset of `day`, clamped so days before the range sit at 0.
    pub fn offset_px(&self, day: NaiveDate) -> f64 {
        self.range.day_offset(day).max(0) as f64 * self.pixels_per_day
    }

    /// Returns `None` when the item has no drawable bar: unparseable dates,
    /// an inverted interval, a future ongoing item, or a bar squeezed to
    /// nothing by the right edge.
    pub fn position(&self, item: &TimelineItem) -> Option<Bar> {
        let Some(start) = parse_day(&item.start_date) else {
            trace!(item_id = item.id, start = %item.start_date, "unparseable start; no bar");
            return None;
        };
        let end = match item.end_date.as_deref() {
            Some(raw) => match parse_day(raw) {
                Some(day) => Some(day),
                None => {
                    trace!(item_id = item.id, end = %raw, "unparseable end; no bar");
                    return None;
                }
            },
            None => None,
        };

        let vd = visual_days(start, end, self.today);
        let mut left_px = self.offset_px(start);
        let mut width_px = vd as f64 * self.pixels_per_day;

        let length = if vd == 1 {
            width_px = SINGLE_DAY_BAR_WIDTH_PX;
            left_px = left_px - width_px / 2.0 + SINGLE_DAY_CENTER_NUDGE_PX;
            BarLength::SingleDay
        } else {
            BarLength::MultiDay
        };

        let drawn_px = width_px.min(self.total_width - left_px - RIGHT_EDGE_MARGIN_PX);
        if drawn_px <= MIN_DRAWN_WIDTH_PX {
            trace!(item_id = item.id, visual_days = vd, drawn_px, "bar suppressed");
            return None;
        }

        Some(Bar {
            item_id: item.id,
            left_px,
            width_px: drawn_px,
            visual_days: vd,
            span: if end.is_some() {
                BarSpan::Closed
            } else {
                BarSpan::Ongoing
            },
            length,
        })
    }
}
