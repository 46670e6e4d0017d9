use chrono::NaiveDate;
use serde::Serialize;
use timeline_shared::TimelineItem;
use tracing::{debug, warn};

use crate::datetime::{last_of_month, parse_day, shift_month_start};

/// Months shown on each side of today when there is nothing to lay out.
pub const EMPTY_WINDOW_MONTHS: i32 = 6;

const LEAD_PADDING_MONTHS: i32 = 1;
const TRAIL_PADDING_MONTHS: i32 = 2;
const SKEW_FALLBACK_MONTHS: i32 = 12;

/// Inclusive span of calendar days covered by the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.min <= day && day <= self.max
    }

    /// Signed whole days from `min` to `day`.
    pub fn day_offset(&self, day: NaiveDate) -> i64 {
        (day - self.min).num_days()
    }
}

pub fn default_window(today: NaiveDate) -> DateRange {
    DateRange {
        min: shift_month_start(today, -EMPTY_WINDOW_MONTHS),
        max: last_of_month(shift_month_start(today, EMPTY_WINDOW_MONTHS)),
    }
}

/// Visible range for `items`: the earliest start padded back to the first of
/// the previous month, the latest end padded forward to the end of the month
/// two months later. Ongoing items end `today`.
///
/// Unparseable dates are skipped. When only one extreme is known it stands in
/// for the other.
#[tracing::instrument(skip(items), fields(items = items.len()))]
pub fn resolve_range(items: &[TimelineItem], today: NaiveDate) -> DateRange {
    let earliest = items
        .iter()
        .filter_map(|item| parse_day(&item.start_date))
        .min();
    let latest = items
        .iter()
        .filter_map(|item| match item.end_date.as_deref() {
            Some(raw) => parse_day(raw),
            None => Some(today),
        })
        .max();

    let (earliest, latest) = match (earliest, latest) {
        (Some(earliest), Some(latest)) => (earliest, latest),
        (Some(only), None) | (None, Some(only)) => (only, only),
        (None, None) => {
            debug!("no usable dates; using default window");
            return default_window(today);
        }
    };

    let mut min = shift_month_start(earliest, -LEAD_PADDING_MONTHS);
    let max = last_of_month(shift_month_start(latest, TRAIL_PADDING_MONTHS));

    if min > max {
        warn!(%min, %max, "padded range inverted; rewinding min");
        min = shift_month_start(max, -SKEW_FALLBACK_MONTHS);
    }

    debug!(%min, %max, "resolved visible range");
    DateRange { min, max }
}
