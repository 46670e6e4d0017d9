use chrono::NaiveDate;
use serde::Serialize;

use super::AVG_DAYS_PER_MONTH;
use super::range::DateRange;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TodayMarker {
    Hidden,
    Visible { left_px: f64 },
}

impl TodayMarker {
    pub fn left_px(&self) -> Option<f64> {
        match self {
            Self::Hidden => None,
            Self::Visible { left_px } => Some(*left_px),
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Visible { .. })
    }
}

/// Places the today line with the same day-to-pixel scale the bars use.
pub fn today_marker(
    range: &DateRange,
    today: NaiveDate,
    month_width: f64,
    total_width: f64,
) -> TodayMarker {
    if !range.contains(today) {
        return TodayMarker::Hidden;
    }

    let days = range.day_offset(today) as f64;
    let left_px = (days / AVG_DAYS_PER_MONTH * month_width).clamp(0.0, total_width.max(0.0));
    TodayMarker::Visible { left_px }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn range() -> DateRange {
        DateRange {
            min: day(2024, 1, 1),
            max: day(2024, 12, 31),
        }
    }

    #[test]
    fn hidden_outside_the_range() {
        assert_eq!(today_marker(&range(), day(2023, 12, 31), 90.0, 1080.0), TodayMarker::Hidden);
        assert_eq!(today_marker(&range(), day(2025, 1, 1), 90.0, 1080.0), TodayMarker::Hidden);
    }

    #[test]
    fn offset_uses_average_month_length() {
        let marker = today_marker(&range(), day(2024, 2, 1), 90.0, 1080.0);
        let left = marker.left_px().expect("visible");
        assert!((left - 31.0 / AVG_DAYS_PER_MONTH * 90.0).abs() < 1e-9);
    }

    #[test]
    fn range_edges_are_visible() {
        let first = today_marker(&range(), day(2024, 1, 1), 90.0, 1080.0);
        assert_eq!(first.left_px(), Some(0.0));
        let last = today_marker(&range(), day(2024, 12, 31), 90.0, 1080.0);
        let left = last.left_px().expect("visible");
        assert!(left > 0.0 && left <= 1080.0);
    }
}
