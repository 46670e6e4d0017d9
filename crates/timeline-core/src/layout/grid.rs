use chrono::Datelike;
use serde::Serialize;
use tracing::debug;

use super::range::DateRange;
use crate::datetime::{first_of_month, month_label, months_spanned, shift_month_start};

/// Sparse datasets still get a full year of grid lines.
pub const MIN_VISIBLE_MONTHS: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCell {
    pub year: i32,
    /// 0 = January.
    pub month_index: u32,
    pub left_px: f64,
    pub width_px: f64,
}

impl MonthCell {
    pub fn label(&self) -> &'static str {
        month_label(self.month_index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearGroup {
    pub year: i32,
    pub months: Vec<MonthCell>,
}

impl YearGroup {
    pub fn left_px(&self) -> f64 {
        self.months.first().map(|cell| cell.left_px).unwrap_or_default()
    }

    pub fn width_px(&self) -> f64 {
        self.months.iter().map(|cell| cell.width_px).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    pub years: Vec<YearGroup>,
    pub month_count: usize,
    pub month_width: f64,
    /// Background width of every row; may exceed the header when the floor applies.
    pub total_width: f64,
    pub grid_line_count: usize,
}

impl Grid {
    pub fn months(&self) -> impl Iterator<Item = &MonthCell> {
        self.years.iter().flat_map(|year| year.months.iter())
    }
}

#[tracing::instrument(skip(range), fields(min = %range.min, max = %range.max))]
pub fn build_grid(range: &DateRange, month_width: f64) -> Grid {
    let mut years: Vec<YearGroup> = Vec::new();
    let mut month_count = 0usize;

    let last = first_of_month(range.max);
    let mut cursor = first_of_month(range.min);

    while cursor <= last {
        let cell = MonthCell {
            year: cursor.year(),
            month_index: cursor.month0(),
            left_px: month_count as f64 * month_width,
            width_px: month_width,
        };

        if years.last().is_none_or(|group| group.year != cell.year) {
            years.push(YearGroup {
                year: cell.year,
                months: Vec::new(),
            });
        }
        if let Some(group) = years.last_mut() {
            group.months.push(cell);
        }
        month_count += 1;

        let next = shift_month_start(cursor, 1);
        if next <= cursor {
            break;
        }
        cursor = next;
    }

    let mut width_months = month_count;
    if width_months < MIN_VISIBLE_MONTHS {
        let months_in_range = months_spanned(range.min, range.max).max(0) as usize;
        width_months = months_in_range.max(MIN_VISIBLE_MONTHS);
    }
    let total_width = width_months as f64 * month_width;
    let grid_line_count = width_months.max(1);

    debug!(
        months = month_count,
        years = years.len(),
        total_width,
        grid_line_count,
        "built month grid"
    );

    Grid {
        years,
        month_count,
        month_width,
        total_width,
        grid_line_count,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn splits_months_into_year_groups() {
        let range = DateRange {
            min: day(2023, 10, 1),
            max: day(2025, 2, 28),
        };
        let grid = build_grid(&range, 90.0);

        let years: Vec<i32> = grid.years.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![2023, 2024, 2025]);
        assert_eq!(grid.years[0].months.len(), 3);
        assert_eq!(grid.years[1].months.len(), 12);
        assert_eq!(grid.years[2].months.len(), 2);
        assert_eq!(grid.month_count, 17);
        assert_eq!(grid.total_width, 17.0 * 90.0);
        assert_eq!(grid.grid_line_count, 17);
        assert_eq!(grid.years[1].left_px(), 3.0 * 90.0);
        assert_eq!(grid.years[2].width_px(), 180.0);
    }

    #[test]
    fn month_cells_are_contiguous() {
        let range = DateRange {
            min: day(2024, 1, 1),
            max: day(2024, 12, 31),
        };
        let grid = build_grid(&range, 90.0);
        let labels: Vec<&str> = grid.months().map(MonthCell::label).collect();
        assert_eq!(labels.first(), Some(&"Jan"));
        assert_eq!(labels.last(), Some(&"Dec"));
        for (idx, cell) in grid.months().enumerate() {
            assert_eq!(cell.left_px, idx as f64 * 90.0);
        }
    }

    #[test]
    fn short_ranges_are_floored_to_a_year() {
        let range = DateRange {
            min: day(2024, 1, 1),
            max: day(2024, 4, 30),
        };
        let grid = build_grid(&range, 90.0);
        assert_eq!(grid.month_count, 4);
        assert_eq!(grid.years.len(), 1);
        assert_eq!(grid.years[0].width_px(), 360.0);
        assert_eq!(grid.total_width, 12.0 * 90.0);
        assert_eq!(grid.grid_line_count, 12);
    }

    #[test]
    fn single_day_range_still_has_one_month() {
        let range = DateRange {
            min: day(2024, 5, 9),
            max: day(2024, 5, 9),
        };
        let grid = build_grid(&range, 60.0);
        assert_eq!(grid.month_count, 1);
        assert_eq!(grid.total_width, 720.0);
    }
}
