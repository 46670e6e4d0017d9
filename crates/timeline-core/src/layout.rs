//! Pure layout pass: items in, chart geometry out.
//!
//! Nothing here does I/O or keeps state between calls. Every pass recomputes
//! the range, grid, rows and bars from the item snapshot it is given.

pub mod bars;
pub mod grid;
pub mod groups;
pub mod range;
pub mod scroll;
pub mod today;

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::Serialize;
use timeline_shared::TimelineItem;
use tracing::debug;

use self::bars::{Bar, BarPositioner};
use self::grid::{Grid, build_grid};
use self::groups::{CollapsedGroups, group_items};
use self::range::{DateRange, resolve_range};
use self::today::{TodayMarker, today_marker};
use crate::config::Config;
use crate::datetime::{days_between, format_period, humanize_duration};

/// 365.25 / 12. Shared by bars and the today line so they agree.
pub const AVG_DAYS_PER_MONTH: f64 = 30.4375;
pub const DEFAULT_MONTH_WIDTH_PX: f64 = 90.0;
pub const DEFAULT_ROW_HEIGHT_PX: f64 = 54.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutConfig {
    pub month_width: f64,
    pub row_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            month_width: DEFAULT_MONTH_WIDTH_PX,
            row_height: DEFAULT_ROW_HEIGHT_PX,
        }
    }
}

impl LayoutConfig {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let month_width = cfg
            .get_f64("layout.month_width")?
            .unwrap_or(defaults.month_width);
        let row_height = cfg
            .get_f64("layout.row_height")?
            .unwrap_or(defaults.row_height);

        if !(month_width.is_finite() && month_width > 0.0) {
            return Err(anyhow!(
                "layout.month_width must be a positive number, got {month_width}"
            ));
        }
        if !(row_height.is_finite() && row_height > 0.0) {
            return Err(anyhow!(
                "layout.row_height must be a positive number, got {row_height}"
            ));
        }

        Ok(Self {
            month_width,
            row_height,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRow {
    pub item: TimelineItem,
    pub bar: Option<Bar>,
    /// Inclusive calendar days, up to today for ongoing items.
    pub days: i64,
    pub duration: String,
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRows {
    pub name: String,
    pub collapsed: bool,
    pub item_count: usize,
    /// Empty when collapsed.
    pub rows: Vec<ItemRow>,
}

/// Everything a presentation layer needs to draw the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub today: NaiveDate,
    pub range: DateRange,
    pub grid: Grid,
    pub groups: Vec<GroupRows>,
    pub today_marker: TodayMarker,
    pub row_height: f64,
    pub body_height: f64,
}

impl Layout {
    #[tracing::instrument(skip(items, collapsed, config), fields(items = items.len()))]
    pub fn compute(
        items: &[TimelineItem],
        collapsed: &CollapsedGroups,
        today: NaiveDate,
        config: &LayoutConfig,
    ) -> Self {
        let range = resolve_range(items, today);
        let grid = build_grid(&range, config.month_width);
        let marker = today_marker(&range, today, config.month_width, grid.total_width);
        let positioner = BarPositioner::new(range, today, config.month_width, grid.total_width);

        let groups: Vec<GroupRows> = group_items(items)
            .into_iter()
            .map(|bucket| {
                let rows = bucket
                    .visible_items(collapsed)
                    .iter()
                    .map(|item| item_row(item, &positioner, today))
                    .collect();
                GroupRows {
                    collapsed: collapsed.is_collapsed(&bucket.group_name),
                    item_count: bucket.items.len(),
                    name: bucket.group_name,
                    rows,
                }
            })
            .collect();

        let row_count: usize = groups.iter().map(|group| 1 + group.rows.len()).sum();
        let layout = Self {
            today,
            range,
            grid,
            groups,
            today_marker: marker,
            row_height: config.row_height,
            body_height: row_count as f64 * config.row_height,
        };

        debug!(
            groups = layout.groups.len(),
            bars = layout.bar_count(),
            total_width = layout.grid.total_width,
            today_visible = layout.today_marker.is_visible(),
            "computed layout"
        );
        layout
    }

    pub fn total_width(&self) -> f64 {
        self.grid.total_width
    }

    pub fn grid_line_count(&self) -> usize {
        self.grid.grid_line_count
    }

    pub fn bar_count(&self) -> usize {
        self.bars().count()
    }

    pub fn bars(&self) -> impl Iterator<Item = &Bar> {
        self.groups
            .iter()
            .flat_map(|group| group.rows.iter())
            .filter_map(|row| row.bar.as_ref())
    }
}

fn item_row(item: &TimelineItem, positioner: &BarPositioner, today: NaiveDate) -> ItemRow {
    let days = days_between(&item.start_date, item.end_date.as_deref(), today);
    ItemRow {
        item: item.clone(),
        bar: positioner.position(item),
        days,
        duration: humanize_duration(days),
        period: format_period(&item.start_date, item.end_date.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn item(id: i64, group: &str, start: &str, end: Option<&str>) -> TimelineItem {
        TimelineItem {
            id,
            group: group.to_string(),
            name: format!("item-{id}"),
            start_date: start.to_string(),
            end_date: end.map(str::to_string),
        }
    }

    #[test]
    fn collapsed_groups_keep_header_rows_only() {
        let items = vec![
            item(1, "Travel", "2024-01-05", Some("2024-01-12")),
            item(2, "Work", "2023-06-01", None),
            item(3, "Work", "2023-09-01", Some("2023-12-01")),
        ];
        let collapsed: CollapsedGroups = ["Work"].into_iter().collect();
        let layout = Layout::compute(&items, &collapsed, day(2024, 2, 1), &LayoutConfig::default());

        assert_eq!(layout.groups.len(), 2);
        assert!(layout.groups[1].collapsed);
        assert_eq!(layout.groups[1].item_count, 2);
        assert!(layout.groups[1].rows.is_empty());
        assert_eq!(layout.body_height, 3.0 * DEFAULT_ROW_HEIGHT_PX);
        assert_eq!(layout.bar_count(), 1);
    }

    #[test]
    fn rows_carry_sidebar_labels() {
        let items = vec![item(1, "Work", "2024-01-10", None)];
        let layout = Layout::compute(
            &items,
            &CollapsedGroups::new(),
            day(2024, 1, 20),
            &LayoutConfig::default(),
        );
        let row = &layout.groups[0].rows[0];
        assert_eq!(row.days, 11);
        assert_eq!(row.duration, "11 days");
        assert_eq!(row.period, "10.01.24 - now");
    }

    #[test]
    fn layout_config_rejects_non_positive_widths() {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("layout.month_width".to_string(), "0".to_string())]);
        assert!(LayoutConfig::from_config(&cfg).is_err());
    }

    #[test]
    fn layout_config_reads_overrides() {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("rc.layout.month_width".to_string(), "60".to_string())]);
        let layout_cfg = LayoutConfig::from_config(&cfg).expect("config");
        assert_eq!(layout_cfg.month_width, 60.0);
        assert_eq!(layout_cfg.row_height, DEFAULT_ROW_HEIGHT_PX);
    }
}
