use std::fs;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use timeline_core::commands::{collapsed_groups, layout_json, settle_fetch};
use timeline_core::datastore::{SnapshotStore, load_items_file};
use timeline_core::layout::bars::BarSpan;
use timeline_core::layout::groups::CollapsedGroups;
use timeline_core::layout::{AVG_DAYS_PER_MONTH, Layout, LayoutConfig};
use timeline_core::render::Renderer;
use timeline_shared::TimelineItem;

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
fn groups_sorted_by_name_then_start() {
    let items = vec![
        item(1, "B", "2024-02-01", Some("2024-02-10")),
        item(2, "A", "2024-03-01", Some("2024-03-05")),
        item(3, "A", "2024-01-01", Some("2024-01-31")),
    ];
    let layout = Layout::compute(
        &items,
        &CollapsedGroups::new(),
        day(2024, 4, 1),
        &LayoutConfig::default(),
    );

    let names: Vec<&str> = layout.groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
    let a_starts: Vec<&str> = layout.groups[0]
        .rows
        .iter()
        .map(|row| row.item.start_date.as_str())
        .collect();
    assert_eq!(a_starts, vec!["2024-01-01", "2024-03-01"]);
}

#[test]
fn ongoing_item_runs_to_today() {
    let items = vec![item(7, "Work", "2024-01-10", None)];
    let layout = Layout::compute(
        &items,
        &CollapsedGroups::new(),
        day(2024, 1, 20),
        &LayoutConfig::default(),
    );

    let bar = layout.bars().next().expect("bar");
    assert_eq!(bar.visual_days, 11);
    assert_eq!(bar.span, BarSpan::Ongoing);
    assert!((bar.width_px - 11.0 * 90.0 / AVG_DAYS_PER_MONTH).abs() < 1e-9);
    assert_eq!(layout.range.min, day(2023, 12, 1));
    assert_eq!(layout.range.max, day(2024, 3, 31));
}

#[test]
fn empty_list_uses_centered_window() {
    let layout = Layout::compute(
        &[],
        &CollapsedGroups::new(),
        day(2024, 4, 15),
        &LayoutConfig::default(),
    );
    assert_eq!(layout.range.min, day(2023, 10, 1));
    assert_eq!(layout.range.max, day(2024, 10, 31));
    assert_eq!(layout.grid.month_count, 13);
    assert_eq!(layout.total_width(), 13.0 * 90.0);
    assert!(layout.today_marker.is_visible());
    assert_eq!(layout.bar_count(), 0);
}

#[test]
fn degenerate_items_lose_only_their_own_bars() {
    let items = vec![
        item(1, "Work", "2024-03-01", Some("2024-02-01")),
        item(2, "Work", "not a date", Some("2024-02-01")),
        item(3, "Work", "2024-01-01", Some("garbage")),
        item(4, "Work", "2024-01-05", Some("2024-01-20")),
    ];
    let layout = Layout::compute(
        &items,
        &CollapsedGroups::new(),
        day(2024, 4, 1),
        &LayoutConfig::default(),
    );

    assert_eq!(layout.groups[0].rows.len(), 4);
    let ids: Vec<i64> = layout.bars().map(|bar| bar.item_id).collect();
    assert_eq!(ids, vec![4]);
    let undated = layout.groups[0].rows.last().expect("row");
    assert_eq!(undated.item.id, 2);
    assert_eq!(undated.days, 0);
}

#[test]
fn layout_pass_is_idempotent() {
    let items = vec![
        item(1, "Work", "2021-05-03", Some("2023-08-31")),
        item(2, "Work", "2023-09-01", None),
        item(3, "Travel", "2022-07-14", Some("2022-07-14")),
        item(4, "Travel", "2024-02-10", Some("2024-02-20")),
    ];
    let collapsed = collapsed_groups(&[], &["Travel".to_string()]);
    let today = day(2024, 3, 1);
    let cfg = LayoutConfig::default();

    let first = Layout::compute(&items, &collapsed, today, &cfg);
    let second = Layout::compute(&items, &collapsed, today, &cfg);
    assert_eq!(
        layout_json(&first, Some(800.0), false).expect("json"),
        layout_json(&second, Some(800.0), false).expect("json")
    );
    assert_eq!(first, second);
}

#[test]
fn items_file_feeds_layout_and_chart() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("items.json");
    fs::write(
        &path,
        r#"[
            {"id": 1, "group": "Professions", "name": "Engineer",
             "start_date": "2022-01-01", "end_date": null},
            {"id": 2, "group": "Education", "name": "Course",
             "start_date": "2021-09-01", "end_date": "2022-06-30"}
        ]"#,
    )
    .expect("write items");

    let items = load_items_file(&path).expect("load");
    assert_eq!(items.len(), 2);
    assert!(items[0].is_ongoing());

    let layout = Layout::compute(
        &items,
        &CollapsedGroups::new(),
        day(2023, 1, 1),
        &LayoutConfig::default(),
    );
    let mut out = Vec::new();
    Renderer::plain(15.0, 24)
        .write_chart(&mut out, &layout, Some(40))
        .expect("chart");
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("Education (1)"));
    assert!(text.contains("Professions (1)"));
    assert!(text.contains("Engineer"));
}

#[test]
fn snapshot_survives_an_api_outage() {
    let temp = tempdir().expect("tempdir");
    let store = SnapshotStore::open(temp.path()).expect("open");

    let fetched = vec![item(1, "Work", "2024-01-01", None)];
    settle_fetch(Ok(fetched.clone()), &store).expect("first fetch");

    let reopened = SnapshotStore::open(temp.path()).expect("reopen");
    let items = settle_fetch(Err(anyhow::anyhow!("timed out")), &reopened).expect("fallback");
    assert_eq!(items, fetched);
}

#[test]
fn future_ongoing_item_keeps_today_in_view() {
    let items = vec![item(9, "Plans", "2025-05-01", None)];
    let layout = Layout::compute(
        &items,
        &CollapsedGroups::new(),
        day(2024, 1, 20),
        &LayoutConfig::default(),
    );

    assert_eq!(layout.range.min, day(2023, 3, 1));
    assert_eq!(layout.range.max, day(2024, 3, 31));
    assert!(layout.today_marker.is_visible());
    assert_eq!(layout.bar_count(), 0);
    assert_eq!(layout.groups[0].rows.len(), 1);
}
