use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use timeline_shared::TimelineItem;
use tracing::debug;

use crate::datetime::parse_day;

/// Per-group collapsed flags. Owned by whoever presents the chart; the layout
/// pass only reads it. A missing key means expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollapsedGroups(BTreeMap<String, bool>);

impl CollapsedGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collapsed(&self, group: &str) -> bool {
        self.0.get(group).copied().unwrap_or(false)
    }

    /// Flips the flag for `group` and returns the new state.
    pub fn toggle_group(&mut self, group: &str) -> bool {
        let entry = self.0.entry(group.to_string()).or_insert(false);
        *entry = !*entry;
        debug!(group, collapsed = *entry, "toggled group");
        *entry
    }
}

impl<S: Into<String>> FromIterator<S> for CollapsedGroups {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(|name| (name.into(), true)).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupBucket {
    pub group_name: String,
    pub items: Vec<TimelineItem>,
}

impl GroupBucket {
    pub fn visible_items(&self, collapsed: &CollapsedGroups) -> &[TimelineItem] {
        if collapsed.is_collapsed(&self.group_name) {
            &[]
        } else {
            &self.items
        }
    }
}

/// Buckets `items` by group name (ascending), each bucket ordered by start
/// date. Equal starts keep their input order; undated items go last.
#[tracing::instrument(skip(items), fields(items = items.len()))]
pub fn group_items(items: &[TimelineItem]) -> Vec<GroupBucket> {
    let mut sorted: Vec<&TimelineItem> = items.iter().collect();
    sorted.sort_by_key(|item| start_sort_key(item));

    let mut grouped: BTreeMap<&str, Vec<TimelineItem>> = BTreeMap::new();
    for item in sorted {
        grouped
            .entry(item.group.as_str())
            .or_default()
            .push(item.clone());
    }

    grouped
        .into_iter()
        .map(|(name, items)| GroupBucket {
            group_name: name.to_string(),
            items,
        })
        .collect()
}

fn start_sort_key(item: &TimelineItem) -> (bool, Option<NaiveDate>) {
    let start = parse_day(&item.start_date);
    (start.is_none(), start)
}
