use std::path::PathBuf;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::Serialize;
use timeline_shared::{NewTimelineItem, TimelineItem};
use tracing::{debug, info, instrument, warn};

use crate::cli::{AddArgs, Command, LayoutArgs, ListArgs, ShowArgs};
use crate::client::ApiClient;
use crate::config::Config;
use crate::datastore::{SnapshotStore, load_items_file};
use crate::datetime::{DAY_FORMAT, format_period, parse_date_expr};
use crate::layout::groups::CollapsedGroups;
use crate::layout::scroll::ScrollController;
use crate::layout::{Layout, LayoutConfig};
use crate::render::Renderer;

/// Where the item list for a view comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemSource {
    /// Fetch from the API, refresh the snapshot, fall back to it on failure.
    Api,
    /// Last saved snapshot only.
    Offline,
    File(PathBuf),
}

#[derive(Debug)]
pub struct Session<'a> {
    pub cfg: &'a Config,
    pub store: &'a SnapshotStore,
    pub renderer: &'a Renderer,
    pub source: ItemSource,
    pub today: NaiveDate,
}

#[instrument(skip(session, command), fields(today = %session.today))]
pub async fn dispatch(session: &Session<'_>, command: Command) -> anyhow::Result<()> {
    debug!(?command, source = ?session.source, "dispatching command");

    match command {
        Command::Show(args) => cmd_show(session, args).await,
        Command::List(args) => cmd_list(session, args).await,
        Command::Layout(args) => cmd_layout(session, args).await,
        Command::Add(args) => cmd_add(session, args).await,
    }
}

async fn cmd_show(session: &Session<'_>, args: ShowArgs) -> anyhow::Result<()> {
    info!("command show");

    let items = load_items(session).await?;
    let collapsed = collapsed_groups(&args.collapse, &args.toggle);
    let layout = compute_layout(session, &items, &collapsed)?;

    if layout.groups.is_empty() {
        println!("No timeline items.");
    }
    session.renderer.print_chart(&layout, args.width)
}

async fn cmd_list(session: &Session<'_>, args: ListArgs) -> anyhow::Result<()> {
    info!("command list");

    let items = load_items(session).await?;
    let collapsed = collapsed_groups(&args.collapse, &[]);
    let layout = compute_layout(session, &items, &collapsed)?;

    if layout.groups.is_empty() {
        println!("No timeline items.");
        return Ok(());
    }
    session.renderer.print_item_table(&layout)
}

async fn cmd_layout(session: &Session<'_>, args: LayoutArgs) -> anyhow::Result<()> {
    info!("command layout");

    let items = load_items(session).await?;
    let collapsed = collapsed_groups(&args.collapse, &[]);
    let layout = compute_layout(session, &items, &collapsed)?;
    println!("{}", layout_json(&layout, args.viewport, args.pretty)?);
    Ok(())
}

async fn cmd_add(session: &Session<'_>, args: AddArgs) -> anyhow::Result<()> {
    info!("command add");

    let default_group = session
        .cfg
        .get("add.group")
        .unwrap_or_else(|| "Professions".to_string());
    let group = args.group.unwrap_or(default_group);
    let new_item = build_new_item(
        &args.name,
        &group,
        &args.start,
        args.end.as_deref(),
        session.today,
    )?;

    let client = ApiClient::from_config(session.cfg)?;
    let created = client.create_item(&new_item).await?;
    println!(
        "Added item {}: {} [{}] {}",
        created.id,
        created.name,
        created.group,
        format_period(&created.start_date, created.end_date.as_deref())
    );

    match client.fetch_items().await {
        Ok(items) => session.store.save(&items)?,
        Err(err) => warn!(error = %format!("{err:#}"), "could not refresh snapshot after add"),
    }
    Ok(())
}

fn compute_layout(
    session: &Session<'_>,
    items: &[TimelineItem],
    collapsed: &CollapsedGroups,
) -> anyhow::Result<Layout> {
    let layout_cfg = LayoutConfig::from_config(session.cfg)?;
    Ok(Layout::compute(items, collapsed, session.today, &layout_cfg))
}

#[instrument(skip(session), fields(source = ?session.source))]
async fn load_items(session: &Session<'_>) -> anyhow::Result<Vec<TimelineItem>> {
    match &session.source {
        ItemSource::File(path) => load_items_file(path),
        ItemSource::Offline => session
            .store
            .load()?
            .ok_or_else(|| anyhow!("no offline snapshot yet; run once with the API reachable")),
        ItemSource::Api => {
            let fetched = match ApiClient::from_config(session.cfg) {
                Ok(client) => client.fetch_items().await,
                Err(err) => Err(err),
            };
            settle_fetch(fetched, session.store)
        }
    }
}

/// Saves a successful fetch as the new snapshot. A failed fetch falls back to
/// the previous snapshot when there is one.
pub fn settle_fetch(
    fetched: anyhow::Result<Vec<TimelineItem>>,
    store: &SnapshotStore,
) -> anyhow::Result<Vec<TimelineItem>> {
    match fetched {
        Ok(items) => {
            store.save(&items)?;
            Ok(items)
        }
        Err(err) => match store.load()? {
            Some(items) => {
                warn!(
                    error = %format!("{err:#}"),
                    count = items.len(),
                    "API unavailable; showing last snapshot"
                );
                Ok(items)
            }
            None => Err(err.context("failed to load timeline items and no snapshot is saved")),
        },
    }
}

/// `--collapse` names start collapsed, then each `--toggle` flips one group.
pub fn collapsed_groups(collapse: &[String], toggle: &[String]) -> CollapsedGroups {
    let mut collapsed: CollapsedGroups = collapse.iter().cloned().collect();
    for group in toggle {
        collapsed.toggle_group(group);
    }
    collapsed
}

#[derive(Debug, Serialize)]
struct LayoutReport<'a> {
    #[serde(flatten)]
    layout: &'a Layout,
    total_width: f64,
    /// Initial horizontal scroll that centers the today line.
    scroll_left: Option<f64>,
}

pub fn layout_json(layout: &Layout, viewport: Option<f64>, pretty: bool) -> anyhow::Result<String> {
    let scroll_left = viewport.and_then(|width| {
        ScrollController::new(width, layout.total_width()).scroll_to_today(&layout.today_marker)
    });
    let report = LayoutReport {
        layout,
        total_width: layout.total_width(),
        scroll_left,
    };

    let json = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    json.context("failed to serialize layout")
}

/// Validates add-item input and normalizes dates to `YYYY-MM-DD`.
pub fn build_new_item(
    name: &str,
    group: &str,
    start: &str,
    end: Option<&str>,
    today: NaiveDate,
) -> anyhow::Result<NewTimelineItem> {
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("name is required"));
    }
    let group = group.trim();
    if group.is_empty() {
        return Err(anyhow!("group is required"));
    }
    if start.trim().is_empty() {
        return Err(anyhow!("start date is required"));
    }

    let start_day =
        parse_date_expr(start, today).with_context(|| format!("invalid start date: {start}"))?;
    let end_day = end
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_date_expr(raw, today).with_context(|| format!("invalid end date: {raw}")))
        .transpose()?;

    if let Some(end_day) = end_day
        && end_day < start_day
    {
        return Err(anyhow!(
            "end date {end_day} is before start date {start_day}"
        ));
    }

    Ok(NewTimelineItem {
        group: group.to_string(),
        name: name.to_string(),
        start_date: start_day.format(DAY_FORMAT).to_string(),
        end_date: end_day.map(|day| day.format(DAY_FORMAT).to_string()),
    })
}
