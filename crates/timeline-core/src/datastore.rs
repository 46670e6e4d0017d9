use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use timeline_shared::TimelineItem;
use tracing::{debug, info};

/// Last successfully fetched item list, kept so the chart can still be drawn
/// when the API is unreachable.
#[derive(Debug)]
pub struct SnapshotStore {
    pub data_dir: PathBuf,
    pub items_path: PathBuf,
}

impl SnapshotStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let items_path = data_dir.join("items.data");

        info!(
            data_dir = %data_dir.display(),
            items = %items_path.display(),
            "opened snapshot store"
        );

        Ok(Self {
            data_dir,
            items_path,
        })
    }

    /// `None` when no snapshot has been saved yet.
    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> anyhow::Result<Option<Vec<TimelineItem>>> {
        if !self.items_path.exists() {
            debug!(file = %self.items_path.display(), "no snapshot yet");
            return Ok(None);
        }
        load_jsonl(&self.items_path)
            .map(Some)
            .context("failed to load items.data")
    }

    #[tracing::instrument(skip(self, items), fields(count = items.len()))]
    pub fn save(&self, items: &[TimelineItem]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.items_path, items).context("failed to save items.data")
    }
}

/// Reads a JSON array of items in wire format, e.g. an export of
/// `GET /api/v1/timeline`.
#[tracing::instrument]
pub fn load_items_file(path: &Path) -> anyhow::Result<Vec<TimelineItem>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    let items: Vec<TimelineItem> = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing {} as a JSON item array", path.display()))?;
    debug!(count = items.len(), "loaded items from file");
    Ok(items)
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<TimelineItem>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let item: TimelineItem = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(item);
    }

    debug!(count = out.len(), "loaded items from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, items))]
fn save_jsonl_atomic(path: &Path, items: &[TimelineItem]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = items.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for item in items {
        let serialized = serde_json::to_string(item)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
