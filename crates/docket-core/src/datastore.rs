use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::item::CalendarItem;

#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub schedule_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let schedule_path = data_dir.join("schedule.data");
        if !schedule_path.exists() {
            fs::write(&schedule_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            schedule = %schedule_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            schedule_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> anyhow::Result<Vec<CalendarItem>> {
        load_jsonl(&self.schedule_path).context("failed to load schedule.data")
    }

    #[tracing::instrument(skip(self, items))]
    pub fn save(&self, items: &[CalendarItem]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.schedule_path, items).context("failed to save schedule.data")
    }

    #[tracing::instrument(skip(self, items, item), fields(id = %item.id))]
    pub fn add_item(
        &self,
        mut items: Vec<CalendarItem>,
        item: CalendarItem,
    ) -> anyhow::Result<Vec<CalendarItem>> {
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(anyhow!("duplicate item id: {}", item.id));
        }
        items.push(item);
        items.sort_by_key(|entry| entry.start);
        self.save(&items)?;
        Ok(items)
    }

    /// Merge a freshly ingested batch into the store, matching on item
    /// id. Returns (added, updated).
    #[tracing::instrument(skip(self, incoming))]
    pub fn upsert_items(&self, incoming: Vec<CalendarItem>) -> anyhow::Result<(u64, u64)> {
        let mut items = self.load()?;
        let mut added = 0_u64;
        let mut updated = 0_u64;

        for item in incoming {
            match items.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => {
                    *existing = item;
                    updated += 1;
                }
                None => {
                    items.push(item);
                    added += 1;
                }
            }
        }

        items.sort_by_key(|entry| entry.start);
        self.save(&items)?;

        debug!(added, updated, total = items.len(), "upserted schedule items");
        Ok((added, updated))
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<CalendarItem>> {
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

        let item: CalendarItem = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(item);
    }

    debug!(count = out.len(), "loaded schedule items from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, items))]
fn save_jsonl_atomic(path: &Path, items: &[CalendarItem]) -> anyhow::Result<()> {
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
