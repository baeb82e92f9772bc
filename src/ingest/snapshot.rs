// src/ingest/snapshot.rs
//! Daily raw batch files: `news_YYYY-MM-DD.json` under the raw data dir.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::Item;

pub fn snapshot_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("news_{}.json", date.format("%Y-%m-%d")))
}

/// Write the batch for `date`, replacing any earlier snapshot of that day.
pub fn write_snapshot(dir: &Path, date: NaiveDate, items: &[Item]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = snapshot_path(dir, date);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(items).context("serializing raw batch")?;
    fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("renaming into {}", path.display()))?;
    Ok(path)
}

/// Load today's snapshot, or the most recently modified one if today's is missing.
pub fn load_latest(dir: &Path, today: NaiveDate) -> Result<(PathBuf, Vec<Item>)> {
    let today_path = snapshot_path(dir, today);
    if today_path.exists() {
        tracing::info!(target: "ingest", path = %today_path.display(), "reading today's snapshot");
        let items = read_snapshot(&today_path)?;
        return Ok((today_path, items));
    }

    let latest = fs::read_dir(dir)
        .ok()
        .into_iter()
        .flatten()
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("news_") && n.ends_with(".json"))
        })
        .filter_map(|p| {
            let mtime = fs::metadata(&p).and_then(|m| m.modified()).ok()?;
            Some((mtime, p))
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, p)| p)
        .ok_or_else(|| {
            anyhow!(
                "no news_*.json snapshot in {}; run `campus-digest fetch` first",
                dir.display()
            )
        })?;

    tracing::warn!(target: "ingest", path = %latest.display(), "today's snapshot missing, using latest");
    let items = read_snapshot(&latest)?;
    Ok((latest, items))
}

fn read_snapshot(path: &Path) -> Result<Vec<Item>> {
    let s = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parsing {}", path.display()))
}
