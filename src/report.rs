// src/report.rs
//! Plain-text digest: rendered from a ranked report, written per day,
//! read back for delivery.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone};
use futures::stream::{self, StreamExt};
use std::fs;
use std::path::{Path, PathBuf};

use crate::rank::RankedReport;
use crate::translate::Translator;

pub const DIGEST_TITLE: &str = "US Campus News - Personalized Daily Digest";

/// Concurrent translations while building entries.
const TRANSLATE_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct DigestEntry {
    pub feed_name: String,
    pub score: f64,
    pub translated_title: String,
    pub title: String,
    pub link: String,
}

/// Translate titles while keeping report order.
pub async fn build_entries(report: &RankedReport, translator: &dyn Translator) -> Vec<DigestEntry> {
    stream::iter(report.entries())
        .map(|c| async move {
            DigestEntry {
                feed_name: c.item.feed_name.clone(),
                score: c.score,
                translated_title: translator.translate(&c.item.title).await,
                title: c.item.title.clone(),
                link: c.item.link.clone(),
            }
        })
        .buffered(TRANSLATE_CONCURRENCY)
        .collect()
        .await
}

pub fn render<Tz: TimeZone>(entries: &[DigestEntry], generated_at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut lines = vec![
        DIGEST_TITLE.to_string(),
        format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M")),
        String::new(),
        "[Personalized picks] News selected for your interests:".to_string(),
        String::new(),
    ];
    for e in entries {
        lines.push(format!(
            "- [{}] ({} pts) {}",
            e.feed_name,
            e.score.trunc() as i64,
            e.translated_title
        ));
        lines.push(format!("    EN: {}", e.title));
        lines.push(format!("    Link: {}", e.link));
        lines.push(String::new());
    }
    lines.join("\n")
}

pub fn report_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("recommendations_{}.txt", date.format("%Y-%m-%d")))
}

pub fn write_report(dir: &Path, date: NaiveDate, body: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = report_path(dir, date);
    let tmp = path.with_extension("txt.tmp");
    fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("renaming into {}", path.display()))?;
    Ok(path)
}

pub fn load_report(dir: &Path, date: NaiveDate) -> Result<String> {
    let path = report_path(dir, date);
    if !path.exists() {
        return Err(anyhow!(
            "{} not found; run `campus-digest report` first",
            path.display()
        ));
    }
    fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn render_lists_entries_in_order() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 7, 5, 0).unwrap();
        let entries = vec![
            DigestEntry {
                feed_name: "Daily Cal".into(),
                score: 87.9,
                translated_title: "T1".into(),
                title: "Title one".into(),
                link: "https://a".into(),
            },
            DigestEntry {
                feed_name: "Crimson".into(),
                score: 40.0,
                translated_title: "T2".into(),
                title: "Title two".into(),
                link: "https://b".into(),
            },
        ];
        let body = render(&entries, &at);
        assert!(body.starts_with(DIGEST_TITLE));
        assert!(body.contains("Generated: 2026-10-19 07:05"));
        let first = body.find("- [Daily Cal] (87 pts) T1").unwrap();
        let second = body.find("- [Crimson] (40 pts) T2").unwrap();
        assert!(first < second);
        assert!(body.contains("    EN: Title one\n    Link: https://a"));
    }

    #[test]
    fn write_then_load_by_date() {
        let dir = tempfile::tempdir().unwrap();
        let d = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let p = write_report(dir.path(), d, "hello").unwrap();
        assert!(p.ends_with("recommendations_2026-10-19.txt"));
        assert_eq!(load_report(dir.path(), d).unwrap(), "hello");
        let other = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        assert!(load_report(dir.path(), other).is_err());
    }
}
