// src/config/settings.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::types::FeedSource;
use crate::pipeline::Tunables;

pub const ENV_SETTINGS_PATH: &str = "CAMPUS_DIGEST_SETTINGS";
pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.toml";

fn default_days_window() -> i64 {
    1
}
fn default_max_candidates() -> i64 {
    80
}
fn default_top_n() -> i64 {
    10
}
fn default_max_workers() -> i64 {
    30
}
fn default_request_timeout_secs() -> u64 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotTopics {
    #[serde(default = "default_days_window")]
    pub days_window: i64,
}

impl Default for HotTopics {
    fn default() -> Self {
        Self {
            days_window: default_days_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Personalization {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub user_profile: String,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: i64,
    #[serde(default = "default_top_n")]
    pub top_n: i64,
    #[serde(default = "default_max_workers")]
    pub max_workers: i64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Personalization {
    fn default() -> Self {
        Self {
            enable: false,
            user_profile: String::new(),
            max_candidates: default_max_candidates(),
            top_n: default_top_n(),
            max_workers: default_max_workers(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub raw_dir: PathBuf,
    pub report_dir: PathBuf,
    pub seen_path: PathBuf,
    pub feeds_path: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            report_dir: PathBuf::from("data/reports"),
            seen_path: PathBuf::from(crate::seen::DEFAULT_SEEN_PATH),
            feeds_path: PathBuf::from("config/feeds.toml"),
        }
    }
}

fn default_translate_to() -> String {
    "Simplified Chinese".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Target language for titles; empty disables translation.
    #[serde(default = "default_translate_to")]
    pub translate_to: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            translate_to: default_translate_to(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub hot_topics: HotTopics,
    #[serde(default)]
    pub personalization: Personalization,
    #[serde(default)]
    pub report: ReportSettings,
    #[serde(default)]
    pub paths: Paths,
}

impl Settings {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: Settings = toml::from_str(s)?;
        cfg.personalization.user_profile = cfg.personalization.user_profile.trim().to_string();
        Ok(cfg)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.personalization.request_timeout_secs.max(1))
    }

    /// Validated pipeline knobs; non-positive values are an error.
    pub fn tunables(&self) -> Result<Tunables> {
        Ok(Tunables::new(
            self.hot_topics.days_window,
            self.personalization.max_candidates,
            self.personalization.top_n,
            self.personalization.max_workers,
        )?
        .with_request_timeout(self.request_timeout()))
    }
}

#[derive(Debug, Deserialize)]
struct FeedsFile {
    #[serde(default)]
    feeds: Vec<FeedSource>,
}

/// `[[feeds]]` tables with `id`, `name`, `url` and optional `tags`.
pub fn load_feeds(path: &Path) -> Result<Vec<FeedSource>> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading feeds from {}", path.display()))?;
    let parsed: FeedsFile =
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(parsed
        .feeds
        .into_iter()
        .filter(|f| !f.url.trim().is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let s = Settings::from_toml_str(
            r#"
[personalization]
enable = true
user_profile = "  CS junior, likes robotics and campus food  "
"#,
        )
        .unwrap();
        assert!(s.personalization.enable);
        assert_eq!(s.personalization.user_profile, "CS junior, likes robotics and campus food");
        assert_eq!(s.personalization.top_n, 10);
        assert_eq!(s.hot_topics.days_window, 1);
        let t = s.tunables().unwrap();
        assert_eq!(t.concurrency_limit, 30);
        assert_eq!(t.request_timeout, Duration::from_secs(20));
        assert_eq!(s.report.translate_to, "Simplified Chinese");
    }

    #[test]
    fn partial_paths_keep_other_defaults() {
        let s = Settings::from_toml_str("[paths]\nseen_path = \"state/seen.json\"\n").unwrap();
        assert_eq!(s.paths.seen_path, PathBuf::from("state/seen.json"));
        assert_eq!(s.paths.raw_dir, PathBuf::from("data/raw"));
    }

    #[test]
    fn negative_top_n_is_a_hard_error() {
        let s = Settings::from_toml_str("[personalization]\ntop_n = -1\n").unwrap();
        assert!(s.tunables().is_err());
    }

    #[test]
    fn feeds_file_parses_and_drops_blank_urls() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("feeds.toml");
        fs::write(
            &p,
            r#"
[[feeds]]
id = "crimson"
name = "The Harvard Crimson"
url = "https://www.thecrimson.com/feed/"
tags = ["ivy"]

[[feeds]]
id = "broken"
name = "Broken"
url = " "
"#,
        )
        .unwrap();
        let feeds = load_feeds(&p).unwrap();
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].tags, vec!["ivy".to_string()]);
    }
}
