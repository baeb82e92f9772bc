//! # Seen links
//! History of links already delivered to the reader, carried between daily runs.
//!
//! The set only grows. It is loaded once before a run and saved once after,
//! through a [`SeenStore`] handle so the pipeline never touches disk directly.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

pub const DEFAULT_SEEN_PATH: &str = "data/seen_links.json";

/// Monotonic set of delivered links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSet {
    links: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, link: &str) -> bool {
        self.links.contains(link)
    }

    /// Empty links are never recorded.
    pub fn insert(&mut self, link: impl Into<String>) -> bool {
        let link = link.into();
        if link.is_empty() {
            return false;
        }
        self.links.insert(link)
    }

    /// Fold links into the set; returns how many were new.
    pub fn extend<I, S>(&mut self, links: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for l in links {
            if self.insert(l) {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Links in lexicographic order (stable on-disk form).
    pub fn sorted(&self) -> Vec<&str> {
        self.links
            .iter()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for SeenSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = SeenSet::new();
        set.extend(iter);
        set
    }
}

/// Persistence boundary for [`SeenSet`].
pub trait SeenStore: Send + Sync {
    /// Never fails: missing or unreadable state means "no history".
    fn load(&self) -> SeenSet;
    /// Replace stored state with `set`.
    fn save(&self, set: &SeenSet) -> Result<()>;
}

#[derive(Serialize, Deserialize)]
struct SeenDoc<'a> {
    #[serde(borrow)]
    links: Vec<std::borrow::Cow<'a, str>>,
}

/// JSON file store: `{"links": [...]}`, sorted, written via temp file + rename.
#[derive(Debug, Clone)]
pub struct FileSeenStore {
    path: PathBuf,
}

impl FileSeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> io::Result<SeenSet> {
        let s = fs::read_to_string(&self.path)?;
        parse_seen(&s).ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "unrecognized seen-link format"))
    }
}

/// Accepts the JSON document, or one link per line behind a `link` header or
/// with every line shaped like a URI.
fn parse_seen(s: &str) -> Option<SeenSet> {
    let trimmed = s.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(doc) = serde_json::from_str::<SeenDoc>(s) {
            return Some(doc.links.into_iter().map(|l| l.into_owned()).collect());
        }
        if let Ok(list) = serde_json::from_str::<Vec<String>>(s) {
            return Some(list.into_iter().collect());
        }
        return None;
    }

    let mut lines = s
        .lines()
        .map(|l| l.trim().trim_matches('"'))
        .filter(|l| !l.is_empty())
        .peekable();
    let has_header = lines.peek().is_some_and(|first| first.eq_ignore_ascii_case("link"));
    if has_header {
        lines.next();
    }
    let links: Vec<&str> = lines.collect();
    if !has_header && !links.iter().all(|l| looks_like_link(l)) {
        return None;
    }
    Some(links.into_iter().collect())
}

fn looks_like_link(s: &str) -> bool {
    s.split_once("://").is_some_and(|(scheme, rest)| {
        !scheme.is_empty()
            && scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+.-".contains(c))
            && !rest.is_empty()
            && !rest.chars().any(|c| c.is_whitespace() || c.is_control())
    })
}

impl SeenStore for FileSeenStore {
    fn load(&self) -> SeenSet {
        match self.read() {
            Ok(set) => {
                info!(target: "seen", path = %self.path.display(), count = set.len(), "loaded seen links");
                set
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(target: "seen", path = %self.path.display(), "no seen-link file, treating as first run");
                SeenSet::new()
            }
            Err(e) => {
                warn!(target: "seen", path = %self.path.display(), error = %e, "seen-link file unreadable, treating as no history");
                SeenSet::new()
            }
        }
    }

    fn save(&self, set: &SeenSet) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let doc = SeenDoc {
            links: set.sorted().into_iter().map(std::borrow::Cow::Borrowed).collect(),
        };
        let json = serde_json::to_string_pretty(&doc).context("serializing seen links")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("renaming into {}", self.path.display()))?;
        info!(target: "seen", path = %self.path.display(), count = set.len(), "saved seen links");
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySeenStore {
    inner: Mutex<SeenSet>,
    saves: Mutex<usize>,
}

impl MemorySeenStore {
    pub fn with_links<I: IntoIterator<Item = S>, S: Into<String>>(links: I) -> Self {
        Self {
            inner: Mutex::new(links.into_iter().collect()),
            saves: Mutex::new(0),
        }
    }

    pub fn snapshot(&self) -> SeenSet {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SeenStore for MemorySeenStore {
    fn load(&self) -> SeenSet {
        self.snapshot()
    }

    fn save(&self, set: &SeenSet) -> Result<()> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = set.clone();
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
