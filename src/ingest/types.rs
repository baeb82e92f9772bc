// src/ingest/types.rs
use anyhow::Result;

/// One syndicated news entry. `link` is the unique key used for history.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct Item {
    pub link: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub feed_id: String,
    #[serde(default)]
    pub feed_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Raw publication timestamp as found in the feed (RFC 2822 for RSS).
    #[serde(default)]
    pub published: Option<String>,
    /// RFC 3339 UTC timestamp of the fetch; fallback ordering key.
    #[serde(default)]
    pub fetched_at: String,
}

/// Feed definition loaded from `config/feeds.toml`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Item>>;
    fn name(&self) -> &str;
}
