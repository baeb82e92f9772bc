use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;

use crate::ingest::normalize_text;
use crate::ingest::types::{FeedProvider, FeedSource, Item};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    summary: Option<String>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl AtomEntry {
    fn alternate_link(&self) -> Option<String> {
        self.link
            .iter()
            .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
            .or_else(|| self.link.first())
            .and_then(|l| l.href.clone())
    }
}

/// RSS 2.0 / Atom provider for one configured feed.
pub struct RssProvider {
    source: FeedSource,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl RssProvider {
    /// Parse a fixed XML document instead of hitting the network.
    pub fn from_fixture(source: FeedSource, xml: &str) -> Self {
        Self {
            source,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_source(source: FeedSource, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("campus-digest/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            source,
            mode: Mode::Http { client },
        })
    }

    /// Parse a feed body, stamping every item with `fetched_at`.
    pub fn parse_items(&self, xml: &str, fetched_at: &str) -> Result<Vec<Item>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(xml);

        let out = match from_str::<Rss>(&xml_clean) {
            Ok(rss) => rss
                .channel
                .item
                .into_iter()
                .filter_map(|it| {
                    self.build_item(it.title, it.link, it.description, it.pub_date, fetched_at)
                })
                .collect::<Vec<_>>(),
            Err(rss_err) => {
                let atom: AtomFeed = from_str(&xml_clean).map_err(|atom_err| {
                    anyhow!("feed {} is neither RSS ({rss_err}) nor Atom ({atom_err})", self.source.id)
                })?;
                atom.entry
                    .into_iter()
                    .filter_map(|e| {
                        let link = e.alternate_link();
                        let published = e.published.or(e.updated);
                        self.build_item(e.title, link, e.summary, published, fetched_at)
                    })
                    .collect()
            }
        };

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        counter!("ingest_items_total").increment(out.len() as u64);
        Ok(out)
    }

    fn build_item(
        &self,
        title: Option<String>,
        link: Option<String>,
        summary: Option<String>,
        published: Option<String>,
        fetched_at: &str,
    ) -> Option<Item> {
        let title = normalize_text(title.as_deref().unwrap_or_default());
        let summary = normalize_text(summary.as_deref().unwrap_or_default());
        if title.is_empty() && summary.is_empty() {
            return None;
        }
        Some(Item {
            link: link.map(|l| l.trim().to_string()).unwrap_or_default(),
            title,
            summary,
            feed_id: self.source.id.clone(),
            feed_name: self.source.name.clone(),
            tags: self.source.tags.clone(),
            published: published
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            fetched_at: fetched_at.to_string(),
        })
    }
}

#[async_trait]
impl FeedProvider for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<Item>> {
        let fetched_at = chrono::Utc::now().to_rfc3339();
        match &self.mode {
            Mode::Fixture(s) => self.parse_items(s, &fetched_at),
            Mode::Http { client } => {
                let body = client
                    .get(&self.source.url)
                    .send()
                    .await
                    .with_context(|| format!("GET {}", self.source.url))?
                    .error_for_status()
                    .with_context(|| format!("{} non-2xx", self.source.url))?
                    .text()
                    .await
                    .context("feed http .text()")?;
                self.parse_items(&body, &fetched_at)
            }
        }
    }

    fn name(&self) -> &str {
        &self.source.name
    }
}

/// HTML entities that are not valid XML but show up in real feeds.
const HTML_ONLY_ENTITIES: [(&str, &str); 8] = [
    ("&nbsp;", " "),
    ("&ndash;", "-"),
    ("&mdash;", "-"),
    ("&ldquo;", "\""),
    ("&rdquo;", "\""),
    ("&lsquo;", "'"),
    ("&rsquo;", "'"),
    ("&hellip;", "..."),
];

fn scrub_html_entities_for_xml(s: &str) -> String {
    HTML_ONLY_ENTITIES
        .iter()
        .fold(s.to_string(), |acc, (from, to)| acc.replace(from, to))
}
