// src/ingest/mod.rs
pub mod providers;
pub mod snapshot;
pub mod types;

use crate::ingest::types::{FeedProvider, Item};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashSet;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_metrics);
}

fn describe_metrics() {
    describe_counter!("ingest_items_total", "Total items parsed from feeds.");
    describe_counter!("ingest_kept_total", "Items kept after link deduplication.");
    describe_counter!(
        "ingest_duplicate_links_total",
        "Items dropped because the same link appeared earlier in the batch."
    );
    describe_counter!("ingest_feed_errors_total", "Feed fetch/parse errors.");
    describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
    describe_gauge!("ingest_last_run_ts", "Unix time of the last completed fetch.");
}

/// Longest text kept per field; summaries only feed the scoring prompt.
pub const MAX_TEXT_CHARS: usize = 2000;

/// Plain text from feed markup: entities decoded, tags dropped, typographic
/// quotes folded to ASCII, whitespace collapsed, capped at [`MAX_TEXT_CHARS`].
pub fn normalize_text(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)<[^>]*>").unwrap());
    let ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());

    let decoded = html_escape::decode_html_entities(s);
    let untagged = tags.replace_all(&decoded, " ");
    let folded: String = untagged
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{00AB}' | '\u{00BB}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            c => c,
        })
        .collect();
    ws.replace_all(folded.trim(), " ")
        .chars()
        .take(MAX_TEXT_CHARS)
        .collect()
}

/// Drop repeated links within one batch, keeping the first occurrence.
/// Items without a link are always kept.
pub fn dedup_links(items: Vec<Item>) -> (Vec<Item>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut keep = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for it in items {
        if !it.link.is_empty() && !seen.insert(it.link.clone()) {
            dropped += 1;
            continue;
        }
        keep.push(it);
    }
    (keep, dropped)
}

/// Fetch every provider once. A failing feed is logged and skipped.
/// Returns (items, failed_feed_count).
pub async fn run_once(providers: &[Box<dyn FeedProvider>]) -> (Vec<Item>, usize) {
    ensure_metrics_described();

    let mut raw = Vec::new();
    let mut failed = 0usize;
    for p in providers {
        match p.fetch_latest().await {
            Ok(mut v) => {
                tracing::info!(target: "ingest", feed = p.name(), items = v.len(), "feed fetched");
                raw.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, feed = p.name(), "feed error");
                counter!("ingest_feed_errors_total").increment(1);
                failed += 1;
            }
        }
    }

    let (kept, dup) = dedup_links(raw);

    counter!("ingest_kept_total").increment(kept.len() as u64);
    counter!("ingest_duplicate_links_total").increment(dup as u64);
    gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

    (kept, failed)
}
