//! # Candidate selection
//! Pure filters between the raw batch and the scorer: novelty against the
//! seen set, recency window, newest-first cap.
//!
//! Every stage maps an empty input to an empty output.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use std::cmp::Reverse;
use tracing::info;

use crate::ingest::types::Item;
use crate::seen::SeenSet;

/// Parse a feed timestamp. Accepts RFC 3339, RFC 2822 and naive UTC forms.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

/// `published` when parseable, else `fetched_at`.
pub fn effective_timestamp(item: &Item) -> Option<DateTime<Utc>> {
    item.published
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| parse_timestamp(&item.fetched_at))
}

/// Drop items whose link was already delivered. Items without a link are kept.
pub fn filter_unseen(items: Vec<Item>, seen: &SeenSet) -> Vec<Item> {
    if seen.is_empty() {
        info!(target: "select", total = items.len(), "no history yet, keeping all items");
        return items;
    }
    let total = items.len();
    let fresh: Vec<Item> = items
        .into_iter()
        .filter(|it| it.link.is_empty() || !seen.contains(&it.link))
        .collect();
    info!(
        target: "select",
        total,
        already_sent = total - fresh.len(),
        kept = fresh.len(),
        "filtered delivered links"
    );
    fresh
}

/// Keep items whose effective timestamp is no older than `window_days` before `now`.
/// A window reaching past the representable range keeps every dated item.
pub fn select_window(items: Vec<Item>, window_days: u32, now: DateTime<Utc>) -> Vec<Item> {
    let cutoff = Duration::try_days(i64::from(window_days)).and_then(|d| now.checked_sub_signed(d));
    items
        .into_iter()
        .filter(|it| {
            effective_timestamp(it).is_some_and(|ts| cutoff.map_or(true, |c| ts >= c))
        })
        .collect()
}

/// Newest first (undated items last, input order kept among equals), at most `max_candidates`.
pub fn select_candidates(mut items: Vec<Item>, max_candidates: usize) -> Vec<Item> {
    items.sort_by_cached_key(|it| Reverse(effective_timestamp(it)));
    items.truncate(max_candidates);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(link: &str, published: Option<&str>, fetched_at: &str) -> Item {
        Item {
            link: link.into(),
            title: link.to_uppercase(),
            published: published.map(str::to_string),
            fetched_at: fetched_at.into(),
            ..Default::default()
        }
    }

    #[test]
    fn parses_common_feed_formats() {
        let want = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2026-10-18T09:30:00Z"), Some(want));
        assert_eq!(parse_timestamp("Sun, 18 Oct 2026 09:30:00 +0000"), Some(want));
        assert_eq!(parse_timestamp("2026-10-18 09:30:00"), Some(want));
        assert_eq!(
            parse_timestamp("2026-10-18"),
            Some(Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday-ish"), None);
        assert_eq!(parse_timestamp("  "), None);
    }

    #[test]
    fn unparseable_published_falls_back_to_fetched_at() {
        let it = item("a", Some("garbage"), "2026-10-18T00:00:00Z");
        assert_eq!(
            effective_timestamp(&it),
            Some(Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn window_excludes_old_and_undated() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let items = vec![
            item("fresh", Some("2026-10-19T08:00:00Z"), ""),
            item("edge", Some("2026-10-18T12:00:00Z"), ""),
            item("old", Some("2026-10-10T08:00:00Z"), "2026-10-19T08:00:00Z"),
            item("undated", Some("??"), "??"),
            item("fetched_only", None, "2026-10-19T11:00:00Z"),
        ];
        let kept: Vec<_> = select_window(items, 1, now)
            .into_iter()
            .map(|i| i.link)
            .collect();
        assert_eq!(kept, vec!["fresh", "edge", "fetched_only"]);
    }

    #[test]
    fn huge_window_keeps_every_dated_item() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let items = vec![
            item("ancient", Some("1970-01-01T00:00:00Z"), ""),
            item("fresh", Some("2026-10-19T08:00:00Z"), ""),
            item("undated", None, "??"),
        ];
        for days in [1_000_000_000, u32::MAX] {
            let kept: Vec<_> = select_window(items.clone(), days, now)
                .into_iter()
                .map(|i| i.link)
                .collect();
            assert_eq!(kept, vec!["ancient", "fresh"]);
        }
    }

    #[test]
    fn candidates_sorted_newest_first_with_undated_last() {
        let items = vec![
            item("undated", None, "nope"),
            item("mid", Some("2026-10-18T00:00:00Z"), ""),
            item("new", Some("2026-10-19T00:00:00Z"), ""),
            item("mid2", Some("2026-10-18T00:00:00Z"), ""),
        ];
        let out: Vec<_> = select_candidates(items, 10)
            .into_iter()
            .map(|i| i.link)
            .collect();
        assert_eq!(out, vec!["new", "mid", "mid2", "undated"]);
    }

    #[test]
    fn empty_inputs_stay_empty() {
        let now = Utc::now();
        let seen: SeenSet = ["x"].into_iter().collect();
        assert!(filter_unseen(vec![], &seen).is_empty());
        assert!(select_window(vec![], 3, now).is_empty());
        assert!(select_candidates(vec![], 3).is_empty());
    }
}
