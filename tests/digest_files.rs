// tests/digest_files.rs
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use campus_digest::ingest::snapshot::{load_latest, snapshot_path, write_snapshot};
use campus_digest::llm::FixedReplyClient;
use campus_digest::report::{build_entries, render};
use campus_digest::translate::ChatTranslator;
use campus_digest::{rank, Item};
use chrono::{NaiveDate, TimeZone, Utc};

fn item(link: &str, title: &str) -> Item {
    Item {
        link: link.into(),
        title: title.into(),
        feed_name: "Daily".into(),
        fetched_at: "2026-10-19T06:00:00+00:00".into(),
        ..Default::default()
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
}

#[test]
fn todays_snapshot_wins_over_newer_files() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), day(19), &[item("https://a", "today")]).unwrap();
    std::thread::sleep(Duration::from_millis(20));
    write_snapshot(dir.path(), day(18), &[item("https://b", "older day, newer mtime")]).unwrap();

    let (path, items) = load_latest(dir.path(), day(19)).unwrap();
    assert_eq!(path, snapshot_path(dir.path(), day(19)));
    assert_eq!(items[0].title, "today");
}

#[test]
fn falls_back_to_most_recent_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), day(16), &[item("https://old", "old")]).unwrap();
    std::thread::sleep(Duration::from_millis(20));
    write_snapshot(dir.path(), day(17), &[item("https://new", "new")]).unwrap();
    fs::write(dir.path().join("notes.json"), "[]").unwrap();

    let (path, items) = load_latest(dir.path(), day(19)).unwrap();
    assert!(path.ends_with("news_2026-10-17.json"));
    assert_eq!(items, vec![item("https://new", "new")]);
}

#[test]
fn no_snapshot_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_latest(dir.path(), day(19)).is_err());
    assert!(load_latest(&dir.path().join("missing"), day(19)).is_err());
}

#[tokio::test]
async fn digest_keeps_rank_order_with_translated_titles() {
    let ranked = rank(
        vec![item("https://a", "Low"), item("https://b", "High")],
        &[12.0, 91.5],
        5,
    )
    .unwrap();
    let translator = ChatTranslator::new(
        Some(Arc::new(FixedReplyClient {
            reply: Ok("已翻译".into()),
        })),
        "Simplified Chinese",
    );

    let entries = build_entries(&ranked, &translator).await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].link, "https://b");
    assert_eq!(entries[0].translated_title, "已翻译");
    assert_eq!(entries[0].title, "High");

    let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
    let body = render(&entries, &at);
    let hi = body.find("(91 pts)").unwrap();
    let lo = body.find("(12 pts)").unwrap();
    assert!(hi < lo);
    assert!(body.contains("    EN: High\n    Link: https://b"));
}
