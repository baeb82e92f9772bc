// tests/chat_scorer.rs
use std::sync::Arc;

use campus_digest::llm::FixedReplyClient;
use campus_digest::{ChatScorer, Item, RelevanceScorer};

fn scorer(reply: Result<&str, &str>) -> ChatScorer {
    ChatScorer::new(Arc::new(FixedReplyClient {
        reply: reply.map(str::to_string).map_err(str::to_string),
    }))
}

fn story() -> Item {
    Item {
        link: "https://news.example.edu/tuition".into(),
        title: "Tuition freeze announced".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn replies_map_to_bounded_scores() {
    let it = story();
    let cases: &[(Result<&str, &str>, f64)] = &[
        (Ok("85"), 85.0),
        (Ok("I'd say 62/100."), 62.0),
        (Ok("150"), 100.0),
        (Ok("no idea"), 0.0),
        (Ok(""), 0.0),
        (Err("HTTP 429"), 0.0),
    ];
    for (reply, want) in cases {
        let got = scorer(*reply).score("first-year, cares about costs", &it).await;
        assert_eq!(got, *want, "reply {reply:?}");
    }
}
