// src/score/mod.rs
//! Interest scoring: one item against the reader profile, 0..=100.
//!
//! A scorer never fails. Transport errors, bad replies and replies without a
//! number all collapse to `0.0` for that item only.

pub mod engine;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::warn;

use crate::ingest::types::Item;
use crate::llm::{ChatRequest, DynChatClient};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

const SYSTEM_PROMPT: &str =
    "You are a recommendation system that only returns a numeric score. Do not explain.";

/// Capability injected into the scoring engine.
pub trait RelevanceScorer: Send + Sync {
    fn score<'a>(
        &'a self,
        profile: &'a str,
        item: &'a Item,
    ) -> Pin<Box<dyn Future<Output = f64> + Send + 'a>>;
}

pub type DynScorer = Arc<dyn RelevanceScorer>;

/// Clamp into [0, 100]; NaN becomes 0.
pub fn clamp_score(raw: f64) -> f64 {
    if raw.is_nan() {
        MIN_SCORE
    } else {
        raw.clamp(MIN_SCORE, MAX_SCORE)
    }
}

/// First integral number in the reply ("85/100" -> 85), clamped.
pub fn parse_score(reply: &str) -> Option<f64> {
    static RE_DIGITS: OnceCell<Regex> = OnceCell::new();
    let re = RE_DIGITS.get_or_init(|| Regex::new(r"\d+").unwrap());
    let token = re.find(reply)?.as_str();
    // very long digit runs overflow u64 but are still "above 100"
    let value = token.parse::<f64>().ok()?;
    Some(clamp_score(value))
}

/// Summary when it has content, else the title.
pub fn content_snippet(item: &Item) -> &str {
    if item.summary.trim().is_empty() {
        &item.title
    } else {
        &item.summary
    }
}

pub fn build_prompt(profile: &str, item: &Item) -> String {
    format!(
        "You are a personalized news recommendation assistant. Score strictly as follows.\n\
         \n\
         [Reader profile]\n\
         {profile}\n\
         \n\
         [News item]\n\
         - Source: {feed}\n\
         - Title: {title}\n\
         - Summary: {snippet}\n\
         - Link: {link}\n\
         \n\
         Task: based on the reader profile and the gist of this item, estimate how \
         interested the reader would be and give a score from 0 to 100:\n\
         - 0: not interested at all\n\
         - 50: so-so, might skim it\n\
         - 80 or more: very interested, strongly recommend\n\
         \n\
         IMPORTANT: reply with a single integer between 0 and 100 and nothing else.",
        feed = item.feed_name,
        title = item.title,
        snippet = content_snippet(item),
        link = item.link,
    )
}

/// LLM-backed scorer.
pub struct ChatScorer {
    client: DynChatClient,
}

impl ChatScorer {
    pub fn new(client: DynChatClient) -> Self {
        Self { client }
    }

    async fn score_impl(&self, profile: &str, item: &Item) -> f64 {
        let prompt = build_prompt(profile, item);
        let req = ChatRequest {
            system: SYSTEM_PROMPT,
            user: &prompt,
            temperature: 0.2,
        };
        match self.client.complete(req).await {
            Ok(reply) => match parse_score(&reply) {
                Some(score) => score,
                None => {
                    counter!("score_unparseable_total").increment(1);
                    warn!(target: "score", link = %item.link, reply_len = reply.len(), "no number in scorer reply");
                    MIN_SCORE
                }
            },
            Err(e) => {
                counter!("score_errors_total").increment(1);
                warn!(target: "score", link = %item.link, provider = self.client.provider_name(), error = %e, "scoring call failed");
                MIN_SCORE
            }
        }
    }
}

impl RelevanceScorer for ChatScorer {
    fn score<'a>(
        &'a self,
        profile: &'a str,
        item: &'a Item,
    ) -> Pin<Box<dyn Future<Output = f64> + Send + 'a>> {
        Box::pin(self.score_impl(profile, item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_takes_first_integer_and_clamps() {
        assert_eq!(parse_score("85"), Some(85.0));
        assert_eq!(parse_score("Score: 85/100"), Some(85.0));
        assert_eq!(parse_score("about 72.9"), Some(72.0));
        assert_eq!(parse_score("250"), Some(100.0));
        assert_eq!(parse_score("-40"), Some(40.0));
        assert_eq!(parse_score("99999999999999999999999999"), Some(100.0));
        assert_eq!(parse_score("not sure"), None);
        assert_eq!(parse_score(""), None);
    }

    #[test]
    fn clamp_handles_nan_and_bounds() {
        assert_eq!(clamp_score(f64::NAN), 0.0);
        assert_eq!(clamp_score(-3.0), 0.0);
        assert_eq!(clamp_score(101.0), 100.0);
        assert_eq!(clamp_score(42.5), 42.5);
    }

    #[test]
    fn snippet_prefers_non_blank_summary() {
        let mut it = Item {
            title: "Title".into(),
            summary: "   ".into(),
            ..Default::default()
        };
        assert_eq!(content_snippet(&it), "Title");
        it.summary = "Body".into();
        assert_eq!(content_snippet(&it), "Body");
        let prompt = build_prompt("likes robotics", &it);
        assert!(prompt.contains("likes robotics"));
        assert!(prompt.contains("- Summary: Body"));
    }
}
