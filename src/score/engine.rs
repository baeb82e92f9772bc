// src/score/engine.rs
//! Bounded fan-out of scorer calls.
//!
//! At most `concurrency_limit` calls are in flight. Each finished call writes
//! into the slot of its input index, so `scores[i]` always belongs to
//! `items[i]` whatever order the calls complete in.

use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use super::{clamp_score, DynScorer, MIN_SCORE};
use crate::ingest::types::Item;

pub const DEFAULT_CONCURRENCY_LIMIT: usize = 30;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("score_calls_total", "Scorer invocations.");
        describe_counter!("score_timeouts_total", "Scorer calls cut off by the per-call timeout.");
        describe_counter!("score_errors_total", "Scorer calls that failed and fell back to 0.");
        describe_counter!("score_unparseable_total", "Scorer replies without a number.");
        describe_histogram!("score_call_ms", "Scorer call latency in milliseconds.");
    });
}

pub struct ScoringEngine {
    scorer: DynScorer,
    concurrency_limit: usize,
    call_timeout: Duration,
}

impl ScoringEngine {
    /// `concurrency_limit` must be positive.
    pub fn new(scorer: DynScorer, concurrency_limit: usize, call_timeout: Duration) -> Result<Self> {
        if concurrency_limit == 0 {
            bail!("concurrency_limit must be > 0");
        }
        Ok(Self {
            scorer,
            concurrency_limit,
            call_timeout,
        })
    }

    /// Score every item exactly once. A call that exceeds the timeout scores 0.
    pub async fn score_all(&self, items: &[Item], profile: &str) -> Vec<f64> {
        ensure_metrics_described();
        if items.is_empty() {
            return Vec::new();
        }

        info!(
            target: "score",
            candidates = items.len(),
            concurrency_limit = self.concurrency_limit,
            "scoring candidates"
        );

        let scorer = &*self.scorer;
        let call_timeout = self.call_timeout;
        let mut slots: Vec<Option<f64>> = vec![None; items.len()];

        let mut results = stream::iter(items.iter().enumerate())
            .map(|(idx, item)| async move {
                let t0 = Instant::now();
                let score = match tokio::time::timeout(call_timeout, scorer.score(profile, item)).await {
                    Ok(raw) => clamp_score(raw),
                    Err(_) => {
                        counter!("score_timeouts_total").increment(1);
                        warn!(target: "score", link = %item.link, timeout_ms = u64::try_from(call_timeout.as_millis()).unwrap_or(u64::MAX), "scoring call timed out");
                        MIN_SCORE
                    }
                };
                histogram!("score_call_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
                (idx, score)
            })
            .buffer_unordered(self.concurrency_limit);

        while let Some((idx, score)) = results.next().await {
            counter!("score_calls_total").increment(1);
            slots[idx] = Some(score);
        }

        slots
            .into_iter()
            .map(|s| s.unwrap_or(MIN_SCORE))
            .collect()
    }
}
