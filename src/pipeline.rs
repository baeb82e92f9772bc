//! # Recommendation pipeline
//! One daily run: history → novelty filter → recency window → newest-first
//! cap → concurrent scoring → top-N → history update.
//!
//! Data and service problems never fail a run; they end it early with
//! [`Outcome::Skipped`] or [`Outcome::NothingToReport`]. Only bad tunables,
//! internal mismatches and an unwritable history file are errors.

use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tracing::info;

use crate::ingest::types::Item;
use crate::rank::{rank, RankedReport};
use crate::score::engine::{ScoringEngine, DEFAULT_CALL_TIMEOUT};
use crate::score::DynScorer;
use crate::seen::SeenStore;
use crate::select::{filter_unseen, select_candidates, select_window};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_runs_total", "Recommendation runs by outcome.");
        describe_gauge!("pipeline_candidates", "Candidates scored in the last run.");
        describe_gauge!("pipeline_report_size", "Items delivered in the last run.");
        describe_gauge!("pipeline_seen_links", "Size of the seen-link history after the last run.");
    });
}

/// Run knobs, all strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tunables {
    pub days_window: u32,
    pub max_candidates: usize,
    pub top_n: usize,
    pub concurrency_limit: usize,
    pub request_timeout: Duration,
}

impl Tunables {
    pub fn new(
        days_window: i64,
        max_candidates: i64,
        top_n: i64,
        concurrency_limit: i64,
    ) -> Result<Self> {
        fn positive<T: TryFrom<i64>>(name: &str, v: i64) -> Result<T> {
            if v <= 0 {
                bail!("{name} must be a positive integer, got {v}");
            }
            T::try_from(v).map_err(|_| anyhow::anyhow!("{name} is too large: {v}"))
        }
        Ok(Self {
            days_window: positive("days_window", days_window)?,
            max_candidates: positive("max_candidates", max_candidates)?,
            top_n: positive("top_n", top_n)?,
            concurrency_limit: positive("concurrency_limit", concurrency_limit)?,
            request_timeout: DEFAULT_CALL_TIMEOUT,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Ranked items; their links are already folded into history.
    Report {
        report: RankedReport,
        newly_seen: usize,
    },
    /// No new or no recent content.
    NothingToReport(String),
    /// Personalization disabled or not configured.
    Skipped(String),
}

impl Outcome {
    pub fn report(&self) -> Option<&RankedReport> {
        match self {
            Outcome::Report { report, .. } => Some(report),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Outcome::Report { .. } => "report",
            Outcome::NothingToReport(_) => "nothing_to_report",
            Outcome::Skipped(_) => "skipped",
        }
    }
}

/// Everything a run needs besides the batch.
pub struct Pipeline<'a> {
    store: &'a dyn SeenStore,
    scorer: Option<DynScorer>,
    tunables: Tunables,
    enabled: bool,
}

impl<'a> Pipeline<'a> {
    /// `scorer == None` means no credentials: the run is skipped, not failed.
    pub fn new(store: &'a dyn SeenStore, scorer: Option<DynScorer>, tunables: Tunables) -> Self {
        Self {
            store,
            scorer,
            tunables,
            enabled: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub async fn run(&self, items: Vec<Item>, profile: &str, now: DateTime<Utc>) -> Result<Outcome> {
        ensure_metrics_described();
        let outcome = self.run_inner(items, profile, now).await?;
        counter!("pipeline_runs_total", "outcome" => outcome.label()).increment(1);
        match &outcome {
            Outcome::Report { report, newly_seen } => {
                info!(target: "pipeline", delivered = report.len(), newly_seen, "report ready")
            }
            Outcome::NothingToReport(why) => info!(target: "pipeline", reason = %why, "nothing to report"),
            Outcome::Skipped(why) => info!(target: "pipeline", reason = %why, "personalization skipped"),
        }
        Ok(outcome)
    }

    async fn run_inner(&self, items: Vec<Item>, profile: &str, now: DateTime<Utc>) -> Result<Outcome> {
        let mut seen = self.store.load();

        let fresh = filter_unseen(items, &seen);
        if fresh.is_empty() {
            return Ok(Outcome::NothingToReport(
                "no new items (everything was already delivered)".into(),
            ));
        }

        let recent = select_window(fresh, self.tunables.days_window, now);

        if !self.enabled {
            return Ok(Outcome::Skipped("personalization.enable = false".into()));
        }
        let profile = profile.trim();
        if profile.is_empty() {
            return Ok(Outcome::Skipped("personalization.user_profile is empty".into()));
        }
        let Some(scorer) = self.scorer.clone() else {
            return Ok(Outcome::Skipped("no scoring credentials configured".into()));
        };

        if recent.is_empty() {
            return Ok(Outcome::NothingToReport(format!(
                "no new items within the last {} day(s)",
                self.tunables.days_window
            )));
        }

        let candidates = select_candidates(recent, self.tunables.max_candidates);
        gauge!("pipeline_candidates").set(candidates.len() as f64);

        let engine = ScoringEngine::new(
            scorer,
            self.tunables.concurrency_limit,
            self.tunables.request_timeout,
        )?;
        let scores = engine.score_all(&candidates, profile).await;

        let report = rank(candidates, &scores, self.tunables.top_n)?;
        gauge!("pipeline_report_size").set(report.len() as f64);
        if report.is_empty() {
            return Ok(Outcome::NothingToReport("no scorable candidates".into()));
        }

        let newly_seen = seen.extend(report.delivered_links());
        if newly_seen > 0 {
            self.store.save(&seen)?;
        }
        gauge!("pipeline_seen_links").set(seen.len() as f64);

        Ok(Outcome::Report { report, newly_seen })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tunables_reject_non_positive() {
        assert!(Tunables::new(1, 80, 10, 30).is_ok());
        assert!(Tunables::new(0, 80, 10, 30).is_err());
        assert!(Tunables::new(1, -5, 10, 30).is_err());
        assert!(Tunables::new(1, 80, -1, 30).is_err());
        assert!(Tunables::new(1, 80, 10, 0).is_err());
        assert!(Tunables::new(i64::MAX, 80, 10, 30).is_err());
    }
}
