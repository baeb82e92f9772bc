//! # Ranking
//! Zip candidates with their scores, order by score, keep the top N.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::ingest::types::Item;
use crate::score::clamp_score;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub item: Item,
    /// Always within [0, 100].
    pub score: f64,
}

/// Non-increasing by score; equal scores keep candidate order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedReport {
    entries: Vec<ScoredCandidate>,
}

impl RankedReport {
    pub fn entries(&self) -> &[ScoredCandidate] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Links of exactly the reported items, to be folded into history.
    pub fn delivered_links(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|c| !c.item.link.is_empty())
            .map(|c| c.item.link.clone())
            .collect()
    }
}

/// `scores[i]` must belong to `candidates[i]`.
pub fn rank(candidates: Vec<Item>, scores: &[f64], top_n: usize) -> Result<RankedReport> {
    if candidates.len() != scores.len() {
        bail!(
            "score count {} does not match candidate count {}",
            scores.len(),
            candidates.len()
        );
    }

    let mut entries: Vec<ScoredCandidate> = candidates
        .into_iter()
        .zip(scores.iter().copied())
        .map(|(item, score)| ScoredCandidate {
            item,
            score: clamp_score(score),
        })
        .collect();

    // stable: ties keep newest-first candidate order
    entries.sort_by(|a, b| b.score.total_cmp(&a.score));
    entries.truncate(top_n);

    Ok(RankedReport { entries })
}
