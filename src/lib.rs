// src/lib.rs
// Public library surface for the CLI and integration tests.

pub mod config;
pub mod ingest;
pub mod llm;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod rank;
pub mod report;
pub mod score;
pub mod seen;
pub mod select;
pub mod translate;

// ---- Re-exports for stable public API ----
pub use crate::ingest::types::Item;
pub use crate::pipeline::{Outcome, Pipeline, Tunables};
pub use crate::rank::{rank, RankedReport, ScoredCandidate};
pub use crate::score::engine::ScoringEngine;
pub use crate::score::{ChatScorer, RelevanceScorer};
pub use crate::seen::{FileSeenStore, MemorySeenStore, SeenSet, SeenStore};
