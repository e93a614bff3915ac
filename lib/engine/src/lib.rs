//! # pawmatch Engine
//!
//! Composes the pipeline stages into a single [`Recommender`]:
//!
//! ```text
//! query ──► PreferenceExtractor ──► HardFilter ──► SimilarityRanker ──► LlmReranker ──► top-k
//!                                        │                                   │
//!                                        └─ empty: return []                 └─ failure: similarity order
//! ```
//!
//! [`RecommenderConfig`] gathers every tunable of the stages and the
//! service providers, and [`CorpusStats`] summarizes a loaded corpus.

pub mod config;
pub mod pipeline;
pub mod stats;

pub use config::{RecommenderConfig, DEFAULT_LINK_BASE};
pub use pipeline::{RecommendOutcome, Recommender, DEFAULT_CANDIDATE_POOL};
pub use stats::CorpusStats;
