//! # pawmatch Similarity
//!
//! Ranking stages of the pawmatch pipeline.
//!
//! - [`SimilarityRanker`] embeds the query and returns the top-k candidates by
//!   cosine similarity, ties broken by candidate order
//! - [`LlmReranker`] asks a completion service to re-order and justify that
//!   pool, and parses the numbered answer with [`ResponseParser`]
//! - [`Recommendation`] is the result type of both paths
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ CandidateSet│────>│  Similarity │────>│   Prompt    │
//! │ (filtered)  │     │   Ranker    │     │   Builder   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │                   │
//!                            │            ┌─────────────┐
//!                            │            │ Completion  │
//!                            │            │  Provider   │
//!                            │            └─────────────┘
//!                            │                   │
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │  fallback   │<────│  Response   │
//!                     │ (on error)  │     │   Parser    │
//!                     └─────────────┘     └─────────────┘
//! ```

pub mod parser;
pub mod prompt;
pub mod ranker;
pub mod recommendation;
pub mod rerank;

pub use parser::{ParsedEntry, ResponseFormat, ResponseParser};
pub use prompt::{PromptBuilder, PromptConfig, DEFAULT_SYSTEM_PROMPT};
pub use ranker::{rank_by_vector, top_k, RankedCandidate, SimilarityRanker};
pub use recommendation::{Recommendation, RecommendationSource};
pub use rerank::LlmReranker;
