//! # pawmatch
//!
//! A hybrid recommender for sheltered animals.
//!
//! A free-text query such as "소형견 수컷, 차분한 아이" runs through four stages:
//!
//! 1. **Preference extraction** - size, age and gender keywords become hard constraints
//! 2. **Hard filtering** - candidates violating any constraint are dropped
//! 3. **Similarity ranking** - the query embedding is compared with every
//!    surviving description embedding
//! 4. **Re-ranking** - a language model picks and explains the final list;
//!    on failure the similarity ranking is returned instead
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! export OPENAI_API_KEY=...
//! pawmatch build --input animals.csv
//! pawmatch recommend "소형견 수컷, 산책 좋아하는 아이"
//! pawmatch serve --http-port 8080
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use pawmatch::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<()> {
//! let records = vec![AnimalRecord::new("1", "콩이", AdoptionState::Available).with_weight(4.0)];
//! let embeddings = vec![EmbeddingVector::new("1", vec![1.0, 0.0])];
//! let corpus = Corpus::new(records, embeddings)?;
//!
//! let recommender = Recommender::new(Arc::new(MockEmbeddingProvider::new(2)));
//! let recommendations = recommender.recommend(&corpus, "소형견", true, 5).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! - [`pawmatch-core`](https://docs.rs/pawmatch-core) - Data model, filtering, descriptions, service traits
//! - [`pawmatch-similarity`](https://docs.rs/pawmatch-similarity) - Similarity ranking and LLM re-ranking
//! - [`pawmatch-providers`](https://docs.rs/pawmatch-providers) - OpenAI clients, retries, batch embedding
//! - [`pawmatch-storage`](https://docs.rs/pawmatch-storage) - CSV loading, snapshots, results log
//! - [`pawmatch-engine`](https://docs.rs/pawmatch-engine) - The composed pipeline and its configuration
//! - [`pawmatch-api`](https://docs.rs/pawmatch-api) - REST API

// Re-export core types
pub use pawmatch_core::{
    AdoptionState, AgeClass, AnimalRecord, CandidateSet, CompletionProvider, Corpus,
    DescriptionBuilder, EmbeddingProvider, EmbeddingVector, Error, Gender, HardFilter,
    PreferenceExtractor, QueryPreferences, Result, ServiceError, SizeClass,
};

// Re-export the pipeline stages
pub use pawmatch_similarity::{LlmReranker, Recommendation, RecommendationSource, SimilarityRanker};
pub use pawmatch_engine::{CorpusStats, RecommendOutcome, Recommender, RecommenderConfig};

// Re-export providers and storage
pub use pawmatch_providers::{BatchEmbedder, OpenAiCompletions, OpenAiEmbeddings, RetryPolicy, Retrying};
pub use pawmatch_storage::{CorpusSnapshot, ResultsLog, Satisfaction, SnapshotStore};

// Re-export API
pub use pawmatch_api::{AppState, RestApi};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AdoptionState, AnimalRecord, Corpus, CorpusStats, EmbeddingVector, Error, Gender,
        Recommendation, Recommender, RecommenderConfig, Result,
    };
    pub use pawmatch_core::mock::{MockCompletionProvider, MockEmbeddingProvider};
}
