//! # pawmatch Core
//!
//! Core library for the pawmatch shelter-animal recommender.
//!
//! This crate provides the data model and the deterministic stages of the
//! recommendation pipeline:
//!
//! - [`AnimalRecord`] - A sheltered animal with structured and free-text fields
//! - [`EmbeddingVector`] - A uid-tagged embedding with cosine similarity
//! - [`Corpus`] - Immutable-after-load records plus aligned embeddings
//! - [`CandidateSet`] - Borrowed, alignment-checked candidates
//! - [`PreferenceExtractor`] - Keyword-based query constraints
//! - [`HardFilter`] - Conjunctive size/age/gender filtering
//! - [`DescriptionBuilder`] - Embedding text and prompt summaries
//!
//! ## Example
//!
//! ```rust
//! use pawmatch_core::{AnimalRecord, AdoptionState, Corpus, EmbeddingVector, Gender,
//!     HardFilter, PreferenceExtractor};
//!
//! let records = vec![
//!     AnimalRecord::new("1", "콩이", AdoptionState::Available)
//!         .with_weight(4.0)
//!         .with_gender(Gender::Male),
//!     AnimalRecord::new("2", "보리", AdoptionState::Available)
//!         .with_weight(15.0)
//!         .with_gender(Gender::Female),
//! ];
//! let embeddings = vec![
//!     EmbeddingVector::new("1", vec![1.0, 0.0]),
//!     EmbeddingVector::new("2", vec![0.0, 1.0]),
//! ];
//! let corpus = Corpus::new(records, embeddings).unwrap();
//!
//! let prefs = PreferenceExtractor::default().extract("소형견 수컷");
//! let candidates = corpus.candidates(true).unwrap();
//! let filtered = HardFilter::default().filter(&candidates, &prefs).unwrap();
//! assert_eq!(filtered.len(), 1);
//! ```

pub mod candidates;
pub mod corpus;
pub mod describe;
pub mod error;
pub mod filter;
pub mod mock;
pub mod preferences;
pub mod record;
pub mod service;
pub mod vector;

pub use candidates::CandidateSet;
pub use corpus::Corpus;
pub use describe::{DescriptionBuilder, DescriptionConfig, LifeStage, TruncationOrder};
pub use error::{Error, Result, ServiceError, ServiceResult};
pub use filter::{available_only, size_class, AgeWindows, HardFilter};
pub use preferences::{
    normalize_query, AgeClass, PreferenceExtractor, QueryPreferences, SizeClass, Vocabulary,
};
pub use record::{
    clean_weight, clean_weight_text, AdoptionState, AnimalRecord, Gender, AVAILABLE_STATE,
};
pub use service::{CompletionProvider, CompletionRequest, EmbeddingProvider};
pub use vector::{cosine_similarity, EmbeddingVector, DEFAULT_EMBEDDING_DIM};
