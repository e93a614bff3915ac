//! # pawmatch Providers
//!
//! Concrete embedding and completion services for pawmatch:
//!
//! - [`RetryPolicy`] / [`Retrying`] - bounded exponential backoff around any provider
//! - [`OpenAiEmbeddings`] / [`OpenAiCompletions`] - OpenAI-compatible HTTP clients
//! - [`BatchEmbedder`] - batched corpus ingestion with per-item fallback

pub mod batch;
pub mod openai;
pub mod retry;

pub use batch::{BatchConfig, BatchEmbedder, BatchOutcome};
pub use openai::{OpenAiCompletions, OpenAiConfig, OpenAiEmbeddings};
pub use retry::{RetryPolicy, Retrying};
