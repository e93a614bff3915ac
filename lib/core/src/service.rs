//! External service abstractions.
//!
//! The pipeline only sees these traits; HTTP clients, retry wrappers and
//! test doubles all implement them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ServiceResult;

/// Text embedding service.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>>;

    /// Generate embeddings for a batch of texts, in input order.
    ///
    /// Default implementation calls `embed` for each text sequentially.
    async fn embed_batch(&self, texts: &[&str]) -> ServiceResult<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    fn dimension(&self) -> usize;

    fn name(&self) -> &str;
}

/// Chat completion service.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> ServiceResult<String>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<T> {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        (**self).embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> ServiceResult<Vec<Vec<f32>>> {
        (**self).embed_batch(texts).await
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<T: CompletionProvider + ?Sized> CompletionProvider for Arc<T> {
    async fn complete(&self, request: &CompletionRequest) -> ServiceResult<String> {
        (**self).complete(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: String::new(),
            user_prompt: user_prompt.into(),
            temperature: 0.3,
            max_tokens: 1500,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}
