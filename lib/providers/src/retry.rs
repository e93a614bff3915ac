//! Bounded retry for service calls.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use pawmatch_core::{
    CompletionProvider, CompletionRequest, EmbeddingProvider, ServiceError, ServiceResult,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Exponential backoff policy shared by the embedding and completion clients.
///
/// Only [`ServiceError::is_retryable`] errors are retried, and never more
/// than `max_attempts` calls are made in total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_factor(self.factor)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Run `call` until it succeeds, fails fatally, or attempts run out.
    pub async fn run<T, F, Fut>(&self, operation: &str, call: F) -> ServiceResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = ServiceResult<T>> + Send,
        T: Send,
    {
        call.retry(self.backoff())
            .when(ServiceError::is_retryable)
            .notify(|err: &ServiceError, delay: Duration| {
                warn!(
                    operation,
                    rate_limited = err.is_rate_limit(),
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying service call"
                );
            })
            .await
    }
}

/// Wraps a provider so every call goes through a [`RetryPolicy`].
pub struct Retrying<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P> Retrying<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for Retrying<P> {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        self.policy.run("embed", || self.inner.embed(text)).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> ServiceResult<Vec<Vec<f32>>> {
        self.policy.run("embed_batch", || self.inner.embed_batch(texts)).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[async_trait]
impl<P: CompletionProvider> CompletionProvider for Retrying<P> {
    async fn complete(&self, request: &CompletionRequest) -> ServiceResult<String> {
        self.policy.run("complete", || self.inner.complete(request)).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
