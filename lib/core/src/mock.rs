//! In-process service doubles for tests, benches and offline runs.

use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{ServiceError, ServiceResult};
use crate::service::{CompletionProvider, CompletionRequest, EmbeddingProvider};

/// Deterministic embedding provider.
///
/// Texts registered with [`MockEmbeddingProvider::with_vector`] get their fixed
/// vector; anything else gets a unit vector derived from its bytes.
#[derive(Debug, Default)]
pub struct MockEmbeddingProvider {
    dimension: usize,
    fixed: AHashMap<String, Vec<f32>>,
    poisoned: AHashSet<String>,
    scripted_failures: Mutex<VecDeque<ServiceError>>,
    always_fail: Option<ServiceError>,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ..Default::default()
        }
    }

    /// A provider whose every call fails with `error`.
    pub fn failing(dimension: usize, error: ServiceError) -> Self {
        Self {
            dimension,
            always_fail: Some(error),
            ..Default::default()
        }
    }

    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.fixed.insert(text.into(), vector);
        self
    }

    /// Calls that include `text` fail with a fatal error.
    pub fn with_poisoned(mut self, text: impl Into<String>) -> Self {
        self.poisoned.insert(text.into());
        self
    }

    /// The next calls fail with these errors, one per call, before succeeding.
    pub fn with_failures(self, failures: impl IntoIterator<Item = ServiceError>) -> Self {
        self.scripted_failures.lock().extend(failures);
        self
    }

    /// Number of `embed` and `embed_batch` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, texts: &[&str]) -> ServiceResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.always_fail {
            return Err(error.clone());
        }
        if let Some(error) = self.scripted_failures.lock().pop_front() {
            return Err(error);
        }
        if let Some(text) = texts.iter().find(|t| self.poisoned.contains(**t)) {
            return Err(ServiceError::Fatal(format!("cannot embed '{}'", text)));
        }
        Ok(())
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.fixed.get(text) {
            return vector.clone();
        }

        let mut embedding = vec![0.0f32; self.dimension];
        let bytes = text.as_bytes();
        for (i, val) in embedding.iter_mut().enumerate() {
            let byte_val = if bytes.is_empty() { 0u8 } else { bytes[i % bytes.len()] };
            *val = ((byte_val as f32 + i as f32) % 256.0 + 1.0) / 257.0;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut embedding {
                *val /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        self.check(&[text])?;
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> ServiceResult<Vec<Vec<f32>>> {
        self.check(texts)?;
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Completion provider returning canned responses.
///
/// Responses are returned in order and cycle once exhausted.
#[derive(Debug, Default)]
pub struct MockCompletionProvider {
    canned: Vec<String>,
    index: Mutex<usize>,
    scripted_failures: Mutex<VecDeque<ServiceError>>,
    always_fail: Option<ServiceError>,
    last_request: Mutex<Option<CompletionRequest>>,
    calls: AtomicUsize,
}

impl MockCompletionProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            canned: responses,
            ..Default::default()
        }
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    pub fn failing(error: ServiceError) -> Self {
        Self {
            always_fail: Some(error),
            ..Default::default()
        }
    }

    pub fn with_failures(self, failures: impl IntoIterator<Item = ServiceError>) -> Self {
        self.scripted_failures.lock().extend(failures);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> ServiceResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock() = Some(request.clone());

        if let Some(error) = &self.always_fail {
            return Err(error.clone());
        }
        if let Some(error) = self.scripted_failures.lock().pop_front() {
            return Err(error);
        }
        if self.canned.is_empty() {
            return Ok(String::new());
        }

        let mut index = self.index.lock();
        let content = self.canned[*index].clone();
        *index = (*index + 1) % self.canned.len();
        Ok(content)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
