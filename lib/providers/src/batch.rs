//! Corpus ingestion: embed every record in fixed-size batches.

use pawmatch_core::{AnimalRecord, EmbeddingProvider, EmbeddingVector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub batch_size: usize,
    /// Pause between batches
    pub pause_ms: u64,
    /// Pause after a failed batch, before per-item fallback
    pub failure_pause_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            pause_ms: 100,
            failure_pause_ms: 1000,
        }
    }
}

/// Embeddings aligned with the input records, plus the uids that got a
/// zero-vector placeholder.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub embeddings: Vec<EmbeddingVector>,
    pub failed: Vec<String>,
}

pub struct BatchEmbedder<P> {
    provider: P,
    config: BatchConfig,
}

impl<P: EmbeddingProvider> BatchEmbedder<P> {
    pub fn new(provider: P, config: BatchConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Embed each record's `embedding_text`.
    ///
    /// A failed batch falls back to one call per item. Items that still fail,
    /// or have no text, get a zero vector and are listed in `failed`.
    pub async fn embed_records(&self, records: &[AnimalRecord]) -> BatchOutcome {
        let dimension = self.provider.dimension();
        let batch_size = self.config.batch_size.max(1);
        let mut slots: Vec<Option<Vec<f32>>> = vec![None; records.len()];

        let todo: Vec<usize> = (0..records.len())
            .filter(|&i| !records[i].embedding_text.trim().is_empty())
            .collect();
        let batches = todo.len().div_ceil(batch_size);

        for (batch_no, chunk) in todo.chunks(batch_size).enumerate() {
            if batch_no > 0 {
                pause(self.config.pause_ms).await;
            }

            let texts: Vec<&str> = chunk
                .iter()
                .map(|&i| records[i].embedding_text.as_str())
                .collect();

            match self.provider.embed_batch(&texts).await {
                Ok(vectors) if vectors.len() == chunk.len() => {
                    for (&i, vector) in chunk.iter().zip(vectors) {
                        slots[i] = Some(vector);
                    }
                }
                outcome => {
                    match outcome {
                        Ok(vectors) => warn!(
                            batch = batch_no + 1,
                            expected = chunk.len(),
                            got = vectors.len(),
                            "batch returned wrong number of vectors, embedding items one by one"
                        ),
                        Err(e) => warn!(
                            batch = batch_no + 1,
                            error = %e,
                            "batch embedding failed, embedding items one by one"
                        ),
                    }
                    pause(self.config.failure_pause_ms).await;

                    for &i in chunk {
                        match self.provider.embed(&records[i].embedding_text).await {
                            Ok(vector) => slots[i] = Some(vector),
                            Err(e) => warn!(uid = %records[i].uid, error = %e, "item embedding failed"),
                        }
                    }
                }
            }

            info!(batch = batch_no + 1, batches, "embedding batch done");
        }

        let mut embeddings = Vec::with_capacity(records.len());
        let mut failed = Vec::new();
        for (record, slot) in records.iter().zip(slots) {
            match slot.filter(|v| v.len() == dimension) {
                Some(vector) => embeddings.push(EmbeddingVector::new(record.uid.clone(), vector)),
                None => {
                    embeddings.push(EmbeddingVector::zeros(record.uid.clone(), dimension));
                    failed.push(record.uid.clone());
                }
            }
        }

        if !failed.is_empty() {
            warn!(failed = failed.len(), total = records.len(), "some records have placeholder embeddings");
        }
        BatchOutcome { embeddings, failed }
    }
}

async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawmatch_core::mock::MockEmbeddingProvider;
    use pawmatch_core::AdoptionState;

    fn no_pause(batch_size: usize) -> BatchConfig {
        BatchConfig {
            batch_size,
            pause_ms: 0,
            failure_pause_ms: 0,
        }
    }

    fn records(n: usize) -> Vec<AnimalRecord> {
        (0..n)
            .map(|i| {
                AnimalRecord::new(i.to_string(), format!("동물{}", i), AdoptionState::Available)
                    .with_embedding_text(format!("설명 {}", i))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_embeds_in_batches() {
        let embedder = BatchEmbedder::new(MockEmbeddingProvider::new(4), no_pause(2));
        let outcome = embedder.embed_records(&records(5)).await;

        assert_eq!(outcome.embeddings.len(), 5);
        assert!(outcome.failed.is_empty());
        assert_eq!(embedder.provider().calls(), 3);
        for (i, embedding) in outcome.embeddings.iter().enumerate() {
            assert_eq!(embedding.source(), i.to_string());
            assert!(!embedding.is_zero());
        }
    }

    #[tokio::test]
    async fn test_failed_batch_falls_back_per_item() {
        let provider = MockEmbeddingProvider::new(4).with_poisoned("설명 1");
        let embedder = BatchEmbedder::new(provider, no_pause(3));
        let outcome = embedder.embed_records(&records(3)).await;

        assert_eq!(outcome.failed, vec!["1".to_string()]);
        assert!(outcome.embeddings[1].is_zero());
        assert!(!outcome.embeddings[0].is_zero());
        assert!(!outcome.embeddings[2].is_zero());
        // one batch call plus three item calls
        assert_eq!(embedder.provider().calls(), 4);
    }

    #[tokio::test]
    async fn test_records_without_text_are_placeholders() {
        let mut input = records(2);
        input[0].embedding_text.clear();
        let embedder = BatchEmbedder::new(MockEmbeddingProvider::new(4), no_pause(10));
        let outcome = embedder.embed_records(&input).await;

        assert_eq!(outcome.failed, vec!["0".to_string()]);
        assert_eq!(outcome.embeddings[0].dim(), 4);
        assert_eq!(embedder.provider().calls(), 1);
    }
}
