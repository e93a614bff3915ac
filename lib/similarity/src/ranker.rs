//! Embedding similarity ranking over a filtered candidate set.

use ordered_float::OrderedFloat;
use pawmatch_core::{
    cosine_similarity, AnimalRecord, CandidateSet, EmbeddingProvider, Error, Result,
};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tracing::{debug, error};

/// A candidate scored against one query. Produced per query, never stored.
#[derive(Debug, Clone, Copy)]
pub struct RankedCandidate<'a> {
    pub record: &'a AnimalRecord,
    /// Cosine similarity to the query
    pub score: f32,
    /// 1-based rank
    pub rank: usize,
    /// Position in the candidate set the ranking was computed over
    pub position: usize,
}

pub struct SimilarityRanker {
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SimilarityRanker {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Embed `query_text` once and return the top `k` candidates by cosine similarity.
    ///
    /// An empty candidate set (or `k == 0`) returns an empty ranking without
    /// calling the embedding service.
    pub async fn rank<'a>(
        &self,
        query_text: &str,
        candidates: &CandidateSet<'a>,
        k: usize,
    ) -> Result<Vec<RankedCandidate<'a>>> {
        if candidates.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        candidates.verify_alignment()?;

        let query = self.embedder.embed(query_text).await.map_err(|e| {
            error!(provider = self.embedder.name(), error = %e, "query embedding failed");
            Error::Embedding(e)
        })?;

        let ranked = rank_by_vector(&query, candidates, k)?;
        debug!(
            candidates = candidates.len(),
            returned = ranked.len(),
            top_score = ranked.first().map(|c| c.score),
            "similarity ranking complete"
        );
        Ok(ranked)
    }
}

/// Rank `candidates` against an already computed query vector.
pub fn rank_by_vector<'a>(
    query: &[f32],
    candidates: &CandidateSet<'a>,
    k: usize,
) -> Result<Vec<RankedCandidate<'a>>> {
    let scores = score_candidates(query, candidates)?;
    let records = candidates.records();

    Ok(top_k(&scores, k)
        .into_iter()
        .enumerate()
        .map(|(i, (position, score))| RankedCandidate {
            record: records[position],
            score,
            rank: i + 1,
            position,
        })
        .collect())
}

/// Cosine similarity of every candidate to `query`, by position.
///
/// Non-finite scores are pushed to the bottom as negative infinity.
pub fn score_candidates(query: &[f32], candidates: &CandidateSet<'_>) -> Result<Vec<f32>> {
    candidates
        .embeddings()
        .iter()
        .map(|embedding| {
            if embedding.dim() != query.len() {
                return Err(Error::InvalidDimension {
                    expected: embedding.dim(),
                    actual: query.len(),
                });
            }
            let score = cosine_similarity(query, embedding.as_slice());
            Ok(if score.is_finite() { score } else { f32::NEG_INFINITY })
        })
        .collect()
}

/// Indices of the `k` highest scores, best first. Equal scores keep input order.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let k = k.min(scores.len());
    if k == 0 {
        return Vec::new();
    }

    // Min-heap of the current best k; on equal scores the later index is smaller.
    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f32>, Reverse<usize>)>> =
        BinaryHeap::with_capacity(k + 1);
    for (index, score) in scores.iter().enumerate() {
        let entry = Reverse((OrderedFloat(*score), Reverse(index)));
        if heap.len() < k {
            heap.push(entry);
        } else if let Some(worst) = heap.peek() {
            if entry < *worst {
                heap.pop();
                heap.push(entry);
            }
        }
    }

    let mut best: Vec<(usize, f32)> = heap
        .into_iter()
        .map(|Reverse((score, Reverse(index)))| (index, score.into_inner()))
        .collect();
    best.sort_by(|a, b| {
        OrderedFloat(b.1)
            .cmp(&OrderedFloat(a.1))
            .then_with(|| a.0.cmp(&b.0))
    });
    best
}
