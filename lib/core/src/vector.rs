use serde::{Deserialize, Serialize};

/// Dimension of `text-embedding-3-large`, the model the corpus is built with.
pub const DEFAULT_EMBEDDING_DIM: usize = 3072;

/// An embedding tagged with the uid of the record it was computed from.
///
/// The tag lets a [`crate::Corpus`] verify that records and embeddings stay
/// aligned by position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingVector {
    source: String,
    data: Vec<f32>,
}

impl EmbeddingVector {
    #[inline]
    #[must_use]
    pub fn new(source: impl Into<String>, data: Vec<f32>) -> Self {
        Self {
            source: source.into(),
            data,
        }
    }

    /// Placeholder for a record whose embedding could not be computed.
    #[must_use]
    pub fn zeros(source: impl Into<String>, dim: usize) -> Self {
        Self::new(source, vec![0.0; dim])
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    /// True for the zero-vector placeholder.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|x| *x == 0.0)
    }

    #[inline]
    pub fn cosine_similarity(&self, other: &[f32]) -> f32 {
        cosine_similarity(&self.data, other)
    }
}

/// Dot product with two accumulators for better pipelining.
///
/// Inputs of different lengths are summed over their common prefix.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);

    let mut dot0 = 0.0f32;
    let mut dot1 = 0.0f32;

    let chunks = a.chunks_exact(8);
    let remainder = chunks.remainder();
    let b_chunks = b.chunks_exact(8);

    for (a_chunk, b_chunk) in chunks.zip(b_chunks) {
        dot0 += a_chunk[0] * b_chunk[0]
            + a_chunk[1] * b_chunk[1]
            + a_chunk[2] * b_chunk[2]
            + a_chunk[3] * b_chunk[3];

        dot1 += a_chunk[4] * b_chunk[4]
            + a_chunk[5] * b_chunk[5]
            + a_chunk[6] * b_chunk[6]
            + a_chunk[7] * b_chunk[7];
    }

    let tail = len - remainder.len();
    for (x, y) in remainder.iter().zip(&b[tail..]) {
        dot0 += x * y;
    }

    dot0 + dot1
}

#[inline]
pub fn norm(v: &[f32]) -> f32 {
    dot_product(v, v).sqrt()
}

/// Cosine similarity in [-1, 1].
///
/// Mismatched lengths and zero-norm inputs score 0.0.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let norm_a = norm(a);
    let norm_b = norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product(a, b) / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let v1 = EmbeddingVector::new("a", vec![1.0, 0.0]);
        assert!((v1.cosine_similarity(&[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(v1.cosine_similarity(&[0.0, 1.0]).abs() < 1e-6);
        assert!((v1.cosine_similarity(&[-2.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_dot_product_remainder() {
        let a: Vec<f32> = (1..=11).map(|x| x as f32).collect();
        let b = vec![1.0f32; 11];
        assert!((dot_product(&a, &b) - 66.0).abs() < 1e-4);
    }

    #[test]
    fn test_dot_product_mismatched_lengths() {
        let a: Vec<f32> = (1..=16).map(|x| x as f32).collect();
        let ones = vec![1.0f32; 10];
        assert!((dot_product(&a, &ones) - 55.0).abs() < 1e-4);
        assert!((dot_product(&ones, &a) - 55.0).abs() < 1e-4);
        assert!((dot_product(&a, &ones[..5]) - 15.0).abs() < 1e-4);
        assert_eq!(dot_product(&a, &[]), 0.0);
    }

    #[test]
    fn test_zero_placeholder() {
        let v = EmbeddingVector::zeros("9", 4);
        assert!(v.is_zero());
        assert_eq!(v.dim(), 4);
        assert_eq!(v.source(), "9");
        assert!(!EmbeddingVector::new("9", vec![0.0, 0.1]).is_zero());
    }
}
