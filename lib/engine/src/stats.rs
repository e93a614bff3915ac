use pawmatch_core::{size_class, Corpus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

const UNKNOWN: &str = "미상";

/// Summary counts over a loaded corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusStats {
    pub total: usize,
    pub available: usize,
    pub available_ratio: f64,
    pub dimension: usize,
    /// Records whose embedding failed and are excluded from ranking
    pub pending: usize,
    pub by_state: BTreeMap<String, usize>,
    pub by_gender: BTreeMap<String, usize>,
    pub by_size: BTreeMap<String, usize>,
}

impl CorpusStats {
    pub fn compute(corpus: &Corpus) -> Self {
        let mut by_state = BTreeMap::new();
        let mut by_gender = BTreeMap::new();
        let mut by_size = BTreeMap::new();
        let mut available = 0;

        for record in corpus.records() {
            if record.is_available() {
                available += 1;
            }
            *by_state.entry(record.state.as_str().to_string()).or_insert(0) += 1;

            let gender = record.gender.map(|g| g.label()).unwrap_or(UNKNOWN);
            *by_gender.entry(gender.to_string()).or_insert(0) += 1;

            let size = size_class(record.weight_kg).map(|s| s.label()).unwrap_or(UNKNOWN);
            *by_size.entry(size.to_string()).or_insert(0) += 1;
        }

        let total = corpus.len();
        let available_ratio = if total == 0 { 0.0 } else { available as f64 / total as f64 };

        Self {
            total,
            available,
            available_ratio,
            dimension: corpus.dimension(),
            pending: corpus.pending_count(),
            by_state,
            by_gender,
            by_size,
        }
    }
}

impl fmt::Display for CorpusStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total animals: {}", self.total)?;
        writeln!(
            f,
            "Available: {} ({:.1}%)",
            self.available,
            self.available_ratio * 100.0
        )?;
        writeln!(f, "Embedding dimension: {}", self.dimension)?;
        writeln!(f, "Pending embeddings: {}", self.pending)?;

        for (title, counts) in [
            ("By state", &self.by_state),
            ("By gender", &self.by_gender),
            ("By size", &self.by_size),
        ] {
            writeln!(f, "{}:", title)?;
            for (key, count) in counts {
                writeln!(f, "  {}: {}", key, count)?;
            }
        }
        Ok(())
    }
}
