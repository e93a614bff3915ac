use ahash::{AHashMap, AHashSet};
use tracing::debug;

use crate::candidates::CandidateSet;
use crate::error::{Error, Result};
use crate::record::AnimalRecord;
use crate::vector::EmbeddingVector;

/// The loaded records and their embeddings, read-only after construction.
///
/// A corpus is built once and then shared by reference with every query.
#[derive(Debug, Clone)]
pub struct Corpus {
    records: Vec<AnimalRecord>,
    embeddings: Vec<EmbeddingVector>,
    dimension: usize,
    uid_index: AHashMap<String, usize>,
    pending: AHashSet<String>,
}

impl Corpus {
    /// Validate and index a record table with its aligned embedding table.
    ///
    /// Zero vectors are placeholders left by failed ingestion; those records
    /// are kept but never offered as candidates.
    pub fn new(records: Vec<AnimalRecord>, embeddings: Vec<EmbeddingVector>) -> Result<Self> {
        if records.len() != embeddings.len() {
            return Err(Error::DataIntegrity(format!(
                "{} records but {} embeddings",
                records.len(),
                embeddings.len()
            )));
        }

        let dimension = embeddings.first().map(EmbeddingVector::dim).unwrap_or(0);
        let mut uid_index = AHashMap::with_capacity(records.len());
        let mut pending = AHashSet::new();

        for (position, (record, embedding)) in records.iter().zip(&embeddings).enumerate() {
            if record.uid != embedding.source() {
                return Err(Error::DataIntegrity(format!(
                    "position {}: record '{}' paired with embedding of '{}'",
                    position,
                    record.uid,
                    embedding.source()
                )));
            }
            if embedding.dim() != dimension {
                return Err(Error::InvalidDimension {
                    expected: dimension,
                    actual: embedding.dim(),
                });
            }
            if uid_index.insert(record.uid.clone(), position).is_some() {
                return Err(Error::DataIntegrity(format!("duplicate uid '{}'", record.uid)));
            }
            if embedding.is_zero() {
                pending.insert(record.uid.clone());
            }
        }

        debug!(
            records = records.len(),
            dimension,
            pending = pending.len(),
            "corpus loaded"
        );

        Ok(Self {
            records,
            embeddings,
            dimension,
            uid_index,
            pending,
        })
    }

    /// Mark uids whose embedding failed during ingestion.
    pub fn with_pending<I, S>(mut self, failed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for uid in failed {
            let uid = uid.into();
            if self.uid_index.contains_key(&uid) {
                self.pending.insert(uid);
            }
        }
        self
    }

    /// Records eligible for ranking, paired with their embeddings.
    pub fn candidates(&self, available_only: bool) -> Result<CandidateSet<'_>> {
        let all = CandidateSet::from_slices(&self.records, &self.embeddings)?;
        all.retain(|record| {
            !self.pending.contains(&record.uid) && (!available_only || record.is_available())
        })
    }

    pub fn get(&self, uid: &str) -> Option<(&AnimalRecord, &EmbeddingVector)> {
        let position = *self.uid_index.get(uid)?;
        Some((&self.records[position], &self.embeddings[position]))
    }

    pub fn records(&self) -> &[AnimalRecord] {
        &self.records
    }

    pub fn embeddings(&self) -> &[EmbeddingVector] {
        &self.embeddings
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_pending(&self, uid: &str) -> bool {
        self.pending.contains(uid)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
