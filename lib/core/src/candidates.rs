use crate::error::{Error, Result};
use crate::record::AnimalRecord;
use crate::vector::EmbeddingVector;

/// Index-aligned records and embeddings borrowed from a [`crate::Corpus`].
///
/// Every constructor and every narrowing operation verifies that position `i`
/// of `embeddings` is tagged with the uid of position `i` of `records`.
#[derive(Debug, Clone)]
pub struct CandidateSet<'a> {
    records: Vec<&'a AnimalRecord>,
    embeddings: Vec<&'a EmbeddingVector>,
}

impl<'a> CandidateSet<'a> {
    pub fn new(records: Vec<&'a AnimalRecord>, embeddings: Vec<&'a EmbeddingVector>) -> Result<Self> {
        let set = Self { records, embeddings };
        set.verify_alignment()?;
        Ok(set)
    }

    pub fn from_slices(records: &'a [AnimalRecord], embeddings: &'a [EmbeddingVector]) -> Result<Self> {
        Self::new(records.iter().collect(), embeddings.iter().collect())
    }

    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            embeddings: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[&'a AnimalRecord] {
        &self.records
    }

    pub fn embeddings(&self) -> &[&'a EmbeddingVector] {
        &self.embeddings
    }

    pub fn get(&self, index: usize) -> Option<(&'a AnimalRecord, &'a EmbeddingVector)> {
        Some((*self.records.get(index)?, *self.embeddings.get(index)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a AnimalRecord, &'a EmbeddingVector)> + '_ {
        self.records.iter().copied().zip(self.embeddings.iter().copied())
    }

    pub fn verify_alignment(&self) -> Result<()> {
        if self.records.len() != self.embeddings.len() {
            return Err(Error::DataIntegrity(format!(
                "{} records but {} embeddings",
                self.records.len(),
                self.embeddings.len()
            )));
        }

        for (position, (record, embedding)) in self.iter().enumerate() {
            if record.uid != embedding.source() {
                return Err(Error::DataIntegrity(format!(
                    "position {}: record '{}' paired with embedding of '{}'",
                    position,
                    record.uid,
                    embedding.source()
                )));
            }
        }

        Ok(())
    }

    /// Keep the positions where `mask` is true, in both halves at once.
    pub fn retain_mask(&self, mask: &[bool]) -> Result<CandidateSet<'a>> {
        if mask.len() != self.len() {
            return Err(Error::DataIntegrity(format!(
                "mask of length {} applied to {} candidates",
                mask.len(),
                self.len()
            )));
        }

        let mut records = Vec::with_capacity(self.len());
        let mut embeddings = Vec::with_capacity(self.len());
        for ((record, embedding), keep) in self.iter().zip(mask) {
            if *keep {
                records.push(record);
                embeddings.push(embedding);
            }
        }

        CandidateSet::new(records, embeddings)
    }

    pub fn retain<F>(&self, mut predicate: F) -> Result<CandidateSet<'a>>
    where
        F: FnMut(&AnimalRecord) -> bool,
    {
        let mask: Vec<bool> = self.records.iter().map(|record| predicate(*record)).collect();
        self.retain_mask(&mask)
    }
}
