// Structured hard filtering over index-aligned candidates
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::candidates::CandidateSet;
use crate::error::Result;
use crate::preferences::{AgeClass, QueryPreferences, SizeClass};
use crate::record::AnimalRecord;

/// Upper bound (exclusive) of the small bucket, in kg.
pub const SMALL_MAX_KG: f64 = 7.0;
/// Upper bound (exclusive) of the medium bucket, in kg.
pub const MEDIUM_MAX_KG: f64 = 20.0;

/// Weight bucket: small < 7kg, medium [7, 20)kg, large >= 20kg.
///
/// Missing, non-finite and non-positive weights have no bucket.
pub fn size_class(weight_kg: Option<f64>) -> Option<SizeClass> {
    let w = weight_kg.filter(|w| w.is_finite() && *w > 0.0)?;
    Some(if w < SMALL_MAX_KG {
        SizeClass::Small
    } else if w < MEDIUM_MAX_KG {
        SizeClass::Medium
    } else {
        SizeClass::Large
    })
}

/// Birth-year substrings that place an age descriptor into an age class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgeWindows {
    pub young: Vec<String>,
    pub senior: Vec<String>,
}

impl Default for AgeWindows {
    fn default() -> Self {
        Self {
            young: vec!["2024".into(), "2023".into()],
            senior: vec!["2013".into(), "2014".into(), "2015".into(), "2016".into()],
        }
    }
}

impl AgeWindows {
    pub fn matches(&self, age_text: &str, class: AgeClass) -> bool {
        let window = match class {
            AgeClass::Young => &self.young,
            AgeClass::Senior => &self.senior,
        };
        window.iter().any(|year| age_text.contains(year.as_str()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct HardFilter {
    age_windows: AgeWindows,
}

impl HardFilter {
    pub fn new(age_windows: AgeWindows) -> Self {
        Self { age_windows }
    }

    /// Conjunction of every active constraint in `prefs`.
    pub fn matches(&self, record: &AnimalRecord, prefs: &QueryPreferences) -> bool {
        if let Some(size) = prefs.size {
            if size_class(record.weight_kg) != Some(size) {
                return false;
            }
        }
        if let Some(age) = prefs.age {
            if !self.age_windows.matches(&record.age, age) {
                return false;
            }
        }
        if let Some(gender) = prefs.gender {
            if record.gender != Some(gender) {
                return false;
            }
        }
        true
    }

    pub fn mask(&self, candidates: &CandidateSet<'_>, prefs: &QueryPreferences) -> Vec<bool> {
        candidates
            .records()
            .iter()
            .map(|record| self.matches(record, prefs))
            .collect()
    }

    /// Narrow `candidates` to the records satisfying `prefs`.
    ///
    /// An empty result is a valid outcome.
    pub fn filter<'a>(
        &self,
        candidates: &CandidateSet<'a>,
        prefs: &QueryPreferences,
    ) -> Result<CandidateSet<'a>> {
        if !prefs.has_constraints() {
            return Ok(candidates.clone());
        }

        let mask = self.mask(candidates, prefs);
        let filtered = candidates.retain_mask(&mask)?;
        debug!(
            before = candidates.len(),
            after = filtered.len(),
            size = ?prefs.size,
            age = ?prefs.age,
            gender = ?prefs.gender,
            "hard filter applied"
        );
        Ok(filtered)
    }
}

/// Always-on availability predicate, applied before hard filtering.
pub fn available_only<'a>(candidates: &CandidateSet<'a>) -> Result<CandidateSet<'a>> {
    candidates.retain(AnimalRecord::is_available)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AdoptionState, Gender};
    use crate::vector::EmbeddingVector;

    #[test]
    fn test_size_partition() {
        assert_eq!(size_class(Some(0.5)), Some(SizeClass::Small));
        assert_eq!(size_class(Some(6.99)), Some(SizeClass::Small));
        assert_eq!(size_class(Some(7.0)), Some(SizeClass::Medium));
        assert_eq!(size_class(Some(19.99)), Some(SizeClass::Medium));
        assert_eq!(size_class(Some(20.0)), Some(SizeClass::Large));
        assert_eq!(size_class(Some(45.0)), Some(SizeClass::Large));
        assert_eq!(size_class(None), None);
        assert_eq!(size_class(Some(0.0)), None);
        assert_eq!(size_class(Some(-2.0)), None);
        assert_eq!(size_class(Some(f64::NAN)), None);
    }

    fn fixture() -> (Vec<AnimalRecord>, Vec<EmbeddingVector>) {
        let records = vec![
            AnimalRecord::new("1", "콩이", AdoptionState::Available)
                .with_weight(4.0)
                .with_gender(Gender::Male)
                .with_age("2023(추정)"),
            AnimalRecord::new("2", "보리", AdoptionState::Available)
                .with_weight(12.0)
                .with_gender(Gender::Female)
                .with_age("2015"),
            AnimalRecord::new("3", "두부", AdoptionState::Available)
                .with_gender(Gender::Male)
                .with_age("2024"),
            AnimalRecord::new("4", "달이", "입양완료")
                .with_weight(3.0)
                .with_gender(Gender::Female),
        ];
        let embeddings = records
            .iter()
            .map(|r| EmbeddingVector::new(r.uid.clone(), vec![1.0, 0.0]))
            .collect();
        (records, embeddings)
    }

    #[test]
    fn test_missing_weight_never_matches_size() {
        let (records, embeddings) = fixture();
        let set = CandidateSet::from_slices(&records, &embeddings).unwrap();
        let prefs = QueryPreferences {
            size: Some(SizeClass::Small),
            ..Default::default()
        };
        let out = HardFilter::default().filter(&set, &prefs).unwrap();
        let uids: Vec<_> = out.records().iter().map(|r| r.uid.as_str()).collect();
        assert_eq!(uids, vec!["1", "4"]);
    }

    #[test]
    fn test_conjunctive_constraints() {
        let (records, embeddings) = fixture();
        let set = CandidateSet::from_slices(&records, &embeddings).unwrap();
        let prefs = QueryPreferences {
            age: Some(AgeClass::Young),
            gender: Some(Gender::Male),
            ..Default::default()
        };
        let out = HardFilter::default().filter(&set, &prefs).unwrap();
        assert_eq!(out.len(), 2);
        for (record, embedding) in out.iter() {
            assert_eq!(record.uid, embedding.source());
        }

        let senior = QueryPreferences {
            age: Some(AgeClass::Senior),
            gender: Some(Gender::Male),
            ..Default::default()
        };
        assert!(HardFilter::default().filter(&set, &senior).unwrap().is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let (records, embeddings) = fixture();
        let set = CandidateSet::from_slices(&records, &embeddings).unwrap();
        let prefs = QueryPreferences {
            size: Some(SizeClass::Small),
            gender: Some(Gender::Female),
            ..Default::default()
        };
        let filter = HardFilter::default();
        let once = filter.filter(&set, &prefs).unwrap();
        let twice = filter.filter(&once, &prefs).unwrap();
        let uids = |s: &CandidateSet<'_>| s.records().iter().map(|r| r.uid.clone()).collect::<Vec<_>>();
        assert_eq!(uids(&once), uids(&twice));
    }

    #[test]
    fn test_available_only() {
        let (records, embeddings) = fixture();
        let set = CandidateSet::from_slices(&records, &embeddings).unwrap();
        let out = available_only(&set).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.records().iter().all(|r| r.is_available()));
    }
}
