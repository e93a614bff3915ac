use serde::{Deserialize, Serialize};

use crate::ranker::RankedCandidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    /// Parsed from the re-ranking model's response
    Llm,
    /// Taken directly from the similarity ranking
    Similarity,
}

/// One recommendation returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub rank: usize,
    pub name: Option<String>,
    pub reason: Option<String>,
    /// uid of the matched candidate, when one could be identified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub source: RecommendationSource,
}

impl Recommendation {
    /// Similarity-path recommendation; carries no reason.
    pub fn from_ranked(candidate: &RankedCandidate<'_>) -> Self {
        Self {
            rank: candidate.rank,
            name: Some(candidate.record.name.clone()),
            reason: None,
            uid: Some(candidate.record.uid.clone()),
            score: Some(candidate.score),
            source: RecommendationSource::Similarity,
        }
    }

    /// The similarity ranking, unchanged, as recommendations.
    pub fn fallback(candidates: &[RankedCandidate<'_>]) -> Vec<Self> {
        candidates.iter().map(Self::from_ranked).collect()
    }

    /// False when either the name or the reason is missing.
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.reason.is_some()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("이름미정")
    }

    /// Detail page for the matched candidate, e.g. `<base>/<uid>`.
    pub fn link(&self, base: &str) -> Option<String> {
        self.uid
            .as_ref()
            .map(|uid| format!("{}/{}", base.trim_end_matches('/'), uid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawmatch_core::{AdoptionState, AnimalRecord};

    #[test]
    fn test_fallback_preserves_order_without_reasons() {
        let a = AnimalRecord::new("10", "콩이", AdoptionState::Available);
        let b = AnimalRecord::new("11", "보리", AdoptionState::Available);
        let ranked = vec![
            RankedCandidate { record: &a, score: 0.9, rank: 1, position: 0 },
            RankedCandidate { record: &b, score: 0.4, rank: 2, position: 1 },
        ];

        let recs = Recommendation::fallback(&ranked);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].name.as_deref(), Some("콩이"));
        assert_eq!(recs[1].uid.as_deref(), Some("11"));
        assert!(recs.iter().all(|r| r.reason.is_none() && !r.is_complete()));
        assert!(recs.iter().all(|r| r.source == RecommendationSource::Similarity));
    }

    #[test]
    fn test_link() {
        let rec = Recommendation {
            rank: 1,
            name: Some("콩이".into()),
            reason: Some("활발해요".into()),
            uid: Some("42".into()),
            score: None,
            source: RecommendationSource::Llm,
        };
        assert!(rec.is_complete());
        assert_eq!(
            rec.link("https://www.pimfyvirus.com/search/01_v/").as_deref(),
            Some("https://www.pimfyvirus.com/search/01_v/42")
        );

        let unmatched = Recommendation { uid: None, ..rec };
        assert_eq!(unmatched.link("https://example.org"), None);
    }
}
