use pawmatch_core::{AnimalRecord, CompletionRequest};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::ranker::RankedCandidate;

pub const DEFAULT_SYSTEM_PROMPT: &str = "당신은 유기동물 입양 상담 전문가입니다. \
입양 희망자의 요청과 후보 동물 정보를 바탕으로 가장 잘 맞는 동물을 골라 추천하고, \
각 추천마다 구체적인 이유를 한두 문장으로 설명하세요. 후보 목록에 없는 동물은 추천하지 마세요.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Number of recommendations asked for when the caller names no count
    pub max_recommendations: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.3,
            max_tokens: 1500,
            max_recommendations: 5,
        }
    }
}

/// Builds the single re-ranking request for a query and its candidate pool.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    config: PromptConfig,
}

impl PromptBuilder {
    pub fn new(config: PromptConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PromptConfig {
        &self.config
    }

    /// Build the request asking for `count` picks, or
    /// [`PromptConfig::max_recommendations`] when `count` is `None`. The ask
    /// never exceeds the number of candidates.
    pub fn build<F>(
        &self,
        query: &str,
        candidates: &[RankedCandidate<'_>],
        count: Option<usize>,
        describe: F,
    ) -> CompletionRequest
    where
        F: Fn(&AnimalRecord) -> String,
    {
        let wanted = count
            .unwrap_or(self.config.max_recommendations)
            .min(candidates.len())
            .max(1);

        let mut prompt = String::new();
        let _ = writeln!(prompt, "입양 희망자의 요청: \"{}\"", query.trim());
        prompt.push('\n');
        prompt.push_str("후보 동물 목록 (유사도 순):\n");
        for candidate in candidates {
            let _ = writeln!(
                prompt,
                "{}. 이름: {} (유사도 {:.3})",
                candidate.rank, candidate.record.name, candidate.score
            );
            let description = describe(candidate.record);
            if !description.is_empty() {
                let _ = writeln!(prompt, "   설명: {}", description);
            }
        }
        prompt.push('\n');
        let _ = writeln!(
            prompt,
            "위 후보 중에서 요청에 가장 잘 맞는 {}마리를 추천 순서대로 골라 주세요.",
            wanted
        );
        prompt.push_str("반드시 아래 형식을 지켜 주세요:\n");
        prompt.push_str("1. 이름: [동물 이름]\n   이유: [추천 이유]\n");
        prompt.push_str("2. 이름: [동물 이름]\n   이유: [추천 이유]\n");

        CompletionRequest::new(prompt)
            .with_system_prompt(self.config.system_prompt.clone())
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawmatch_core::AdoptionState;

    #[test]
    fn test_prompt_lists_candidates_in_rank_order() {
        let a = AnimalRecord::new("1", "콩이", AdoptionState::Available);
        let b = AnimalRecord::new("2", "보리", AdoptionState::Available);
        let ranked = vec![
            RankedCandidate { record: &a, score: 0.91234, rank: 1, position: 0 },
            RankedCandidate { record: &b, score: 0.5, rank: 2, position: 1 },
        ];

        let request = PromptBuilder::default().build("활발한 소형견", &ranked, None, |r| {
            format!("{}의 설명", r.name)
        });

        let prompt = &request.user_prompt;
        assert!(prompt.contains("입양 희망자의 요청: \"활발한 소형견\""));
        assert!(prompt.contains("1. 이름: 콩이 (유사도 0.912)\n   설명: 콩이의 설명"));
        assert!(prompt.contains("2. 이름: 보리 (유사도 0.500)"));
        assert!(prompt.find("콩이").unwrap() < prompt.find("보리").unwrap());
        assert!(prompt.contains("2마리"));
        assert_eq!(request.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(request.max_tokens, 1500);
    }

    #[test]
    fn test_prompt_asks_for_requested_count() {
        let records: Vec<_> = (0..10)
            .map(|i| AnimalRecord::new(i.to_string(), format!("강아지{}", i), AdoptionState::Available))
            .collect();
        let ranked: Vec<_> = records
            .iter()
            .enumerate()
            .map(|(i, record)| RankedCandidate { record, score: 0.9, rank: i + 1, position: i })
            .collect();
        let builder = PromptBuilder::default();

        let prompt = builder.build("q", &ranked, Some(8), |_| String::new()).user_prompt;
        assert!(prompt.contains("가장 잘 맞는 8마리를"));

        let prompt = builder.build("q", &ranked, None, |_| String::new()).user_prompt;
        assert!(prompt.contains("가장 잘 맞는 5마리를"));

        let prompt = builder.build("q", &ranked[..3], Some(8), |_| String::new()).user_prompt;
        assert!(prompt.contains("가장 잘 맞는 3마리를"));
    }
}
