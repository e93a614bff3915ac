use pawmatch_core::{AgeWindows, DescriptionConfig, Error, Result, Vocabulary};
use pawmatch_providers::{BatchConfig, OpenAiConfig, RetryPolicy};
use pawmatch_similarity::{PromptConfig, ResponseFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_LINK_BASE: &str = "https://www.pimfyvirus.com/search/01_v";

/// Every tunable of the recommender, loadable from a JSON file.
///
/// Missing sections and fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Similarity candidates handed to the re-ranker
    pub candidate_pool: usize,
    /// Recommendations returned when the caller does not say
    pub top_k: usize,
    pub available_only: bool,
    pub rerank: bool,
    pub link_base: String,
    pub vocabulary: Vocabulary,
    pub age_windows: AgeWindows,
    pub description: DescriptionConfig,
    pub prompt: PromptConfig,
    pub response_format: ResponseFormat,
    pub openai: OpenAiConfig,
    pub retry: RetryPolicy,
    pub batch: BatchConfig,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            candidate_pool: 10,
            top_k: 5,
            available_only: true,
            rerank: true,
            link_base: DEFAULT_LINK_BASE.to_string(),
            vocabulary: Vocabulary::default(),
            age_windows: AgeWindows::default(),
            description: DescriptionConfig::default(),
            prompt: PromptConfig::default(),
            response_format: ResponseFormat::default(),
            openai: OpenAiConfig::default(),
            retry: RetryPolicy::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl RecommenderConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.candidate_pool == 0, "candidate_pool must be at least 1"),
            (self.top_k == 0, "top_k must be at least 1"),
            (self.retry.max_attempts == 0, "retry.max_attempts must be at least 1"),
            (self.batch.batch_size == 0, "batch.batch_size must be at least 1"),
            (self.openai.embedding_dimension == 0, "openai.embedding_dimension must be at least 1"),
            (self.description.max_chars == 0, "description.max_chars must be at least 1"),
            (self.description.field_budget == 0, "description.field_budget must be at least 1"),
            (self.prompt.max_recommendations == 0, "prompt.max_recommendations must be at least 1"),
            (
                self.response_format.name_markers.is_empty()
                    || self.response_format.reason_markers.is_empty(),
                "response_format needs at least one name and one reason marker",
            ),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(Error::InvalidConfig(message.to_string())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawmatch_core::TruncationOrder;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = RecommenderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.candidate_pool, 10);
        assert_eq!(config.top_k, 5);
        assert!(config.available_only);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pawmatch.json");
        fs::write(
            &path,
            r#"{"top_k": 3, "description": {"truncation": "prefer_rescue_story"}, "retry": {"max_attempts": 5}}"#,
        )
        .unwrap();

        let config = RecommenderConfig::load(&path).unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.candidate_pool, 10);
        assert_eq!(config.description.truncation, TruncationOrder::PreferRescueStory);
        assert_eq!(config.description.max_chars, 30_000);
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = RecommenderConfig {
            candidate_pool: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = RecommenderConfig::default();
        config.batch.batch_size = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            RecommenderConfig::load(dir.path().join("missing.json")),
            Err(Error::Io(_))
        ));

        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(RecommenderConfig::load(&path), Err(Error::Serialization(_))));
    }
}
