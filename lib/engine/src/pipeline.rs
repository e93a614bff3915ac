//! The recommendation pipeline: extract, filter, rank, re-rank.

use pawmatch_core::{
    normalize_query, CompletionProvider, Corpus, DescriptionBuilder, EmbeddingProvider,
    HardFilter, PreferenceExtractor, QueryPreferences, Result,
};
use pawmatch_similarity::{
    LlmReranker, PromptBuilder, Recommendation, ResponseParser, SimilarityRanker,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::RecommenderConfig;

pub const DEFAULT_CANDIDATE_POOL: usize = 10;

/// A query's recommendations together with the preferences that filtered them.
#[derive(Debug, Clone)]
pub struct RecommendOutcome {
    pub preferences: QueryPreferences,
    pub recommendations: Vec<Recommendation>,
}

/// Composes the pipeline stages. Holds no per-query state, so one instance
/// can serve any number of queries against a shared [`Corpus`].
pub struct Recommender {
    extractor: PreferenceExtractor,
    filter: HardFilter,
    ranker: SimilarityRanker,
    reranker: Option<LlmReranker>,
    describer: DescriptionBuilder,
    candidate_pool: usize,
}

impl Recommender {
    /// Similarity-only recommender with default settings.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            extractor: PreferenceExtractor::default(),
            filter: HardFilter::default(),
            ranker: SimilarityRanker::new(embedder),
            reranker: None,
            describer: DescriptionBuilder::default(),
            candidate_pool: DEFAULT_CANDIDATE_POOL,
        }
    }

    pub fn from_config(
        config: &RecommenderConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        completer: Option<Arc<dyn CompletionProvider>>,
    ) -> Result<Self> {
        config.validate()?;

        let reranker = completer.filter(|_| config.rerank).map(|completer| {
            LlmReranker::with_parts(
                completer,
                PromptBuilder::new(config.prompt.clone()),
                ResponseParser::new(config.response_format.clone()),
            )
        });

        Ok(Self {
            extractor: PreferenceExtractor::new(config.vocabulary.clone()),
            filter: HardFilter::new(config.age_windows.clone()),
            ranker: SimilarityRanker::new(embedder),
            reranker,
            describer: DescriptionBuilder::new(config.description.clone()),
            candidate_pool: config.candidate_pool,
        })
    }

    pub fn with_reranker(mut self, completer: Arc<dyn CompletionProvider>) -> Self {
        self.reranker = Some(LlmReranker::new(completer));
        self
    }

    pub fn without_reranker(mut self) -> Self {
        self.reranker = None;
        self
    }

    pub fn with_candidate_pool(mut self, candidate_pool: usize) -> Self {
        self.candidate_pool = candidate_pool.max(1);
        self
    }

    pub fn describer(&self) -> &DescriptionBuilder {
        &self.describer
    }

    pub fn has_reranker(&self) -> bool {
        self.reranker.is_some()
    }

    pub fn preferences(&self, query: &str) -> QueryPreferences {
        self.extractor.extract(query)
    }

    /// Recommend up to `k` animals from `corpus` for a free-text query.
    ///
    /// No surviving candidates is an empty result, not an error. Embedding
    /// failures abort the query; re-ranking failures fall back to the
    /// similarity ranking.
    pub async fn recommend(
        &self,
        corpus: &Corpus,
        query: &str,
        available_only: bool,
        k: usize,
    ) -> Result<Vec<Recommendation>> {
        Ok(self
            .recommend_with_preferences(corpus, query, available_only, k)
            .await?
            .recommendations)
    }

    /// Like [`Recommender::recommend`], also returning the extracted
    /// preferences the candidates were filtered with.
    pub async fn recommend_with_preferences(
        &self,
        corpus: &Corpus,
        query: &str,
        available_only: bool,
        k: usize,
    ) -> Result<RecommendOutcome> {
        let prefs = self.extractor.extract(query);
        let recommendations = if query.trim().is_empty() || k == 0 {
            Vec::new()
        } else {
            self.run(corpus, query, &prefs, available_only, k).await?
        };
        Ok(RecommendOutcome {
            preferences: prefs,
            recommendations,
        })
    }

    async fn run(
        &self,
        corpus: &Corpus,
        query: &str,
        prefs: &QueryPreferences,
        available_only: bool,
        k: usize,
    ) -> Result<Vec<Recommendation>> {
        let candidates = corpus.candidates(available_only)?;
        let filtered = self.filter.filter(&candidates, prefs)?;
        debug!(
            corpus = corpus.len(),
            candidates = candidates.len(),
            filtered = filtered.len(),
            "candidates selected"
        );
        if filtered.is_empty() {
            info!(query, "no candidates survive filtering");
            return Ok(Vec::new());
        }

        let normalized = normalize_query(query);
        let query_text = if normalized.is_empty() { prefs.text.trim() } else { normalized.as_str() };
        let pool = self.candidate_pool.max(k);
        let ranked = self.ranker.rank(query_text, &filtered, pool).await?;
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let mut recommendations = match &self.reranker {
            None => Recommendation::fallback(&ranked),
            Some(reranker) => {
                match reranker
                    .rerank(query, &ranked, Some(k), |record| {
                        self.describer.prompt_description(record)
                    })
                    .await
                {
                    Ok(recommendations) => recommendations,
                    Err(e) if e.is_degradable() => {
                        warn!(error = %e, "re-ranking degraded, using similarity ranking");
                        Recommendation::fallback(&ranked)
                    }
                    Err(e) => return Err(e),
                }
            }
        };
        recommendations.truncate(k);

        info!(
            query,
            filtered = filtered.len(),
            ranked = ranked.len(),
            returned = recommendations.len(),
            "recommendation complete"
        );
        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawmatch_core::mock::{MockCompletionProvider, MockEmbeddingProvider};
    use pawmatch_core::{AdoptionState, AnimalRecord, EmbeddingVector, Error, Gender, ServiceError};
    use pawmatch_similarity::RecommendationSource;

    fn corpus() -> Corpus {
        let records = vec![
            AnimalRecord::new("a", "콩이", AdoptionState::Available)
                .with_weight(5.0)
                .with_gender(Gender::Male),
            AnimalRecord::new("b", "보리", AdoptionState::Available)
                .with_weight(15.0)
                .with_gender(Gender::Female),
            AnimalRecord::new("c", "두부", AdoptionState::Available)
                .with_weight(3.0)
                .with_gender(Gender::Male),
            AnimalRecord::new("d", "달이", "입양완료")
                .with_weight(4.0)
                .with_gender(Gender::Male),
        ];
        let embeddings = vec![
            EmbeddingVector::new("a", vec![1.0, 0.0, 0.0, 0.0]),
            EmbeddingVector::new("b", vec![0.0, 1.0, 0.0, 0.0]),
            EmbeddingVector::new("c", vec![0.6, 0.8, 0.0, 0.0]),
            EmbeddingVector::new("d", vec![1.0, 0.0, 0.0, 0.0]),
        ];
        Corpus::new(records, embeddings).unwrap()
    }

    fn embedder() -> Arc<MockEmbeddingProvider> {
        Arc::new(
            MockEmbeddingProvider::new(4)
                .with_vector("소형견 수컷", vec![1.0, 0.0, 0.0, 0.0])
                .with_vector("차분한 아이", vec![0.0, 1.0, 0.0, 0.0]),
        )
    }

    #[tokio::test]
    async fn test_similarity_only_pipeline() {
        let corpus = corpus();
        let recommender = Recommender::new(embedder());
        let recs = recommender.recommend(&corpus, "소형견 수컷", true, 5).await.unwrap();

        let uids: Vec<_> = recs.iter().map(|r| r.uid.as_deref().unwrap()).collect();
        assert_eq!(uids, vec!["a", "c"]);
        assert!(recs.iter().all(|r| r.source == RecommendationSource::Similarity));
    }

    #[tokio::test]
    async fn test_empty_filter_result_skips_services() {
        let corpus = corpus();
        let embedder = embedder();
        let completer = Arc::new(MockCompletionProvider::with_response("1. 이름: 콩이"));
        let recommender = Recommender::new(embedder.clone()).with_reranker(completer.clone());

        let recs = recommender.recommend(&corpus, "대형견 암컷", true, 5).await.unwrap();
        assert!(recs.is_empty());
        assert_eq!(embedder.calls(), 0);
        assert_eq!(completer.calls(), 0);
    }

    #[tokio::test]
    async fn test_rerank_result_is_truncated_to_k() {
        let corpus = corpus();
        let completer = Arc::new(MockCompletionProvider::with_response(
            "1. 이름: 두부\n   이유: 작아요\n2. 이름: 콩이\n   이유: 수컷이에요",
        ));
        let recommender = Recommender::new(embedder()).with_reranker(completer.clone());

        let recs = recommender.recommend(&corpus, "소형견 수컷", true, 1).await.unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].uid.as_deref(), Some("c"));
        assert_eq!(recs[0].reason.as_deref(), Some("작아요"));
        assert_eq!(recs[0].source, RecommendationSource::Llm);

        let prompt = completer.last_request().unwrap().user_prompt;
        assert!(prompt.contains("콩이") && prompt.contains("두부"));
        assert!(!prompt.contains("달이"));
    }

    #[tokio::test]
    async fn test_rerank_prompt_asks_for_k_beyond_default() {
        let records: Vec<_> = (0..10)
            .map(|i| {
                AnimalRecord::new(format!("s{}", i), format!("강아지{}", i), AdoptionState::Available)
                    .with_weight(4.0)
                    .with_gender(Gender::Male)
            })
            .collect();
        let embeddings = (0..10)
            .map(|i| EmbeddingVector::new(format!("s{}", i), vec![1.0, i as f32 * 0.1, 0.0, 0.0]))
            .collect();
        let corpus = Corpus::new(records, embeddings).unwrap();

        let response: String = (0..8)
            .map(|i| format!("{}. 이름: 강아지{}\n   이유: 작아요\n", i + 1, 7 - i))
            .collect();
        let completer = Arc::new(MockCompletionProvider::with_response(response));
        let recommender = Recommender::new(embedder()).with_reranker(completer.clone());

        let recs = recommender.recommend(&corpus, "소형견", true, 8).await.unwrap();

        let prompt = completer.last_request().unwrap().user_prompt;
        assert!(prompt.contains("가장 잘 맞는 8마리를"));
        assert_eq!(recs.len(), 8);
        assert_eq!(recs[0].uid.as_deref(), Some("s7"));
        assert!(recs.iter().all(|r| r.source == RecommendationSource::Llm && r.is_complete()));
    }

    #[tokio::test]
    async fn test_outcome_reports_filtering_preferences() {
        let corpus = corpus();
        let recommender = Recommender::new(embedder());

        let outcome = recommender
            .recommend_with_preferences(&corpus, "소형견 수컷", true, 5)
            .await
            .unwrap();
        assert_eq!(outcome.preferences, recommender.preferences("소형견 수컷"));
        assert_eq!(outcome.preferences.gender, Some(Gender::Male));
        assert_eq!(outcome.recommendations.len(), 2);

        let outcome = recommender
            .recommend_with_preferences(&corpus, "대형견", true, 0)
            .await
            .unwrap();
        assert!(outcome.recommendations.is_empty());
        assert!(outcome.preferences.size.is_some());
    }

    #[tokio::test]
    async fn test_completion_failure_falls_back() {
        let corpus = corpus();
        let completer = Arc::new(MockCompletionProvider::failing(ServiceError::Fatal("down".into())));
        let recommender = Recommender::new(embedder()).with_reranker(completer);

        let recs = recommender.recommend(&corpus, "차분한 아이", false, 2).await.unwrap();
        let uids: Vec<_> = recs.iter().map(|r| r.uid.as_deref().unwrap()).collect();
        assert_eq!(uids, vec!["b", "c"]);
        assert!(recs.iter().all(|r| r.reason.is_none()));
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts() {
        let corpus = corpus();
        let embedder = Arc::new(MockEmbeddingProvider::failing(
            4,
            ServiceError::RateLimited("429".into()),
        ));
        let err = Recommender::new(embedder)
            .recommend(&corpus, "소형견", true, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_from_config_respects_rerank_flag() {
        let config = RecommenderConfig {
            rerank: false,
            ..Default::default()
        };
        let completer: Arc<dyn CompletionProvider> =
            Arc::new(MockCompletionProvider::with_response("1. 이름: 콩이"));
        let recommender = Recommender::from_config(&config, embedder(), Some(completer)).unwrap();
        assert!(!recommender.has_reranker());

        let bad = RecommenderConfig {
            top_k: 0,
            ..Default::default()
        };
        assert!(Recommender::from_config(&bad, embedder(), None).is_err());
    }
}
