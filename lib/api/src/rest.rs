use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use pawmatch_core::{Corpus, Error, QueryPreferences};
use pawmatch_engine::{CorpusStats, Recommender, RecommenderConfig};
use pawmatch_similarity::Recommendation;
use pawmatch_storage::{ResultsLog, Satisfaction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Everything a request handler needs; shared read-only across workers.
pub struct AppState {
    pub recommender: Recommender,
    pub corpus: Corpus,
    pub results: Option<ResultsLog>,
    pub config: RecommenderConfig,
}

impl AppState {
    pub fn new(recommender: Recommender, corpus: Corpus, config: RecommenderConfig) -> Self {
        Self {
            recommender,
            corpus,
            results: None,
            config,
        }
    }

    pub fn with_results_log(mut self, log: ResultsLog) -> Self {
        self.results = Some(log);
        self
    }
}

#[derive(Deserialize)]
struct RecommendRequest {
    query: String,
    available_only: Option<bool>,
    k: Option<usize>,
}

#[derive(Serialize)]
struct RecommendationView {
    #[serde(flatten)]
    recommendation: Recommendation,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<String>,
}

#[derive(Serialize)]
struct RecommendResponse {
    query: String,
    preferences: QueryPreferences,
    recommendations: Vec<RecommendationView>,
}

#[derive(Deserialize)]
struct FeedbackRequest {
    query: String,
    satisfaction: Satisfaction,
    #[serde(default)]
    recommendations: Vec<Recommendation>,
}

#[derive(Serialize)]
struct FeedbackResponse {
    query_id: Uuid,
    rows: usize,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(state: Arc<AppState>, port: u16) -> std::io::Result<()> {
        let data = web::Data::from(state);
        info!(port, "starting REST API");

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(data.clone())
                .configure(RestApi::configure)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }

    /// Route table, shared by the server and the handler tests.
    pub fn configure(cfg: &mut web::ServiceConfig) {
        cfg.route("/recommend", web::post().to(recommend))
            .route("/feedback", web::post().to(feedback))
            .route("/stats", web::get().to(stats))
            .route("/health", web::get().to(health));
    }
}

fn error_response(e: &Error) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e {
        Error::Embedding(_) => HttpResponse::BadGateway().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

async fn recommend(
    state: web::Data<AppState>,
    req: web::Json<RecommendRequest>,
) -> ActixResult<HttpResponse> {
    let req = req.into_inner();
    let query = req.query.trim();
    if query.is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "query must not be empty"
        })));
    }
    let k = req.k.unwrap_or(state.config.top_k);
    if k == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "k must be at least 1"
        })));
    }
    let available_only = req.available_only.unwrap_or(state.config.available_only);

    match state
        .recommender
        .recommend_with_preferences(&state.corpus, query, available_only, k)
        .await
    {
        Ok(outcome) => {
            let link_base = &state.config.link_base;
            let recommendations = outcome
                .recommendations
                .into_iter()
                .map(|recommendation| RecommendationView {
                    link: recommendation.link(link_base),
                    recommendation,
                })
                .collect();
            Ok(HttpResponse::Ok().json(RecommendResponse {
                query: query.to_string(),
                preferences: outcome.preferences,
                recommendations,
            }))
        }
        Err(e) => {
            error!(error = %e, query, "recommendation failed");
            Ok(error_response(&e))
        }
    }
}

async fn feedback(
    state: web::Data<AppState>,
    req: web::Json<FeedbackRequest>,
) -> ActixResult<HttpResponse> {
    let Some(log) = state.results.as_ref() else {
        return Ok(HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "error": "results log is not configured"
        })));
    };

    let req = req.into_inner();
    match log.record(&req.query, &req.recommendations, Some(req.satisfaction)) {
        Ok(query_id) => Ok(HttpResponse::Ok().json(FeedbackResponse {
            query_id,
            rows: req.recommendations.len().max(1),
        })),
        Err(e) => {
            warn!(error = %e, "failed to record feedback");
            Ok(HttpResponse::InternalServerError().json(serde_json::json!({
                "error": e.to_string()
            })))
        }
    }
}

async fn stats(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(CorpusStats::compute(&state.corpus)))
}

async fn health(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "records": state.corpus.len(),
        "rerank": state.recommender.has_reranker(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};
    use pawmatch_core::mock::MockEmbeddingProvider;
    use pawmatch_core::{AdoptionState, AnimalRecord, EmbeddingVector, Gender, ServiceError};
    use tempfile::tempdir;

    fn corpus() -> Corpus {
        let records = vec![
            AnimalRecord::new("a", "콩이", AdoptionState::Available)
                .with_weight(5.0)
                .with_gender(Gender::Male),
            AnimalRecord::new("b", "보리", AdoptionState::Available)
                .with_weight(15.0)
                .with_gender(Gender::Female),
        ];
        let embeddings = vec![
            EmbeddingVector::new("a", vec![1.0, 0.0]),
            EmbeddingVector::new("b", vec![0.0, 1.0]),
        ];
        Corpus::new(records, embeddings).unwrap()
    }

    fn state(embedder: MockEmbeddingProvider) -> web::Data<AppState> {
        let recommender = Recommender::new(Arc::new(embedder));
        web::Data::new(AppState::new(recommender, corpus(), RecommenderConfig::default()))
    }

    #[actix_web::test]
    async fn test_recommend_returns_links() {
        let embedder = MockEmbeddingProvider::new(2).with_vector("소형견", vec![1.0, 0.0]);
        let app = test::init_service(
            App::new().app_data(state(embedder)).configure(RestApi::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/recommend")
            .set_json(serde_json::json!({ "query": "소형견" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let recs = body["recommendations"].as_array().unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0]["uid"], "a");
        assert_eq!(recs[0]["source"], "similarity");
        assert_eq!(recs[0]["link"], "https://www.pimfyvirus.com/search/01_v/a");
        assert_eq!(body["preferences"]["size"], "small");
    }

    #[actix_web::test]
    async fn test_recommend_reports_preferences_used() {
        let embedder = MockEmbeddingProvider::new(2);
        let app = test::init_service(
            App::new().app_data(state(embedder)).configure(RestApi::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/recommend")
            .set_json(serde_json::json!({ "query": "중형견 암컷" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["preferences"]["size"], "medium");
        assert_eq!(body["preferences"]["gender"], "female");
        assert!(body["preferences"]["age"].is_null());
        let recs = body["recommendations"].as_array().unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0]["uid"], "b");
    }

    #[actix_web::test]
    async fn test_recommend_status_codes() {
        let embedder = MockEmbeddingProvider::failing(2, ServiceError::Fatal("down".into()));
        let app = test::init_service(
            App::new().app_data(state(embedder)).configure(RestApi::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/recommend")
            .set_json(serde_json::json!({ "query": "   " }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/recommend")
            .set_json(serde_json::json!({ "query": "산책 좋아하는 아이" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_GATEWAY);
    }

    #[actix_web::test]
    async fn test_feedback_requires_log() {
        let app = test::init_service(
            App::new()
                .app_data(state(MockEmbeddingProvider::new(2)))
                .configure(RestApi::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/feedback")
            .set_json(serde_json::json!({ "query": "소형견", "satisfaction": 4 }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[actix_web::test]
    async fn test_feedback_is_logged() {
        let dir = tempdir().unwrap();
        let log = ResultsLog::open(dir.path().join("results.jsonl")).unwrap();
        let recommender = Recommender::new(Arc::new(MockEmbeddingProvider::new(2)));
        let data = web::Data::new(
            AppState::new(recommender, corpus(), RecommenderConfig::default())
                .with_results_log(log),
        );
        let app = test::init_service(
            App::new().app_data(data.clone()).configure(RestApi::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/feedback")
            .set_json(serde_json::json!({
                "query": "소형견",
                "satisfaction": 5,
                "recommendations": [
                    { "rank": 1, "name": "콩이", "reason": "작아요", "source": "llm" }
                ]
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["rows"], 1);

        let rows = data.results.as_ref().unwrap().read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].satisfaction.map(|s| s.value()), Some(5));

        let req = test::TestRequest::post()
            .uri("/feedback")
            .set_json(serde_json::json!({ "query": "소형견", "satisfaction": 9 }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_stats_and_health() {
        let app = test::init_service(
            App::new()
                .app_data(state(MockEmbeddingProvider::new(2)))
                .configure(RestApi::configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/stats").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["available"], 2);

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["rerank"], false);
    }
}
