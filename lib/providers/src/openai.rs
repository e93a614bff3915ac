//! OpenAI-compatible HTTP clients for embeddings and chat completions.

use async_trait::async_trait;
use pawmatch_core::{
    CompletionProvider, CompletionRequest, EmbeddingProvider, ServiceError, ServiceResult,
    DEFAULT_EMBEDDING_DIM,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_base: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub completion_model: String,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-large".to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIM,
            completion_model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
        }
    }
}

impl OpenAiConfig {
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }
}

fn http_client(config: &OpenAiConfig) -> ServiceResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ServiceError::Fatal(format!("failed to build HTTP client: {}", e)))
}

/// Map a non-success HTTP status to a service error.
///
/// 429 is a rate limit unless the account is out of quota; 408 and 5xx are
/// transient; everything else is fatal.
pub fn classify_status(status: u16, body: &str) -> ServiceError {
    let message = format!("HTTP {}: {}", status, error_message(body));
    match status {
        429 if body.contains("insufficient_quota") => ServiceError::Fatal(message),
        429 => ServiceError::RateLimited(message),
        408 | 500..=599 => ServiceError::Transient(message),
        _ => ServiceError::Fatal(message),
    }
}

pub fn classify_transport(err: reqwest::Error) -> ServiceError {
    if err.is_builder() {
        ServiceError::Fatal(err.to_string())
    } else {
        ServiceError::Transient(err.to_string())
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.chars().take(200).collect(),
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

/// Decode an `/embeddings` body into vectors ordered by input index.
pub fn parse_embedding_response(
    body: &str,
    expected: usize,
    dimension: usize,
) -> ServiceResult<Vec<Vec<f32>>> {
    let mut parsed: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::Fatal(format!("malformed embedding response: {}", e)))?;

    if parsed.data.len() != expected {
        return Err(ServiceError::Fatal(format!(
            "expected {} embeddings, got {}",
            expected,
            parsed.data.len()
        )));
    }
    parsed.data.sort_by_key(|datum| datum.index);

    parsed
        .data
        .into_iter()
        .map(|datum| {
            if datum.embedding.len() == dimension {
                Ok(datum.embedding)
            } else {
                Err(ServiceError::Fatal(format!(
                    "embedding {} has dimension {}, expected {}",
                    datum.index,
                    datum.embedding.len(),
                    dimension
                )))
            }
        })
        .collect()
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Text of the first choice of a `/chat/completions` body.
pub fn parse_chat_response(body: &str) -> ServiceResult<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::Fatal(format!("malformed completion response: {}", e)))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ServiceError::Fatal("completion response has no content".to_string()))
}

async fn post_json(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &serde_json::Value,
) -> ServiceResult<String> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await
        .map_err(classify_transport)?;

    let status = response.status();
    let text = response.text().await.map_err(classify_transport)?;
    if !status.is_success() {
        return Err(classify_status(status.as_u16(), &text));
    }
    Ok(text)
}

pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    config: OpenAiConfig,
    api_key: String,
}

impl OpenAiEmbeddings {
    pub fn new(config: OpenAiConfig, api_key: impl Into<String>) -> ServiceResult<Self> {
        Ok(Self {
            client: http_client(&config)?,
            config,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Fatal("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> ServiceResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.config.embedding_model,
            "input": texts,
            "encoding_format": "float",
        });
        let url = self.config.endpoint("embeddings");
        let text = post_json(&self.client, &url, &self.api_key, &body).await?;
        debug!(inputs = texts.len(), model = %self.config.embedding_model, "embeddings received");
        parse_embedding_response(&text, texts.len(), self.config.embedding_dimension)
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dimension
    }

    fn name(&self) -> &str {
        &self.config.embedding_model
    }
}

pub struct OpenAiCompletions {
    client: reqwest::Client,
    config: OpenAiConfig,
    api_key: String,
}

impl OpenAiCompletions {
    pub fn new(config: OpenAiConfig, api_key: impl Into<String>) -> ServiceResult<Self> {
        Ok(Self {
            client: http_client(&config)?,
            config,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletions {
    async fn complete(&self, request: &CompletionRequest) -> ServiceResult<String> {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(json!({"role": "system", "content": request.system_prompt}));
        }
        messages.push(json!({"role": "user", "content": request.user_prompt}));

        let body = json!({
            "model": self.config.completion_model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        let url = self.config.endpoint("chat/completions");
        let text = post_json(&self.client, &url, &self.api_key, &body).await?;
        parse_chat_response(&text)
    }

    fn name(&self) -> &str {
        &self.config.completion_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(429, r#"{"error": {"message": "Rate limit reached"}}"#),
            ServiceError::RateLimited(m) if m.contains("Rate limit reached")
        ));
        assert!(matches!(
            classify_status(429, r#"{"error": {"message": "quota", "code": "insufficient_quota"}}"#),
            ServiceError::Fatal(_)
        ));
        assert!(matches!(classify_status(503, "unavailable"), ServiceError::Transient(_)));
        assert!(matches!(classify_status(408, ""), ServiceError::Transient(_)));
        assert!(matches!(classify_status(401, "bad key"), ServiceError::Fatal(_)));
        assert!(matches!(classify_status(400, "bad request"), ServiceError::Fatal(_)));
    }

    #[test]
    fn test_parse_embedding_response_orders_by_index() {
        let body = r#"{"data": [
            {"index": 1, "embedding": [0.0, 1.0]},
            {"index": 0, "embedding": [1.0, 0.0]}
        ]}"#;
        let vectors = parse_embedding_response(body, 2, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);

        assert!(parse_embedding_response(body, 3, 2).is_err());
        assert!(parse_embedding_response(body, 2, 3).is_err());
        assert!(parse_embedding_response("not json", 2, 2).is_err());
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "1. 이름: 콩이"}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap(), "1. 이름: 콩이");
        assert!(parse_chat_response(r#"{"choices": []}"#).is_err());
        assert!(parse_chat_response(r#"{"choices": [{"message": {"content": null}}]}"#).is_err());
    }

    #[test]
    fn test_endpoint_join() {
        let config = OpenAiConfig {
            api_base: "http://localhost:8080/v1/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.endpoint("embeddings"), "http://localhost:8080/v1/embeddings");
    }
}
