use crate::error::EmbeddingServiceError;
use crate::traits::Embedder;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_EMBEDDING_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct EmbedderConfig {
    pub endpoint: Url,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Restore request order from the provider's `index` field and insist on one
/// vector per input.
fn vectors_in_request_order(
    response: EmbeddingResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingServiceError> {
    if response.data.len() != expected {
        return Err(EmbeddingServiceError::CountMismatch {
            expected,
            actual: response.data.len(),
        });
    }

    let mut data = response.data;
    data.sort_by_key(|entry| entry.index);

    let mut vectors = Vec::with_capacity(expected);
    for (position, entry) in data.into_iter().enumerate() {
        if entry.index != position {
            return Err(EmbeddingServiceError::MalformedResponse(format!(
                "embedding indices are not contiguous: expected {position}, got {}",
                entry.index
            )));
        }
        if entry.embedding.is_empty() {
            return Err(EmbeddingServiceError::MalformedResponse(format!(
                "empty embedding vector at index {position}"
            )));
        }
        vectors.push(entry.embedding);
    }

    Ok(vectors)
}

/// Client for an OpenAI-compatible remote embeddings endpoint. Sends the
/// whole batch in one request.
pub struct HttpEmbedder {
    config: EmbedderConfig,
    client: Client,
}

impl HttpEmbedder {
    pub fn new(config: EmbedderConfig) -> Result<Self, EmbeddingServiceError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(batch = texts.len(), model = %self.config.model, "embedding batch");

        let mut request = self
            .client
            .post(self.config.endpoint.clone())
            .json(&EmbeddingRequest {
                model: &self.config.model,
                input: texts,
            });

        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingServiceError::Backend {
                status: status.as_u16(),
                details: response.text().await.unwrap_or_default(),
            });
        }

        let payload: EmbeddingResponse = response.json().await?;
        vectors_in_request_order(payload, texts.len())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingServiceError> {
        let vectors = self.embed(&[text.to_string()]).await?;
        vectors.into_iter().next().ok_or_else(|| {
            EmbeddingServiceError::MalformedResponse("no vector for query".to_string())
        })
    }
}
