//! Remote embedding provider for OpenAI-compatible `/embeddings` endpoints
//! (OpenAI, TEI, vLLM, Ollama's `/v1` shim).

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::provider::EmbeddingProvider;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vecgate_core::retry::with_backoff;
use vecgate_core::{AppError, AppResult, RetryPolicy};

#[derive(Debug)]
pub struct RemoteProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
    batch_size: usize,
    concurrency: usize,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response shapes seen in the wild.
#[derive(Deserialize)]
#[serde(untagged)]
enum EmbeddingResponse {
    /// OpenAI / vLLM: `{"data": [{"embedding": [..], "index": 0}]}`
    Data { data: Vec<EmbeddingData> },
    /// `{"embeddings": [[..]]}`
    Embeddings { embeddings: Vec<Vec<f32>> },
    /// TEI `/embed`: `[[..]]`
    Bare(Vec<Vec<f32>>),
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

impl EmbeddingResponse {
    fn into_vectors(self) -> Vec<Vec<f32>> {
        match self {
            EmbeddingResponse::Data { mut data } => {
                if data.iter().all(|d| d.index.is_some()) {
                    data.sort_by_key(|d| d.index);
                }
                data.into_iter().map(|d| d.embedding).collect()
            }
            EmbeddingResponse::Embeddings { embeddings } => embeddings,
            EmbeddingResponse::Bare(vectors) => vectors,
        }
    }
}

impl RemoteProvider {
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                AppError::Config("Remote embedding provider requires a base URL".to_string())
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
            concurrency: config.concurrency.max(1),
            retry: config.retry,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// One request for one chunk of inputs, without retries.
    async fn request_chunk(&self, chunk: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: chunk,
        };

        let response = self
            .authorize(self.client.post(self.endpoint("embeddings")))
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let message = format!("Embedding endpoint returned {}: {}", status, detail.trim());
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                AppError::ProviderUnavailable(message)
            } else {
                AppError::Provider(message)
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Malformed embedding response: {}", e)))?;
        let vectors = parsed.into_vectors();

        if vectors.len() != chunk.len() {
            return Err(AppError::Provider(format!(
                "Embedding endpoint returned {} vectors for {} inputs",
                vectors.len(),
                chunk.len()
            )));
        }

        Ok(vectors)
    }
}

fn map_transport_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        AppError::ProviderUnavailable(format!("Embedding endpoint unreachable: {}", e))
    } else {
        AppError::Provider(format!("Embedding request failed: {}", e))
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for RemoteProvider {
    fn provider_name(&self) -> &str {
        "remote"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[tracing::instrument(skip(self, texts), fields(model = %self.model, inputs = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(batch_size = self.batch_size, "Requesting remote embeddings");

        // `buffered` yields chunk results in submission order
        let requests: Vec<_> = texts
            .chunks(self.batch_size)
            .map(|chunk| {
                with_backoff(self.retry, "remote embedding", move || {
                    self.request_chunk(chunk)
                })
            })
            .collect();
        let chunks: Vec<Vec<Vec<f32>>> = stream::iter(requests)
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(chunks.into_iter().flatten().collect())
    }

    async fn ping(&self) -> AppResult<()> {
        // Any HTTP response means the endpoint is up
        self.authorize(self.client.get(self.endpoint("models")))
            .send()
            .await
            .map(|_| ())
            .map_err(map_transport_error)
    }
}
