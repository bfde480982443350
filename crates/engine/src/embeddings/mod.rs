//! Embedding engine.
//!
//! Wraps the configured provider and enforces the index dimension on every
//! vector it hands out.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::{EmbeddingConfig, ProviderKind};
pub use provider::{create_provider, EmbeddingProvider};

use std::sync::Arc;
use vecgate_core::{AppError, AppResult};

/// Provider plus the dimension every vector must have.
#[derive(Debug, Clone)]
pub struct EmbeddingEngine {
    provider: Arc<dyn EmbeddingProvider>,
    dimension: usize,
}

impl EmbeddingEngine {
    /// Fails with `Config` when the provider's declared dimension differs
    /// from the index dimension.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, dimension: usize) -> AppResult<Self> {
        if provider.dimensions() != dimension {
            return Err(AppError::Config(format!(
                "Embedding provider '{}' (model {}) produces {}-dimensional vectors but VECTOR_DIMENSION is {}",
                provider.provider_name(),
                provider.model_name(),
                provider.dimensions(),
                dimension
            )));
        }

        Ok(Self {
            provider,
            dimension,
        })
    }

    /// Build the configured provider and wrap it.
    pub async fn from_config(config: &EmbeddingConfig) -> AppResult<Self> {
        tracing::debug!(
            "Creating embedding provider: provider={:?}, model={}, dimensions={}",
            config.provider,
            config.model,
            config.dimensions
        );

        let provider = create_provider(config).await?;
        Self::new(provider, config.dimensions)
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed texts, one vector per input in input order.
    ///
    /// A vector of the wrong length is a configuration error and is never
    /// truncated or padded.
    pub async fn embed_texts(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            "Embedding {} texts using provider '{}' (model: {})",
            texts.len(),
            self.provider.provider_name(),
            self.provider.model_name()
        );

        let embeddings = self.provider.embed_batch(texts).await?;

        if embeddings.len() != texts.len() {
            return Err(AppError::Provider(format!(
                "Provider returned {} embeddings for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }

        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimension) {
            tracing::error!(
                "Embedding dimension mismatch: got {}, expected {}",
                bad.len(),
                self.dimension
            );
            return Err(AppError::Config(format!(
                "Embedding dimension mismatch: provider returned {} values, VECTOR_DIMENSION is {}",
                bad.len(),
                self.dimension
            )));
        }

        Ok(embeddings)
    }

    /// Embed a single text.
    pub async fn embed_text(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut embeddings = self.embed_texts(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| AppError::Provider("No embedding returned".to_string()))
    }

    /// Provider readiness without embedding anything.
    pub async fn ping(&self) -> AppResult<()> {
        self.provider.ping().await
    }
}
