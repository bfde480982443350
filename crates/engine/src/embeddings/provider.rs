//! Embedding provider trait and factory.

use crate::embeddings::config::{EmbeddingConfig, ProviderKind, TRIGRAM_MODEL};
use std::sync::Arc;
use vecgate_core::{AppError, AppResult};

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "fastembed", "remote")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    ///
    /// Returns one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Provider("No embedding returned".to_string()))
    }

    /// Lightweight readiness check. Must not run an embedding.
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Create an embedding provider based on configuration.
///
/// Local providers that load a model verify its native dimension against
/// `config.dimensions` here, so a mismatch fails at startup.
pub async fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        ProviderKind::Local if config.model == TRIGRAM_MODEL => {
            let provider = super::providers::trigram::TrigramProvider::new(config.dimensions);
            Ok(Arc::new(provider))
        }

        #[cfg(feature = "fastembed")]
        ProviderKind::Local => {
            let provider =
                super::providers::fastembed::FastEmbedProvider::load(&config.model, config.dimensions)
                    .await?;
            Ok(Arc::new(provider))
        }

        #[cfg(not(feature = "fastembed"))]
        ProviderKind::Local => Err(AppError::Config(format!(
            "Local model '{}' needs the `fastembed` feature. Built-in local model: {}",
            config.model, TRIGRAM_MODEL
        ))),

        ProviderKind::Remote => {
            let provider = super::providers::remote::RemoteProvider::new(config)?;
            Ok(Arc::new(provider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_trigram_provider() {
        let config = EmbeddingConfig::default();

        let provider = create_provider(&config).await.unwrap();
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 384);
    }

    #[tokio::test]
    async fn test_create_remote_provider() {
        let config = EmbeddingConfig {
            provider: ProviderKind::Remote,
            model: "text-embedding-3-small".to_string(),
            base_url: Some("http://127.0.0.1:9/v1".to_string()),
            dimensions: 1536,
            ..Default::default()
        };

        let provider = create_provider(&config).await.unwrap();
        assert_eq!(provider.provider_name(), "remote");
        assert_eq!(provider.model_name(), "text-embedding-3-small");
        assert_eq!(provider.dimensions(), 1536);
    }

    #[cfg(not(feature = "fastembed"))]
    #[tokio::test]
    async fn test_unknown_local_model_without_feature() {
        let config = EmbeddingConfig {
            model: "multilingual-e5-large".to_string(),
            ..Default::default()
        };

        let result = create_provider(&config).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let config = EmbeddingConfig::default();
        let provider = create_provider(&config).await.unwrap();

        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
        assert!(provider.ping().await.is_ok());
    }
}
