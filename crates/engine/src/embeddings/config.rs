//! Embedding configuration types.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use vecgate_core::config::EmbeddingSettings;
use vecgate_core::{AppError, AppResult, RetryPolicy};

/// Name of the built-in hashing model served by the local provider.
pub const TRIGRAM_MODEL: &str = "trigram-v1";

/// Embedding provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// In-process model
    Local,
    /// OpenAI-compatible HTTP endpoint
    Remote,
}

impl std::str::FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(ProviderKind::Local),
            "remote" => Ok(ProviderKind::Remote),
            _ => Err(AppError::Config(format!(
                "Unknown embedding provider: '{}'. Supported providers: local, remote",
                s
            ))),
        }
    }
}

/// Everything needed to construct an embedding provider.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Expected embedding vector dimensions
    pub dimensions: usize,

    /// Remote endpoint base URL
    pub base_url: Option<String>,

    /// Remote bearer token
    pub api_key: Option<String>,

    /// Maximum texts per remote request
    pub batch_size: usize,

    /// Maximum remote requests in flight for one call
    pub concurrency: usize,

    /// Per-request timeout
    pub timeout: Duration,

    /// Retry budget for transient remote failures
    pub retry: RetryPolicy,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Local,
            model: TRIGRAM_MODEL.to_string(),
            dimensions: 384,
            base_url: None,
            api_key: None,
            batch_size: 32,
            concurrency: 4,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl EmbeddingConfig {
    /// Build from the `embedding` config section and the index dimension.
    pub fn from_settings(settings: &EmbeddingSettings, dimensions: usize) -> AppResult<Self> {
        let provider = settings.provider.parse::<ProviderKind>()?;

        if provider == ProviderKind::Remote && settings.base_url.is_none() {
            return Err(AppError::Config(
                "EMBEDDING_BASE_URL is required for the remote embedding provider".to_string(),
            ));
        }

        Ok(Self {
            provider,
            model: settings.model.clone(),
            dimensions,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            batch_size: settings.batch_size.max(1),
            concurrency: settings.concurrency.max(1),
            timeout: Duration::from_secs(settings.timeout_secs.max(1)),
            retry: RetryPolicy::with_retries(settings.max_retries),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, ProviderKind::Local);
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.batch_size, 32);
    }

    #[test]
    fn test_from_settings_remote() {
        let settings = EmbeddingSettings {
            provider: "Remote".to_string(),
            model: "bge-m3".to_string(),
            base_url: Some("http://tei:80/v1".to_string()),
            api_key: Some("k".to_string()),
            batch_size: 0,
            concurrency: 2,
            timeout_secs: 5,
            max_retries: 4,
        };

        let config = EmbeddingConfig::from_settings(&settings, 1024).unwrap();
        assert_eq!(config.provider, ProviderKind::Remote);
        assert_eq!(config.dimensions, 1024);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.timeout, Duration::from_secs(5));
        // Four retries after the first attempt
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_from_settings_rejects_unknown_provider() {
        let settings = EmbeddingSettings {
            provider: "tei".to_string(),
            ..Default::default()
        };
        let result = EmbeddingConfig::from_settings(&settings, 384);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_from_settings_remote_requires_url() {
        let settings = EmbeddingSettings {
            provider: "remote".to_string(),
            ..Default::default()
        };
        let result = EmbeddingConfig::from_settings(&settings, 384);
        assert!(result.unwrap_err().to_string().contains("EMBEDDING_BASE_URL"));
    }
}
