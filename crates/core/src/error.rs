//! Error types for vecgate.
//!
//! This module defines a unified error enum covering every failure category
//! of the gateway: caller input, configuration, the embedding provider, the
//! vector store, and lookups of unknown documents.

use thiserror::Error;

/// Unified error type for vecgate.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller input rejected before any I/O (empty text, out-of-range limit)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors, including provider/schema dimension mismatches.
    /// Fatal at startup, never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding backend unreachable or timed out after all retries
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Embedding backend answered, but rejected the request or sent a malformed body
    #[error("Embedding provider error: {0}")]
    Provider(String),

    /// Index schema missing, or the backing store unreachable after all retries
    #[error("Index not ready: {0}")]
    IndexNotReady(String),

    /// Backing store failures that are not connectivity problems
    #[error("Store error: {0}")]
    Store(String),

    /// Unknown document id
    #[error("Not found: {0}")]
    NotFound(String),

    /// A bulk write completed but some records were not persisted
    #[error("Bulk write failed for {} document(s): {}", failed_ids.len(), failed_ids.join(", "))]
    PartialWrite { failed_ids: Vec<String> },

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether a caller may reasonably retry the failed operation unchanged.
    ///
    /// Only connectivity-class failures qualify. The retry helper in
    /// [`crate::retry`] uses this to decide which attempts to repeat.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::ProviderUnavailable(_) | AppError::IndexNotReady(_)
        )
    }

    /// Short machine-readable category, used in logs and HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Config(_) => "configuration_error",
            AppError::ProviderUnavailable(_) => "provider_unavailable",
            AppError::Provider(_) => "provider_error",
            AppError::IndexNotReady(_) => "index_not_ready",
            AppError::Store(_) => "store_error",
            AppError::NotFound(_) => "not_found",
            AppError::PartialWrite { .. } => "partial_write",
            AppError::Io(_) => "io_error",
            AppError::Serialization(_) => "serialization_error",
            AppError::Other(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
