//! Composition root: builds the provider, index, store and search engine
//! from configuration and owns their shared handles.

use crate::embeddings::{EmbeddingConfig, EmbeddingEngine};
use crate::lancedb_index::LanceDbIndex;
use crate::memory_index::MemoryIndex;
use crate::search::SearchEngine;
use crate::store::DocumentStore;
use crate::types::{HealthReport, IndexSchema, SchemaAction};
use crate::vector_index::VectorIndex;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use vecgate_core::config::StoreConfig;
use vecgate_core::{AppConfig, AppError, AppResult, RetryPolicy};

/// Index and model summary for `vecgate index stats`.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub backend: String,
    pub collection: String,
    pub schema: Option<IndexSchema>,
    pub documents: Option<usize>,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct Gateway {
    index: Arc<dyn VectorIndex>,
    embeddings: EmbeddingEngine,
    schema: IndexSchema,
    collection: String,
    store: DocumentStore,
    search: SearchEngine,
}

/// Open the configured backend.
pub async fn open_index(config: &StoreConfig) -> AppResult<Arc<dyn VectorIndex>> {
    match config.backend.trim().to_lowercase().as_str() {
        "lancedb" => {
            let retry = RetryPolicy::with_retries(config.max_retries);
            let index = LanceDbIndex::connect(
                &config.uri,
                &config.collection,
                Duration::from_secs(config.timeout_secs.max(1)),
                retry,
            )
            .await?;
            Ok(Arc::new(index))
        }
        "memory" => Ok(Arc::new(MemoryIndex::new(config.collection.clone()))),
        other => Err(AppError::Config(format!(
            "Unknown store backend: '{}'. Supported backends: lancedb, memory",
            other
        ))),
    }
}

impl Gateway {
    /// Wire already-built parts together.
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embeddings: EmbeddingEngine,
        schema: IndexSchema,
        collection: impl Into<String>,
        max_results: usize,
        lazy_init: bool,
    ) -> Self {
        let store = DocumentStore::new(Arc::clone(&index), embeddings.clone(), schema, lazy_init);
        let search = SearchEngine::new(Arc::clone(&index), embeddings.clone(), max_results);

        Self {
            index,
            embeddings,
            schema,
            collection: collection.into(),
            store,
            search,
        }
    }

    /// Build everything from configuration without touching the schema.
    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let schema = IndexSchema::from_config(&config.vector)?;
        let embedding_config = EmbeddingConfig::from_settings(&config.embedding, schema.dimension)?;
        let embeddings = EmbeddingEngine::from_config(&embedding_config).await?;
        let index = open_index(&config.store).await?;

        tracing::info!(
            "Gateway using {} backend '{}' at {}, provider {} (model {})",
            index.backend_name(),
            config.store.collection,
            config.store.uri,
            embeddings.provider().provider_name(),
            embeddings.provider().model_name()
        );

        Ok(Self::new(
            index,
            embeddings,
            schema,
            config.store.collection.clone(),
            config.vector.max_results,
            config.vector.lazy_index_init,
        ))
    }

    /// Startup path: connect, then create or verify the schema unless lazy
    /// initialization is on. `FORCE_RECREATE_INDEX` applies here.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let gateway = Self::connect(config).await?;

        if config.vector.lazy_index_init && !config.vector.force_recreate_index {
            tracing::info!("Lazy index initialization enabled; schema is created on first write");
        } else {
            gateway
                .ensure_schema(config.vector.force_recreate_index)
                .await?;
        }

        Ok(gateway)
    }

    /// Create, keep or rebuild the index for the configured schema.
    pub async fn ensure_schema(&self, force_recreate: bool) -> AppResult<SchemaAction> {
        let action = self.index.ensure_schema(self.schema, force_recreate).await?;
        tracing::info!("Index schema {:?}: {}", action, self.schema);
        Ok(action)
    }

    /// Create the schema if the index has none. An existing index is never
    /// rebuilt here; one whose schema differs from the configured schema is a
    /// `Config` error.
    pub async fn ensure_schema_exists(&self) -> AppResult<SchemaAction> {
        match self.index.schema().await {
            None => self.ensure_schema(false).await,
            Some(existing) if existing == self.schema => Ok(SchemaAction::Reused),
            Some(existing) => Err(AppError::Config(format!(
                "Collection '{}' was created with {} but the configuration asks for {}; \
                 run `vecgate index ensure --force` to rebuild it",
                self.collection, existing, self.schema
            ))),
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn search(&self) -> &SearchEngine {
        &self.search
    }

    pub fn schema(&self) -> IndexSchema {
        self.schema
    }

    /// Connectivity of the store and the provider. Never embeds or searches.
    pub async fn health(&self) -> HealthReport {
        let (store, provider) = tokio::join!(self.index.ping(), self.embeddings.ping());

        if let Err(e) = &store {
            tracing::warn!("Health check: store unreachable: {}", e);
        }
        if let Err(e) = &provider {
            tracing::warn!("Health check: embedding provider not ready: {}", e);
        }

        let store_connected = store.is_ok();
        let provider_ready = provider.is_ok();
        HealthReport {
            status: if store_connected && provider_ready {
                "healthy".to_string()
            } else {
                "unhealthy".to_string()
            },
            store_connected,
            provider_ready,
            timestamp: Utc::now(),
        }
    }

    pub async fn stats(&self) -> AppResult<IndexStats> {
        let schema = self.index.schema().await;
        let documents = match schema {
            Some(_) => Some(self.index.count().await?),
            None => None,
        };

        Ok(IndexStats {
            backend: self.index.backend_name().to_string(),
            collection: self.collection.clone(),
            schema,
            documents,
            provider: self.embeddings.provider().provider_name().to_string(),
            model: self.embeddings.provider().model_name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;
    use crate::types::DistanceMetric;

    fn memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.store.backend = "memory".to_string();
        config.vector.dimension = 64;
        config
    }

    #[tokio::test]
    async fn test_from_config_creates_schema() {
        let gateway = Gateway::from_config(&memory_config()).await.unwrap();

        let stats = gateway.stats().await.unwrap();
        assert_eq!(stats.backend, "memory");
        assert_eq!(stats.documents, Some(0));
        assert_eq!(stats.model, "trigram-v1");
        assert_eq!(gateway.ensure_schema(false).await.unwrap(), SchemaAction::Reused);
    }

    #[tokio::test]
    async fn test_lazy_config_skips_schema() {
        let mut config = memory_config();
        config.vector.lazy_index_init = true;

        let gateway = Gateway::from_config(&config).await.unwrap();
        assert!(gateway.stats().await.unwrap().schema.is_none());

        gateway.store().create("first write".into()).await.unwrap();
        assert_eq!(gateway.stats().await.unwrap().documents, Some(1));
    }

    fn gateway_over(index: Arc<dyn VectorIndex>, metric: DistanceMetric) -> Gateway {
        let schema = IndexSchema::new(64, metric).unwrap();
        let embeddings =
            EmbeddingEngine::new(Arc::new(TrigramProvider::new(64)), 64).unwrap();
        Gateway::new(index, embeddings, schema, "documents", 10, false)
    }

    async fn open_lancedb(uri: &str) -> Arc<dyn VectorIndex> {
        let index =
            LanceDbIndex::connect(uri, "documents", Duration::from_secs(10), RetryPolicy::none())
                .await
                .unwrap();
        Arc::new(index)
    }

    #[tokio::test]
    async fn test_ensure_schema_exists_creates_then_reuses() {
        let gateway = gateway_over(Arc::new(MemoryIndex::default()), DistanceMetric::Cosine);

        assert_eq!(gateway.ensure_schema_exists().await.unwrap(), SchemaAction::Created);
        gateway.store().create("kept".into()).await.unwrap();
        assert_eq!(gateway.ensure_schema_exists().await.unwrap(), SchemaAction::Reused);
        assert_eq!(gateway.stats().await.unwrap().documents, Some(1));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ensure_schema_exists_keeps_documents_on_metric_drift() {
        let dir = tempfile::TempDir::new().unwrap();
        let uri = dir.path().join("db").to_string_lossy().into_owned();

        let cosine = gateway_over(open_lancedb(&uri).await, DistanceMetric::Cosine);
        cosine.ensure_schema_exists().await.unwrap();
        for i in 0..5 {
            cosine.store().create(format!("doc {}", i).into()).await.unwrap();
        }

        let l2 = gateway_over(open_lancedb(&uri).await, DistanceMetric::L2);
        let result = l2.ensure_schema_exists().await;
        assert!(matches!(result, Err(AppError::Config(_))));

        let stats = l2.stats().await.unwrap();
        assert_eq!(stats.schema.map(|s| s.distance_metric), Some(DistanceMetric::Cosine));
        assert_eq!(stats.documents, Some(5));
    }

    #[tokio::test]
    async fn test_unknown_backend_is_config_error() {
        let mut config = memory_config();
        config.store.backend = "redis".to_string();
        assert!(matches!(
            Gateway::from_config(&config).await,
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_health_is_healthy_for_local_setup() {
        let gateway = Gateway::from_config(&memory_config()).await.unwrap();
        let report = gateway.health().await;
        assert!(report.is_healthy());
        assert_eq!(report.status, "healthy");
    }
}
