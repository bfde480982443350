//! Scenario tests for the engine, wired the way the gateway wires it.


use crate::embeddings::providers::trigram::TrigramProvider;
use crate::embeddings::EmbeddingEngine;
use crate::gateway::Gateway;
use crate::memory_index::MemoryIndex;
use crate::types::{DistanceMetric, IndexSchema};
use crate::vector_index::VectorIndex;
use std::sync::Arc;

/// Gateway over an in-memory index and the trigram model, schema created.
pub(crate) async fn memory_gateway(
    dimension: usize,
    metric: DistanceMetric,
    max_results: usize,
) -> Gateway {
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::default());
    gateway_over(index, dimension, metric, max_results).await
}

pub(crate) async fn gateway_over(
    index: Arc<dyn VectorIndex>,
    dimension: usize,
    metric: DistanceMetric,
    max_results: usize,
) -> Gateway {
    let schema = IndexSchema::new(dimension, metric).unwrap();
    let embeddings =
        EmbeddingEngine::new(Arc::new(TrigramProvider::new(dimension)), dimension).unwrap();

    let gateway = Gateway::new(index, embeddings, schema, "documents", max_results, false);
    gateway.ensure_schema(false).await.unwrap();
    gateway
}
