//! Similarity search: embed the query, ask the index for neighbors, turn raw
//! distances into scores, rank.

use crate::embeddings::EmbeddingEngine;
use crate::types::{DistanceMetric, Neighbor, SearchResult};
use crate::vector_index::VectorIndex;
use std::sync::Arc;
use vecgate_core::{AppError, AppResult};

/// Result count used when the caller gives no limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct SearchEngine {
    index: Arc<dyn VectorIndex>,
    embeddings: EmbeddingEngine,
    max_results: usize,
}

impl SearchEngine {
    pub fn new(index: Arc<dyn VectorIndex>, embeddings: EmbeddingEngine, max_results: usize) -> Self {
        Self {
            index,
            embeddings,
            max_results: max_results.max(1),
        }
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Validate a requested limit: below 1 is rejected, above the maximum is clamped.
    pub fn effective_limit(&self, limit: Option<usize>) -> AppResult<usize> {
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        if limit < 1 {
            return Err(AppError::InvalidInput(
                "Search limit must be at least 1".to_string(),
            ));
        }
        Ok(limit.min(self.max_results))
    }

    /// Rank stored documents against `query`.
    ///
    /// Results carry no embeddings and are ordered by descending score.
    /// Equal scores keep the order the index returned them in.
    pub async fn search(&self, query: &str, limit: Option<usize>) -> AppResult<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query must not be empty".to_string(),
            ));
        }
        let limit = self.effective_limit(limit)?;

        let vector = self.embeddings.embed_text(query).await?;

        let metric = self
            .index
            .schema()
            .await
            .map(|s| s.distance_metric)
            .ok_or_else(|| {
                AppError::IndexNotReady("Index has no schema yet; nothing to search".to_string())
            })?;

        let neighbors = self.index.query(&vector, limit).await?;
        let results = rank(metric, neighbors, limit);

        tracing::debug!(
            "Search returned {} results (limit {}, metric {})",
            results.len(),
            limit,
            metric
        );
        Ok(results)
    }
}

/// Score, sort and truncate neighbors.
pub fn rank(metric: DistanceMetric, neighbors: Vec<Neighbor>, limit: usize) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = neighbors
        .into_iter()
        .map(|n| SearchResult {
            score: metric.score(n.distance),
            document: n.document.without_embedding(),
        })
        .collect();

    // sort_by is stable, so ties keep store order
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;
    use crate::memory_index::MemoryIndex;
    use crate::types::{Document, IndexSchema};
    use chrono::Utc;

    fn neighbor(id: &str, distance: f32) -> Neighbor {
        Neighbor {
            document: Document {
                id: id.to_string(),
                content: id.to_string(),
                embedding: Some(vec![0.0]),
                metadata: serde_json::json!({}),
                created_at: Utc::now(),
            },
            distance,
        }
    }

    fn engine(max_results: usize) -> SearchEngine {
        let embeddings = EmbeddingEngine::new(Arc::new(TrigramProvider::new(32)), 32).unwrap();
        SearchEngine::new(Arc::new(MemoryIndex::default()), embeddings, max_results)
    }

    #[test]
    fn test_rank_strips_embeddings_and_sorts() {
        let results = rank(
            DistanceMetric::Cosine,
            vec![neighbor("b", 0.8), neighbor("a", 0.2), neighbor("c", 2.0)],
            10,
        );

        let ids: Vec<&str> = results.iter().map(|r| r.document.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!((results[0].score - 0.9).abs() < 1e-6);
        assert!(results[2].score.abs() < 1e-6);
        assert!(results.iter().all(|r| r.document.embedding.is_none()));
    }

    #[test]
    fn test_rank_ties_keep_store_order() {
        let results = rank(
            DistanceMetric::L2,
            vec![neighbor("z", 1.0), neighbor("a", 1.0), neighbor("m", 1.0)],
            3,
        );
        let ids: Vec<&str> = results.iter().map(|r| r.document.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_rank_inner_product_is_raw_dot() {
        // d = 1 - dot
        let results = rank(
            DistanceMetric::InnerProduct,
            vec![neighbor("low", 1.0 - 0.5), neighbor("high", 1.0 - 7.0)],
            2,
        );
        assert_eq!(results[0].document.id, "high");
        assert!((results[0].score - 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_effective_limit() {
        let engine = engine(10);
        assert_eq!(engine.effective_limit(None).unwrap(), 10);
        assert_eq!(engine.effective_limit(Some(3)).unwrap(), 3);
        assert_eq!(engine.effective_limit(Some(10_000)).unwrap(), 10);
        assert!(matches!(engine.effective_limit(Some(0)), Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let engine = engine(10);
        let result = engine.search("  ", Some(5)).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_search_without_schema_not_ready() {
        let engine = engine(10);
        let result = engine.search("hello", None).await;
        assert!(matches!(result, Err(AppError::IndexNotReady(_))));
    }

    #[tokio::test]
    async fn test_search_empty_index() {
        let index = Arc::new(MemoryIndex::default());
        index
            .ensure_schema(IndexSchema::new(32, DistanceMetric::Cosine).unwrap(), false)
            .await
            .unwrap();
        let embeddings = EmbeddingEngine::new(Arc::new(TrigramProvider::new(32)), 32).unwrap();
        let engine = SearchEngine::new(index, embeddings, 5);

        assert!(engine.search("anything", Some(3)).await.unwrap().is_empty());
    }
}
