//! Engine type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use vecgate_core::config::VectorConfig;
use vecgate_core::{AppError, AppResult};

/// A stored document: original text plus its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier, immutable once assigned
    pub id: String,

    /// Original text
    pub content: String,

    /// Embedding vector, `VECTOR_DIMENSION` long when present.
    /// Left out of search results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Caller-supplied metadata
    #[serde(default)]
    pub metadata: serde_json::Value,

    /// When the document was created
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Copy of this document without its embedding.
    pub fn without_embedding(mut self) -> Self {
        self.embedding = None;
        self
    }
}

/// Input for creating a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    /// Id to use instead of a generated one
    #[serde(default)]
    pub id: Option<String>,

    pub content: String,

    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl NewDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl From<&str> for NewDocument {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for NewDocument {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

/// Distance metric used by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistanceMetric {
    Cosine,
    L2,
    InnerProduct,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "COSINE",
            DistanceMetric::L2 => "L2",
            DistanceMetric::InnerProduct => "INNER_PRODUCT",
        }
    }

    /// Convert a raw distance reported by an index into a similarity score.
    ///
    /// Raw distance conventions:
    /// - COSINE: `1 - cosine_similarity`, in [0, 2]
    /// - L2: Euclidean distance
    /// - INNER_PRODUCT: `1 - dot`
    ///
    /// COSINE maps onto [0, 1], L2 onto (0, 1], and INNER_PRODUCT yields the
    /// raw inner product, unbounded. Higher always means more similar.
    pub fn score(&self, distance: f32) -> f32 {
        match self {
            DistanceMetric::Cosine => 1.0 - distance / 2.0,
            DistanceMetric::L2 => 1.0 / (1.0 + distance),
            DistanceMetric::InnerProduct => 1.0 - distance,
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "COSINE" => Ok(DistanceMetric::Cosine),
            "L2" | "EUCLIDEAN" => Ok(DistanceMetric::L2),
            "INNER_PRODUCT" | "IP" | "DOT" => Ok(DistanceMetric::InnerProduct),
            _ => Err(AppError::Config(format!(
                "Unknown distance metric: '{}'. Supported: COSINE, L2, INNER_PRODUCT",
                s
            ))),
        }
    }
}

/// Backing-store index structure, declared at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexKind {
    /// Exhaustive scan
    Flat,
    /// Approximate graph index
    Hnsw,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Flat => "FLAT",
            IndexKind::Hnsw => "HNSW",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FLAT" => Ok(IndexKind::Flat),
            "HNSW" => Ok(IndexKind::Hnsw),
            _ => Err(AppError::Config(format!(
                "Unknown index kind: '{}'. Supported: FLAT, HNSW",
                s
            ))),
        }
    }
}

/// Schema of a vector index. Fixed for the index's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub dimension: usize,
    pub distance_metric: DistanceMetric,
    pub index_kind: IndexKind,
}

impl IndexSchema {
    pub fn new(dimension: usize, distance_metric: DistanceMetric) -> AppResult<Self> {
        if dimension == 0 {
            return Err(AppError::Config(
                "Index dimension must be a positive integer".to_string(),
            ));
        }

        Ok(Self {
            dimension,
            distance_metric,
            index_kind: IndexKind::Flat,
        })
    }

    pub fn with_index_kind(mut self, index_kind: IndexKind) -> Self {
        self.index_kind = index_kind;
        self
    }

    /// Build the schema described by the `vector` config section.
    pub fn from_config(config: &VectorConfig) -> AppResult<Self> {
        let metric = config.distance_metric.parse::<DistanceMetric>()?;
        let kind = config.index_kind.parse::<IndexKind>()?;
        Ok(Self::new(config.dimension, metric)?.with_index_kind(kind))
    }
}

impl fmt::Display for IndexSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dim={} metric={} kind={}",
            self.dimension, self.distance_metric, self.index_kind
        )
    }
}

/// Outcome of `VectorIndex::ensure_schema`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaAction {
    /// No index existed; one was created
    Created,
    /// An identical index existed and was kept
    Reused,
    /// The existing index was dropped and rebuilt
    Recreated,
}

/// A record returned by a nearest-neighbor query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub document: Document,
    /// Raw distance under the index's metric convention, smaller is closer
    pub distance: f32,
}

/// Per-id failure in a bulk write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedWrite {
    pub id: String,
    pub reason: String,
}

/// Result of a best-effort bulk write.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkWriteReport {
    /// Ids persisted, in input order
    pub written: Vec<String>,
    /// Ids not persisted, in input order
    pub failed: Vec<FailedWrite>,
}

impl BulkWriteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<String> {
        self.failed.iter().map(|f| f.id.clone()).collect()
    }
}

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub document: Document,
    pub score: f32,
}

/// Liveness of the gateway's external dependencies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    /// "healthy" or "unhealthy"
    pub status: String,
    pub store_connected: bool,
    pub provider_ready: bool,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.store_connected && self.provider_ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_parsing() {
        assert_eq!("cosine".parse::<DistanceMetric>().unwrap(), DistanceMetric::Cosine);
        assert_eq!("L2".parse::<DistanceMetric>().unwrap(), DistanceMetric::L2);
        assert_eq!(
            "inner_product".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::InnerProduct
        );
        assert_eq!("IP".parse::<DistanceMetric>().unwrap(), DistanceMetric::InnerProduct);
        assert!(matches!(
            "manhattan".parse::<DistanceMetric>(),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_cosine_score_range() {
        let m = DistanceMetric::Cosine;
        assert!((m.score(0.0) - 1.0).abs() < 1e-6);
        assert!((m.score(1.0) - 0.5).abs() < 1e-6);
        assert!(m.score(2.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_score_decreases_with_distance() {
        let m = DistanceMetric::L2;
        assert!((m.score(0.0) - 1.0).abs() < 1e-6);
        assert!((m.score(1.0) - 0.5).abs() < 1e-6);
        assert!(m.score(3.0) < m.score(2.0));
        assert!(m.score(1000.0) > 0.0);
    }

    #[test]
    fn test_inner_product_score_is_raw_dot() {
        let m = DistanceMetric::InnerProduct;
        // d = 1 - dot
        assert!((m.score(1.0 - 3.5) - 3.5).abs() < 1e-6);
        assert!((m.score(1.0 - -0.25) - -0.25).abs() < 1e-6);
    }

    #[test]
    fn test_schema_from_config() {
        let config = VectorConfig {
            dimension: 384,
            distance_metric: "l2".to_string(),
            index_kind: "hnsw".to_string(),
            ..Default::default()
        };
        let schema = IndexSchema::from_config(&config).unwrap();
        assert_eq!(schema.dimension, 384);
        assert_eq!(schema.distance_metric, DistanceMetric::L2);
        assert_eq!(schema.index_kind, IndexKind::Hnsw);

        let zero = VectorConfig {
            dimension: 0,
            ..Default::default()
        };
        assert!(matches!(IndexSchema::from_config(&zero), Err(AppError::Config(_))));
    }

    #[test]
    fn test_document_serialization_skips_missing_embedding() {
        let doc = Document {
            id: "doc-1".to_string(),
            content: "hello".to_string(),
            embedding: None,
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("embedding").is_none());
        assert_eq!(json["content"], "hello");
    }
}
