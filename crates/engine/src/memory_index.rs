//! In-memory vector index.
//!
//! A flat, exhaustive index over a `Vec` kept in insertion order, behind a
//! `tokio::sync::RwLock`. Used for development and as the test double for
//! the LanceDB backend.

use crate::types::{
    BulkWriteReport, DistanceMetric, Document, FailedWrite, IndexSchema, Neighbor, SchemaAction,
};
use crate::vector_index::{check_dimension, check_k, checked_embedding, not_ready, VectorIndex};
use tokio::sync::RwLock;
use vecgate_core::AppResult;

#[derive(Debug)]
struct Collection {
    schema: IndexSchema,
    records: Vec<Document>,
}

#[derive(Debug)]
pub struct MemoryIndex {
    name: String,
    state: RwLock<Option<Collection>>,
}

impl MemoryIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(None),
        }
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new("documents")
    }
}

/// Raw distance in the canonical per-metric convention.
fn distance(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    match metric {
        DistanceMetric::Cosine => {
            let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm_a == 0.0 || norm_b == 0.0 {
                return 1.0;
            }
            1.0 - dot / (norm_a * norm_b)
        }
        DistanceMetric::L2 => a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
        DistanceMetric::InnerProduct => 1.0 - dot,
    }
}

#[async_trait::async_trait]
impl VectorIndex for MemoryIndex {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn ensure_schema(
        &self,
        schema: IndexSchema,
        force_recreate: bool,
    ) -> AppResult<SchemaAction> {
        let mut state = self.state.write().await;

        let action = match state.as_ref() {
            None => SchemaAction::Created,
            Some(existing) if existing.schema == schema && !force_recreate => {
                return Ok(SchemaAction::Reused);
            }
            Some(existing) => {
                tracing::warn!(
                    "Dropping {} records from in-memory index '{}' ({} -> {})",
                    existing.records.len(),
                    self.name,
                    existing.schema,
                    schema
                );
                SchemaAction::Recreated
            }
        };

        *state = Some(Collection {
            schema,
            records: Vec::new(),
        });
        Ok(action)
    }

    async fn schema(&self) -> Option<IndexSchema> {
        self.state.read().await.as_ref().map(|c| c.schema)
    }

    async fn upsert(&self, document: &Document) -> AppResult<()> {
        let mut state = self.state.write().await;
        let collection = state.as_mut().ok_or_else(|| not_ready(&self.name))?;
        checked_embedding(&collection.schema, document)?;

        match collection.records.iter_mut().find(|r| r.id == document.id) {
            Some(existing) => *existing = document.clone(),
            None => collection.records.push(document.clone()),
        }
        Ok(())
    }

    async fn bulk_upsert(&self, documents: &[Document]) -> AppResult<BulkWriteReport> {
        let mut state = self.state.write().await;
        let collection = state.as_mut().ok_or_else(|| not_ready(&self.name))?;
        let mut report = BulkWriteReport::default();

        for document in documents {
            if let Err(e) = checked_embedding(&collection.schema, document) {
                report.failed.push(FailedWrite {
                    id: document.id.clone(),
                    reason: e.to_string(),
                });
                continue;
            }

            match collection.records.iter_mut().find(|r| r.id == document.id) {
                Some(existing) => *existing = document.clone(),
                None => collection.records.push(document.clone()),
            }
            report.written.push(document.id.clone());
        }

        Ok(report)
    }

    async fn get(&self, id: &str) -> AppResult<Option<Document>> {
        let state = self.state.read().await;
        let collection = state.as_ref().ok_or_else(|| not_ready(&self.name))?;
        Ok(collection.records.iter().find(|r| r.id == id).cloned())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        let collection = state.as_mut().ok_or_else(|| not_ready(&self.name))?;
        collection.records.retain(|r| r.id != id);
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> AppResult<Vec<Neighbor>> {
        check_k(k)?;
        let state = self.state.read().await;
        let collection = state.as_ref().ok_or_else(|| not_ready(&self.name))?;
        check_dimension(&collection.schema, vector)?;

        let metric = collection.schema.distance_metric;
        let mut neighbors: Vec<Neighbor> = collection
            .records
            .iter()
            .filter_map(|record| {
                let embedding = record.embedding.as_deref()?;
                Some(Neighbor {
                    distance: distance(metric, vector, embedding),
                    document: record.clone(),
                })
            })
            .collect();

        // Stable: equal distances keep insertion order
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);
        Ok(neighbors)
    }

    async fn count(&self) -> AppResult<usize> {
        let state = self.state.read().await;
        let collection = state.as_ref().ok_or_else(|| not_ready(&self.name))?;
        Ok(collection.records.len())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
