//! Vector index abstraction.
//!
//! The index owns the backing store's schema and its create/recreate
//! lifecycle. Distance computation and nearest-neighbor search are delegated
//! to the backend.

use crate::types::{BulkWriteReport, Document, IndexSchema, Neighbor, SchemaAction};
use vecgate_core::{AppError, AppResult};

/// Trait for vector index backends.
///
/// Handles are shared (`Arc<dyn VectorIndex>`) and must be safe for
/// concurrent use. Every data call against an index whose schema has not
/// been created fails with `IndexNotReady`.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync + std::fmt::Debug {
    /// Backend name for logs and stats (e.g., "lancedb", "memory")
    fn backend_name(&self) -> &str;

    /// Create the index if missing, keep it if identical, otherwise drop and
    /// rebuild it. `force_recreate` always rebuilds, discarding documents.
    async fn ensure_schema(&self, schema: IndexSchema, force_recreate: bool)
        -> AppResult<SchemaAction>;

    /// The active schema, if one exists.
    async fn schema(&self) -> Option<IndexSchema>;

    /// Write or overwrite one record keyed by its id.
    async fn upsert(&self, document: &Document) -> AppResult<()>;

    /// Best-effort batch write. Reports which ids failed; no rollback.
    async fn bulk_upsert(&self, documents: &[Document]) -> AppResult<BulkWriteReport>;

    /// Fetch one record, embedding included.
    async fn get(&self, id: &str) -> AppResult<Option<Document>>;

    /// Remove a record. Unknown ids are a no-op.
    async fn delete(&self, id: &str) -> AppResult<()>;

    /// Up to `k` nearest records, closest first, with raw distances in the
    /// convention described on [`crate::types::DistanceMetric::score`].
    async fn query(&self, vector: &[f32], k: usize) -> AppResult<Vec<Neighbor>>;

    /// Number of stored records.
    async fn count(&self) -> AppResult<usize>;

    /// Connectivity check against the backing store.
    async fn ping(&self) -> AppResult<()>;
}

/// Error for data calls made before `ensure_schema`.
pub(crate) fn not_ready(collection: &str) -> AppError {
    AppError::IndexNotReady(format!(
        "Index '{}' has no schema yet; run ensure_schema first",
        collection
    ))
}

/// Check that a document carries an embedding matching the schema.
pub(crate) fn checked_embedding<'a>(
    schema: &IndexSchema,
    document: &'a Document,
) -> AppResult<&'a [f32]> {
    let embedding = document.embedding.as_deref().ok_or_else(|| {
        AppError::InvalidInput(format!("Document '{}' has no embedding", document.id))
    })?;

    check_dimension(schema, embedding)?;
    Ok(embedding)
}

pub(crate) fn check_dimension(schema: &IndexSchema, vector: &[f32]) -> AppResult<()> {
    if vector.len() != schema.dimension {
        return Err(AppError::Config(format!(
            "Embedding dimension mismatch: expected {}, got {}",
            schema.dimension,
            vector.len()
        )));
    }
    Ok(())
}

pub(crate) fn check_k(k: usize) -> AppResult<()> {
    if k == 0 {
        return Err(AppError::InvalidInput(
            "Query k must be at least 1".to_string(),
        ));
    }
    Ok(())
}
