//! LanceDB-backed vector index.
//!
//! Documents live in a table named after the collection. The schema the
//! table was created with (dimension, metric, index kind) is recorded in a
//! one-row companion table, `<collection>__schema`, so a restarted process
//! can tell whether the existing table still matches its configuration.

use crate::types::{
    BulkWriteReport, DistanceMetric, Document, FailedWrite, IndexKind, IndexSchema, Neighbor,
    SchemaAction,
};
use crate::vector_index::{check_dimension, check_k, checked_embedding, not_ready, VectorIndex};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use lancedb::database::CreateTableMode;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use vecgate_core::retry::{with_backoff, with_timeout};
use vecgate_core::{AppError, AppResult, RetryPolicy};

const DISTANCE_COLUMN: &str = "_distance";

#[derive(Debug, Clone)]
struct ActiveTable {
    table: Table,
    schema: IndexSchema,
}

/// LanceDB vector index for one collection.
pub struct LanceDbIndex {
    conn: Connection,
    collection: String,
    timeout: Duration,
    retry: RetryPolicy,
    active: RwLock<Option<ActiveTable>>,
}

// `lancedb::Connection` does not implement `Debug`, so it is omitted here.
impl std::fmt::Debug for LanceDbIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanceDbIndex")
            .field("collection", &self.collection)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl LanceDbIndex {
    /// Connect to the database at `uri` and attach to an existing collection
    /// if its recorded schema is readable.
    ///
    /// # Arguments
    /// * `uri` - Directory path or object-store URI
    /// * `collection` - Table name
    /// * `timeout` - Deadline for each store call
    /// * `retry` - Retry budget for transient store failures
    pub async fn connect(
        uri: &str,
        collection: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> AppResult<Self> {
        if !uri.contains("://") {
            std::fs::create_dir_all(uri).map_err(|e| {
                AppError::Store(format!("Failed to create store directory '{}': {}", uri, e))
            })?;
        }

        let conn = with_backoff(retry, "connect", || {
            with_timeout(
                timeout,
                async move {
                    lancedb::connect(uri)
                        .execute()
                        .await
                        .map_err(|e| store_error("Failed to connect to LanceDB", e))
                },
                move || {
                    AppError::IndexNotReady(format!("Connecting to LanceDB at '{}' timed out", uri))
                },
            )
        })
        .await?;

        let index = Self {
            conn,
            collection: collection.to_string(),
            timeout,
            retry,
            active: RwLock::new(None),
        };

        if let Some(active) = index.load_existing().await? {
            tracing::info!(
                "Attached to existing LanceDB collection '{}' ({})",
                collection,
                active.schema
            );
            *index.active.write().await = Some(active);
        }

        tracing::debug!("Initialized LanceDB index at {}", uri);
        Ok(index)
    }

    fn schema_table_name(&self) -> String {
        format!("{}__schema", self.collection)
    }

    /// Run one store call with the configured deadline and retry budget.
    async fn call<T, F, Fut>(&self, operation: &str, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let timeout = self.timeout;
        with_backoff(self.retry, operation, || {
            with_timeout(timeout, op(), || {
                AppError::IndexNotReady(format!("{} timed out after {:?}", operation, timeout))
            })
        })
        .await
    }

    async fn table_names(&self) -> AppResult<Vec<String>> {
        let conn = &self.conn;
        self.call("list tables", move || async move {
            conn.table_names()
                .execute()
                .await
                .map_err(|e| store_error("Failed to list tables", e))
        })
        .await
    }

    async fn open_table(&self, name: &str) -> AppResult<Table> {
        let conn = &self.conn;
        self.call("open table", move || async move {
            conn.open_table(name)
                .execute()
                .await
                .map_err(|e| store_error("Failed to open table", e))
        })
        .await
    }

    /// Existing collection whose recorded schema agrees with its table.
    async fn load_existing(&self) -> AppResult<Option<ActiveTable>> {
        let names = self.table_names().await?;
        let schema_table = self.schema_table_name();

        if !names.contains(&self.collection) || !names.contains(&schema_table) {
            return Ok(None);
        }

        let recorded = match read_recorded_schema(&self.open_table(&schema_table).await?).await {
            Ok(Some(schema)) => schema,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!("Unreadable schema record for '{}': {}", self.collection, e);
                return Ok(None);
            }
        };

        let table = self.open_table(&self.collection).await?;
        let arrow_schema = table
            .schema()
            .await
            .map_err(|e| store_error("Failed to read table schema", e))?;

        if embedding_dimension(&arrow_schema) != Some(recorded.dimension) {
            tracing::warn!(
                "Collection '{}' embedding column disagrees with its schema record",
                self.collection
            );
            return Ok(None);
        }

        Ok(Some(ActiveTable {
            table,
            schema: recorded,
        }))
    }

    /// Overwrite `name` with the rows of `batch`.
    async fn overwrite_table(
        &self,
        operation: &str,
        name: &str,
        batch: RecordBatch,
    ) -> AppResult<Table> {
        let conn = &self.conn;
        self.call(operation, || {
            let reader = RecordBatchIterator::new(vec![Ok(batch.clone())], batch.schema());
            async move {
                conn.create_table(name, reader)
                    .mode(CreateTableMode::Overwrite)
                    .execute()
                    .await
                    .map_err(|e| store_error("Failed to write table", e))
            }
        })
        .await
    }

    /// Empty the schema record. A collection without a record is treated as
    /// unknown and gets recreated by the next `ensure_schema`.
    async fn clear_schema_record(&self) -> AppResult<()> {
        let empty = RecordBatch::new_empty(schema_record_schema());
        self.overwrite_table("clear schema record", &self.schema_table_name(), empty)
            .await
            .map(|_| ())
    }

    async fn create_data_table(&self, schema: IndexSchema) -> AppResult<Table> {
        let empty = RecordBatch::new_empty(document_schema(schema.dimension));
        self.overwrite_table("create table", &self.collection, empty).await
    }

    async fn record_schema(&self, schema: IndexSchema) -> AppResult<()> {
        let record = schema_record(&schema)?;
        self.overwrite_table("record schema", &self.schema_table_name(), record)
            .await
            .map(|_| ())
    }

    /// Rebuild the collection. The record is cleared first and written last,
    /// so an interrupted rebuild never leaves a record describing the wrong table.
    async fn create_tables(&self, schema: IndexSchema) -> AppResult<Table> {
        self.clear_schema_record().await?;
        let table = self.create_data_table(schema).await?;
        self.record_schema(schema).await?;
        Ok(table)
    }

    async fn merge(&self, table: &Table, batch: RecordBatch) -> AppResult<()> {
        self.call("merge insert", || {
            let reader = RecordBatchIterator::new(vec![Ok(batch.clone())], batch.schema());
            async move {
                let mut merge = table.merge_insert(&["id"]);
                merge
                    .when_matched_update_all(None)
                    .when_not_matched_insert_all();
                merge
                    .execute(Box::new(reader))
                    .await
                    .map(|_| ())
                    .map_err(|e| store_error("Failed to upsert documents", e))
            }
        })
        .await
    }
}

/// Lowercased fragments LanceDB and object_store put in connectivity errors.
const TRANSIENT_MARKERS: [&str; 10] = [
    "connection",
    "connect error",
    "timed out",
    "timeout",
    "broken pipe",
    "reset by peer",
    "dns error",
    "temporarily unavailable",
    "service unavailable",
    "lanceerror(io)",
];

fn is_transient_message(message: &str) -> bool {
    let message = message.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|m| message.contains(m))
}

/// Missing tables and connectivity failures are retryable `IndexNotReady`;
/// everything else is a logical `Store` failure.
fn store_error(context: &str, e: lancedb::Error) -> AppError {
    let message = format!("{}: {}", context, e);
    match &e {
        lancedb::Error::TableNotFound { .. } | lancedb::Error::ObjectStore { .. } => {
            AppError::IndexNotReady(message)
        }
        lancedb::Error::InvalidInput { .. } | lancedb::Error::Schema { .. } => {
            AppError::Store(message)
        }
        // IO-level failures surface as Lance, Runtime or Http errors
        _ if is_transient_message(&e.to_string()) => AppError::IndexNotReady(message),
        _ => AppError::Store(message),
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn distance_type(metric: DistanceMetric) -> DistanceType {
    match metric {
        DistanceMetric::Cosine => DistanceType::Cosine,
        DistanceMetric::L2 => DistanceType::L2,
        DistanceMetric::InnerProduct => DistanceType::Dot,
    }
}

/// LanceDB reports squared L2; everything else is already canonical.
fn canonical_distance(metric: DistanceMetric, raw: f32) -> f32 {
    match metric {
        DistanceMetric::L2 => raw.max(0.0).sqrt(),
        _ => raw,
    }
}

fn item_field() -> Arc<Field> {
    Arc::new(Field::new("item", DataType::Float32, true))
}

fn document_schema(dimension: usize) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new(
            "embedding",
            DataType::FixedSizeList(item_field(), dimension as i32),
            false,
        ),
        Field::new("metadata", DataType::Utf8, false),
        // Microseconds since the Unix epoch
        Field::new("created_at", DataType::Int64, false),
    ]))
}

fn embedding_dimension(schema: &Schema) -> Option<usize> {
    match schema.field_with_name("embedding").ok()?.data_type() {
        DataType::FixedSizeList(_, n) => Some(*n as usize),
        _ => None,
    }
}

fn schema_record_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("dimension", DataType::Int64, false),
        Field::new("distance_metric", DataType::Utf8, false),
        Field::new("index_kind", DataType::Utf8, false),
    ]))
}

fn schema_record(schema: &IndexSchema) -> AppResult<RecordBatch> {
    RecordBatch::try_new(
        schema_record_schema(),
        vec![
            Arc::new(Int64Array::from(vec![schema.dimension as i64])),
            Arc::new(StringArray::from(vec![schema.distance_metric.as_str()])),
            Arc::new(StringArray::from(vec![schema.index_kind.as_str()])),
        ],
    )
    .map_err(|e| AppError::Store(format!("Failed to build schema record: {}", e)))
}

async fn read_recorded_schema(table: &Table) -> AppResult<Option<IndexSchema>> {
    let batches: Vec<RecordBatch> = table
        .query()
        .limit(1)
        .execute()
        .await
        .map_err(|e| store_error("Failed to read schema record", e))?
        .try_collect()
        .await
        .map_err(|e| store_error("Failed to read schema record", e))?;

    let Some(batch) = batches.iter().find(|b| b.num_rows() > 0) else {
        return Ok(None);
    };

    let dimension = int_column(batch, "dimension")?.value(0);
    let metric = string_column(batch, "distance_metric")?
        .value(0)
        .parse::<DistanceMetric>()?;
    let kind = string_column(batch, "index_kind")?.value(0).parse::<IndexKind>()?;

    let dimension = usize::try_from(dimension)
        .map_err(|_| AppError::Store(format!("Invalid recorded dimension {}", dimension)))?;
    Ok(Some(IndexSchema::new(dimension, metric)?.with_index_kind(kind)))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| AppError::Store(format!("Invalid {} column", name)))
}

fn int_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a Int64Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .ok_or_else(|| AppError::Store(format!("Invalid {} column", name)))
}

/// Convert documents into one Arrow batch. Embeddings must already be checked.
fn documents_to_batch(schema: &IndexSchema, documents: &[&Document]) -> AppResult<RecordBatch> {
    let mut flat = Vec::with_capacity(documents.len() * schema.dimension);
    let mut metadata = Vec::with_capacity(documents.len());

    for document in documents {
        flat.extend_from_slice(checked_embedding(schema, document)?);
        metadata.push(serde_json::to_string(&document.metadata)?);
    }

    let embeddings = FixedSizeListArray::try_new(
        item_field(),
        schema.dimension as i32,
        Arc::new(Float32Array::from(flat)),
        None,
    )
    .map_err(|e| AppError::Store(format!("Failed to build embedding column: {}", e)))?;

    RecordBatch::try_new(
        document_schema(schema.dimension),
        vec![
            Arc::new(StringArray::from(
                documents.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                documents.iter().map(|d| d.content.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(embeddings),
            Arc::new(StringArray::from(metadata)),
            Arc::new(Int64Array::from(
                documents
                    .iter()
                    .map(|d| d.created_at.timestamp_micros())
                    .collect::<Vec<_>>(),
            )),
        ],
    )
    .map_err(|e| AppError::Store(format!("Failed to create RecordBatch: {}", e)))
}

/// Convert one Arrow row back into a document.
fn row_to_document(batch: &RecordBatch, row: usize) -> AppResult<Document> {
    let id = string_column(batch, "id")?.value(row).to_string();
    let content = string_column(batch, "content")?.value(row).to_string();

    let embedding_list = batch
        .column_by_name("embedding")
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
        .ok_or_else(|| AppError::Store("Invalid embedding column".to_string()))?;
    let values = embedding_list.value(row);
    let values = values
        .as_any()
        .downcast_ref::<Float32Array>()
        .ok_or_else(|| AppError::Store("Invalid embedding values".to_string()))?;
    let embedding: Vec<f32> = values.values().to_vec();

    let metadata = serde_json::from_str(string_column(batch, "metadata")?.value(row))?;

    let micros = int_column(batch, "created_at")?.value(row);
    let created_at = DateTime::<Utc>::from_timestamp_micros(micros)
        .ok_or_else(|| AppError::Store(format!("Invalid created_at value {}", micros)))?;

    Ok(Document {
        id,
        content,
        embedding: Some(embedding),
        metadata,
        created_at,
    })
}

#[async_trait::async_trait]
impl VectorIndex for LanceDbIndex {
    fn backend_name(&self) -> &str {
        "lancedb"
    }

    async fn ensure_schema(
        &self,
        schema: IndexSchema,
        force_recreate: bool,
    ) -> AppResult<SchemaAction> {
        // Exclusive with every data call on this handle
        let mut active = self.active.write().await;
        if active.is_none() {
            *active = self.load_existing().await?;
        }

        let action = match active.as_ref() {
            Some(current) if current.schema == schema && !force_recreate => {
                tracing::debug!("Collection '{}' schema unchanged ({})", self.collection, schema);
                return Ok(SchemaAction::Reused);
            }
            Some(current) => {
                tracing::warn!(
                    "Recreating collection '{}' ({} -> {}, forced: {}); existing documents are discarded",
                    self.collection,
                    current.schema,
                    schema,
                    force_recreate
                );
                SchemaAction::Recreated
            }
            None if self.table_names().await?.contains(&self.collection) => {
                tracing::warn!(
                    "Collection '{}' has no readable schema record; recreating it as {}",
                    self.collection,
                    schema
                );
                SchemaAction::Recreated
            }
            None => SchemaAction::Created,
        };

        // The old handle is stale from the first destructive write on
        *active = None;
        let table = self.create_tables(schema).await?;
        *active = Some(ActiveTable { table, schema });

        tracing::info!("Collection '{}' ready ({}, {:?})", self.collection, schema, action);
        Ok(action)
    }

    async fn schema(&self) -> Option<IndexSchema> {
        self.active.read().await.as_ref().map(|a| a.schema)
    }

    async fn upsert(&self, document: &Document) -> AppResult<()> {
        let active = self.active.read().await;
        let active = active.as_ref().ok_or_else(|| not_ready(&self.collection))?;

        let batch = documents_to_batch(&active.schema, &[document])?;
        self.merge(&active.table, batch).await?;

        tracing::debug!("Upserted document {} into '{}'", document.id, self.collection);
        Ok(())
    }

    async fn bulk_upsert(&self, documents: &[Document]) -> AppResult<BulkWriteReport> {
        let active = self.active.read().await;
        let active = active.as_ref().ok_or_else(|| not_ready(&self.collection))?;

        let mut report = BulkWriteReport::default();
        let mut seen = HashSet::new();
        let mut accepted = Vec::with_capacity(documents.len());

        for document in documents {
            if !seen.insert(document.id.as_str()) {
                report.failed.push(FailedWrite {
                    id: document.id.clone(),
                    reason: "Duplicate id in batch".to_string(),
                });
                continue;
            }
            match checked_embedding(&active.schema, document) {
                Ok(_) => accepted.push(document),
                Err(e) => report.failed.push(FailedWrite {
                    id: document.id.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        if accepted.is_empty() {
            return Ok(report);
        }

        let batch = documents_to_batch(&active.schema, &accepted)?;
        match self.merge(&active.table, batch).await {
            Ok(()) => {
                report
                    .written
                    .extend(accepted.iter().map(|d| d.id.clone()));
            }
            Err(e) if e.is_retryable() => return Err(e),
            Err(e) => {
                tracing::error!("Bulk upsert into '{}' failed: {}", self.collection, e);
                report.failed.extend(accepted.iter().map(|d| FailedWrite {
                    id: d.id.clone(),
                    reason: e.to_string(),
                }));
            }
        }

        tracing::debug!(
            "Bulk upsert into '{}': {} written, {} failed",
            self.collection,
            report.written.len(),
            report.failed.len()
        );
        Ok(report)
    }

    async fn get(&self, id: &str) -> AppResult<Option<Document>> {
        let active = self.active.read().await;
        let active = active.as_ref().ok_or_else(|| not_ready(&self.collection))?;
        let table = &active.table;
        let predicate = format!("id = '{}'", escape_literal(id));
        let predicate = predicate.as_str();

        let batches: Vec<RecordBatch> = self
            .call("get document", move || async move {
                table
                    .query()
                    .only_if(predicate)
                    .limit(1)
                    .execute()
                    .await
                    .map_err(|e| store_error("Failed to query document", e))?
                    .try_collect()
                    .await
                    .map_err(|e| store_error("Failed to read document", e))
            })
            .await?;

        batches
            .iter()
            .find(|b| b.num_rows() > 0)
            .map(|b| row_to_document(b, 0))
            .transpose()
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let active = self.active.read().await;
        let active = active.as_ref().ok_or_else(|| not_ready(&self.collection))?;
        let table = &active.table;
        let predicate = format!("id = '{}'", escape_literal(id));
        let predicate = predicate.as_str();

        self.call("delete document", move || async move {
            table
                .delete(predicate)
                .await
                .map(|_| ())
                .map_err(|e| store_error("Failed to delete document", e))
        })
        .await
    }

    async fn query(&self, vector: &[f32], k: usize) -> AppResult<Vec<Neighbor>> {
        check_k(k)?;
        let active = self.active.read().await;
        let active = active.as_ref().ok_or_else(|| not_ready(&self.collection))?;
        check_dimension(&active.schema, vector)?;

        let table = &active.table;
        let metric = active.schema.distance_metric;

        let batches: Vec<RecordBatch> = self
            .call("vector query", move || async move {
                table
                    .query()
                    .nearest_to(vector.to_vec())
                    .map_err(|e| store_error("Failed to create query", e))?
                    .distance_type(distance_type(metric))
                    .limit(k)
                    .execute()
                    .await
                    .map_err(|e| store_error("Failed to execute search", e))?
                    .try_collect()
                    .await
                    .map_err(|e| store_error("Failed to collect results", e))
            })
            .await?;

        let mut neighbors = Vec::new();
        for batch in &batches {
            let distances = batch
                .column_by_name(DISTANCE_COLUMN)
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| AppError::Store("Search result has no distance column".to_string()))?;

            for row in 0..batch.num_rows() {
                neighbors.push(Neighbor {
                    document: row_to_document(batch, row)?,
                    distance: canonical_distance(metric, distances.value(row)),
                });
            }
        }

        // LanceDB returns nearest first; keep its order for equal distances
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);

        tracing::debug!("Query on '{}' returned {} neighbors", self.collection, neighbors.len());
        Ok(neighbors)
    }

    async fn count(&self) -> AppResult<usize> {
        let active = self.active.read().await;
        let active = active.as_ref().ok_or_else(|| not_ready(&self.collection))?;
        let table = &active.table;

        self.call("count rows", move || async move {
            table
                .count_rows(None)
                .await
                .map_err(|e| store_error("Failed to count rows", e))
        })
        .await
    }

    async fn ping(&self) -> AppResult<()> {
        // Listing tables touches the store without reading data
        self.table_names().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(id: &str, embedding: Vec<f32>) -> Document {
        Document {
            id: id.to_string(),
            content: format!("content of {}", id),
            embedding: Some(embedding),
            metadata: serde_json::json!({"source": "test"}),
            created_at: Utc::now(),
        }
    }

    async fn open(dir: &TempDir) -> LanceDbIndex {
        let uri = dir.path().join("db");
        LanceDbIndex::connect(
            &uri.to_string_lossy(),
            "documents",
            Duration::from_secs(10),
            RetryPolicy::none(),
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal("it's"), "it''s");
    }

    #[test]
    fn test_transient_messages() {
        assert!(is_transient_message("LanceError(IO): Generic S3 error: Connection reset by peer"));
        assert!(is_transient_message("error sending request: operation timed out"));
        assert!(is_transient_message("HTTP 503 Service Unavailable"));
        assert!(!is_transient_message("Schema error: field embedding not found"));
        assert!(!is_transient_message("Invalid input: predicate parse failed"));
    }

    #[test]
    fn test_store_error_classification() {
        let transient = lancedb::Error::Runtime {
            message: "object store connection reset by peer".to_string(),
        };
        let err = store_error("Failed to upsert documents", transient);
        assert!(matches!(err, AppError::IndexNotReady(_)));
        assert!(err.is_retryable());

        let logical = lancedb::Error::InvalidInput {
            message: "column id has wrong type".to_string(),
        };
        let err = store_error("Failed to upsert documents", logical);
        assert!(matches!(err, AppError::Store(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_canonical_distance() {
        assert!((canonical_distance(DistanceMetric::L2, 25.0) - 5.0).abs() < 1e-6);
        assert_eq!(canonical_distance(DistanceMetric::Cosine, 0.3), 0.3);
        assert_eq!(canonical_distance(DistanceMetric::InnerProduct, -2.0), -2.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_not_ready_before_schema() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir).await;

        assert!(index.schema().await.is_none());
        assert!(matches!(index.get("x").await, Err(AppError::IndexNotReady(_))));
        assert!(matches!(index.count().await, Err(AppError::IndexNotReady(_))));
        assert!(index.ping().await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_get_delete() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir).await;
        let schema = IndexSchema::new(3, DistanceMetric::Cosine).unwrap();
        assert_eq!(index.ensure_schema(schema, false).await.unwrap(), SchemaAction::Created);

        index.upsert(&doc("o'brien", vec![1.0, 0.0, 0.0])).await.unwrap();
        let fetched = index.get("o'brien").await.unwrap().unwrap();
        assert_eq!(fetched.content, "content of o'brien");
        assert_eq!(fetched.embedding, Some(vec![1.0, 0.0, 0.0]));
        assert_eq!(fetched.metadata["source"], "test");

        // Overwrite, not duplicate
        index.upsert(&doc("o'brien", vec![0.0, 1.0, 0.0])).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        index.delete("o'brien").await.unwrap();
        assert!(index.get("o'brien").await.unwrap().is_none());
        assert!(index.delete("o'brien").await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_schema_survives_reconnect_and_recreates_on_change() {
        let dir = TempDir::new().unwrap();
        let schema = IndexSchema::new(2, DistanceMetric::L2).unwrap();

        {
            let index = open(&dir).await;
            index.ensure_schema(schema, false).await.unwrap();
            index.upsert(&doc("a", vec![1.0, 1.0])).await.unwrap();
        }

        let index = open(&dir).await;
        assert_eq!(index.schema().await, Some(schema));
        assert_eq!(index.ensure_schema(schema, false).await.unwrap(), SchemaAction::Reused);
        assert_eq!(index.count().await.unwrap(), 1);

        let cosine = IndexSchema::new(2, DistanceMetric::Cosine).unwrap();
        assert_eq!(index.ensure_schema(cosine, false).await.unwrap(), SchemaAction::Recreated);
        assert_eq!(index.count().await.unwrap(), 0);

        index.upsert(&doc("b", vec![1.0, 0.0])).await.unwrap();
        assert_eq!(index.ensure_schema(cosine, true).await.unwrap(), SchemaAction::Recreated);
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_interrupted_rebuild_is_not_attached() {
        let dir = TempDir::new().unwrap();
        let cosine = IndexSchema::new(2, DistanceMetric::Cosine).unwrap();
        let l2 = IndexSchema::new(2, DistanceMetric::L2).unwrap();

        {
            let index = open(&dir).await;
            index.ensure_schema(cosine, false).await.unwrap();
            index.upsert(&doc("a", vec![1.0, 0.0])).await.unwrap();

            // Rebuild stopped before the new schema record was written
            index.clear_schema_record().await.unwrap();
            index.create_data_table(l2).await.unwrap();
        }

        let index = open(&dir).await;
        assert!(index.schema().await.is_none());
        assert!(matches!(index.count().await, Err(AppError::IndexNotReady(_))));

        // Same dimension, so only the missing record prevents a stale attach
        assert_eq!(index.ensure_schema(cosine, false).await.unwrap(), SchemaAction::Recreated);
        assert_eq!(index.schema().await, Some(cosine));
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_query_returns_euclidean_distance() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir).await;
        let schema = IndexSchema::new(2, DistanceMetric::L2).unwrap();
        index.ensure_schema(schema, false).await.unwrap();

        let report = index
            .bulk_upsert(&[doc("far", vec![3.0, 4.0]), doc("near", vec![0.0, 1.0])])
            .await
            .unwrap();
        assert!(report.is_complete());

        let hits = index.query(&[0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document.id, "near");
        assert!((hits[0].distance - 1.0).abs() < 1e-4);
        assert!((hits[1].distance - 5.0).abs() < 1e-4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bulk_upsert_reports_failures() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir).await;
        let schema = IndexSchema::new(2, DistanceMetric::Cosine).unwrap();
        index.ensure_schema(schema, false).await.unwrap();

        let report = index
            .bulk_upsert(&[
                doc("a", vec![1.0, 0.0]),
                doc("short", vec![1.0]),
                doc("a", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(report.written, vec!["a"]);
        assert_eq!(report.failed_ids(), vec!["short", "a"]);
        assert_eq!(index.count().await.unwrap(), 1);
    }
}
