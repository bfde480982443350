//! Document store: create, read and delete documents on top of a vector index.

use crate::embeddings::EmbeddingEngine;
use crate::types::{Document, FailedWrite, IndexSchema, NewDocument};
use crate::vector_index::VectorIndex;
use chrono::Utc;
use std::sync::Arc;
use vecgate_core::{AppError, AppResult};

/// Outcome of a bulk create whose embedding step succeeded.
#[derive(Debug, Clone)]
pub struct BulkCreateOutcome {
    /// Persisted documents, in input order
    pub documents: Vec<Document>,
    /// Documents the index did not persist, in input order
    pub failed: Vec<FailedWrite>,
}

/// Document lifecycle over an embedding engine and a vector index.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    index: Arc<dyn VectorIndex>,
    embeddings: EmbeddingEngine,
    schema: IndexSchema,
    lazy_init: bool,
}

impl DocumentStore {
    /// `schema` is what lazy initialization creates on the first write.
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embeddings: EmbeddingEngine,
        schema: IndexSchema,
        lazy_init: bool,
    ) -> Self {
        Self {
            index,
            embeddings,
            schema,
            lazy_init,
        }
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn embeddings(&self) -> &EmbeddingEngine {
        &self.embeddings
    }

    fn validate(new: &NewDocument, position: Option<usize>) -> AppResult<()> {
        let at = position
            .map(|i| format!(" (document {})", i))
            .unwrap_or_default();

        if new.content.trim().is_empty() {
            return Err(AppError::InvalidInput(format!(
                "Document content must not be empty{}",
                at
            )));
        }
        if let Some(id) = &new.id {
            if id.trim().is_empty() {
                return Err(AppError::InvalidInput(format!(
                    "Document id must not be blank{}",
                    at
                )));
            }
        }
        if let Some(metadata) = &new.metadata {
            if !metadata.is_object() {
                return Err(AppError::InvalidInput(format!(
                    "Document metadata must be a JSON object{}",
                    at
                )));
            }
        }
        Ok(())
    }

    fn assemble(new: NewDocument, embedding: Vec<f32>) -> Document {
        Document {
            id: new
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            content: new.content,
            embedding: Some(embedding),
            metadata: new
                .metadata
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
            created_at: Utc::now(),
        }
    }

    /// Create the schema on first write when lazy initialization is on.
    async fn ensure_ready(&self) -> AppResult<()> {
        if self.lazy_init && self.index.schema().await.is_none() {
            tracing::info!("Creating index schema on first write ({})", self.schema);
            self.index.ensure_schema(self.schema, false).await?;
        }
        Ok(())
    }

    /// Embed and store one document. Returns it with its embedding.
    pub async fn create(&self, new: NewDocument) -> AppResult<Document> {
        Self::validate(&new, None)?;

        let embedding = self.embeddings.embed_text(&new.content).await?;
        let document = Self::assemble(new, embedding);

        self.ensure_ready().await?;
        self.index.upsert(&document).await?;

        tracing::info!("Created document {}", document.id);
        Ok(document)
    }

    /// Embed all documents in one provider call, then write them in one batch.
    ///
    /// Nothing is written unless every content embeds. Index failures for
    /// individual ids are reported in the outcome, not rolled back.
    pub async fn bulk_write(&self, new: Vec<NewDocument>) -> AppResult<BulkCreateOutcome> {
        if new.is_empty() {
            return Ok(BulkCreateOutcome {
                documents: Vec::new(),
                failed: Vec::new(),
            });
        }

        let mut supplied = std::collections::HashSet::new();
        for (i, doc) in new.iter().enumerate() {
            Self::validate(doc, Some(i))?;
            if let Some(id) = &doc.id {
                if !supplied.insert(id.as_str()) {
                    return Err(AppError::InvalidInput(format!(
                        "Duplicate document id '{}' (document {})",
                        id, i
                    )));
                }
            }
        }

        let texts: Vec<String> = new.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embeddings.embed_texts(&texts).await?;

        let documents: Vec<Document> = new
            .into_iter()
            .zip(embeddings)
            .map(|(doc, embedding)| Self::assemble(doc, embedding))
            .collect();

        self.ensure_ready().await?;
        let report = self.index.bulk_upsert(&documents).await?;

        let failed_ids: std::collections::HashSet<&str> =
            report.failed.iter().map(|f| f.id.as_str()).collect();
        let written: Vec<Document> = documents
            .iter()
            .filter(|d| !failed_ids.contains(d.id.as_str()))
            .cloned()
            .collect();

        if report.is_complete() {
            tracing::info!("Created {} documents", written.len());
        } else {
            tracing::warn!(
                "Bulk create stored {} of {} documents; failed: {}",
                written.len(),
                documents.len(),
                report.failed_ids().join(", ")
            );
        }

        Ok(BulkCreateOutcome {
            documents: written,
            failed: report.failed,
        })
    }

    /// Like [`DocumentStore::bulk_write`], but any per-id failure fails the
    /// call with `PartialWrite`.
    pub async fn bulk_create(&self, new: Vec<NewDocument>) -> AppResult<Vec<Document>> {
        let outcome = self.bulk_write(new).await?;
        if !outcome.failed.is_empty() {
            return Err(AppError::PartialWrite {
                failed_ids: outcome.failed.into_iter().map(|f| f.id).collect(),
            });
        }
        Ok(outcome.documents)
    }

    pub async fn get(&self, id: &str) -> AppResult<Document> {
        match self.index.get(id).await? {
            Some(document) => Ok(document),
            None => {
                tracing::debug!("Document {} not found", id);
                Err(AppError::NotFound(format!("Document '{}' not found", id)))
            }
        }
    }

    /// Delete a document. Unknown ids report `NotFound`.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.get(id).await?;
        self.index.delete(id).await?;

        tracing::info!("Deleted document {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;
    use crate::memory_index::MemoryIndex;
    use crate::types::DistanceMetric;
    use serde_json::json;

    fn store(lazy_init: bool) -> DocumentStore {
        let schema = IndexSchema::new(64, DistanceMetric::Cosine).unwrap();
        let engine = EmbeddingEngine::new(Arc::new(TrigramProvider::new(64)), 64).unwrap();
        DocumentStore::new(Arc::new(MemoryIndex::default()), engine, schema, lazy_init)
    }

    #[tokio::test]
    async fn test_blank_content_rejected() {
        let store = store(true);

        for content in ["", "   ", "\n\t"] {
            let result = store.create(NewDocument::new(content)).await;
            assert!(matches!(result, Err(AppError::InvalidInput(_))));
        }
    }

    #[tokio::test]
    async fn test_write_without_schema_is_not_ready() {
        let store = store(false);
        let result = store.create("hello".into()).await;
        assert!(matches!(result, Err(AppError::IndexNotReady(_))));
    }

    #[tokio::test]
    async fn test_lazy_init_creates_schema() {
        let store = store(true);
        let doc = store.create("hello".into()).await.unwrap();

        assert_eq!(store.index().schema().await.unwrap().dimension, 64);
        assert_eq!(store.get(&doc.id).await.unwrap().content, "hello");
    }

    #[tokio::test]
    async fn test_supplied_id_and_metadata() {
        let store = store(true);
        let doc = store
            .create(
                NewDocument::new("hello")
                    .with_id("greeting")
                    .with_metadata(serde_json::json!({"lang": "en"})),
            )
            .await
            .unwrap();

        assert_eq!(doc.id, "greeting");
        let fetched = store.get("greeting").await.unwrap();
        assert_eq!(fetched.metadata["lang"], "en");
    }

    #[tokio::test]
    async fn test_bulk_validates_before_embedding() {
        let store = store(true);
        let result = store
            .bulk_create(vec!["ok".into(), " ".into()])
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(err.to_string().contains("document 1"));
        // Nothing written, not even the schema
        assert!(store.index().schema().await.is_none());
    }

    #[tokio::test]
    async fn test_non_object_metadata_rejected() {
        let store = store(true);

        for metadata in [json!([1, 2]), json!("tag"), json!(7)] {
            let result = store
                .create(NewDocument::new("x").with_metadata(metadata))
                .await;
            assert!(matches!(result, Err(AppError::InvalidInput(_))));
        }

        let result = store
            .bulk_create(vec![
                NewDocument::new("fine").with_metadata(json!({"k": "v"})),
                NewDocument::new("bad").with_metadata(json!(["k"])),
            ])
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(err.to_string().contains("document 1"));
        assert!(store.index().schema().await.is_none());
    }

    #[tokio::test]
    async fn test_bulk_rejects_repeated_ids() {
        let store = store(true);
        let result = store
            .bulk_create(vec![
                NewDocument::new("one").with_id("same"),
                NewDocument::new("two").with_id("same"),
            ])
            .await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(store.index().schema().await.is_none());
    }

    #[tokio::test]
    async fn test_bulk_empty_is_empty() {
        let store = store(false);
        assert!(store.bulk_create(Vec::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let store = store(true);
        store.create("x".into()).await.unwrap();

        let result = store.delete("missing").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
