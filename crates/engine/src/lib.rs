//! Vector indexing and retrieval engine.
//!
//! Embeds text through a pluggable provider, stores documents in a vector
//! index with a managed schema, and ranks them against a query.

pub mod embeddings;
pub mod gateway;
pub mod lancedb_index;
pub mod memory_index;
pub mod search;
pub mod store;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{EmbeddingConfig, EmbeddingEngine, EmbeddingProvider};
pub use gateway::{Gateway, IndexStats};
pub use memory_index::MemoryIndex;
pub use search::{SearchEngine, DEFAULT_SEARCH_LIMIT};
pub use store::{BulkCreateOutcome, DocumentStore};
pub use types::{
    BulkWriteReport, DistanceMetric, Document, FailedWrite, HealthReport, IndexKind, IndexSchema,
    Neighbor, NewDocument, SchemaAction, SearchResult,
};
pub use vector_index::VectorIndex;
