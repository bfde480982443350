//! Request and response bodies.

use serde::{Deserialize, Serialize};
use vecgate_engine::{Document, NewDocument, SearchResult};

/// Largest accepted bulk request.
pub const MAX_BULK_DOCUMENTS: usize = 100;

#[derive(Debug, Deserialize)]
pub struct BulkCreateRequest {
    pub documents: Vec<NewDocument>,
}

#[derive(Debug, Serialize)]
pub struct BulkCreateResponse {
    pub success_count: usize,
    pub failed_count: usize,
    pub failed_ids: Vec<String>,
    pub message: String,
    pub documents: Vec<Document>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Signed so negative values reach validation instead of failing to parse
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub total: usize,
    /// Seconds spent embedding and searching
    pub search_time: f64,
}
