//! Endpoint handlers. Each maps onto exactly one gateway operation.

use super::dto::{
    BulkCreateRequest, BulkCreateResponse, SearchRequest, SearchResponse, MAX_BULK_DOCUMENTS,
};
use super::error::{ApiError, ApiResult};
use super::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::time::Instant;
use vecgate_core::AppError;
use vecgate_engine::{Document, NewDocument};

pub async fn create_document(
    State(state): State<AppState>,
    payload: Result<Json<NewDocument>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let Json(new) = payload?;
    let document = state.gateway.store().create(new).await?;
    Ok((StatusCode::CREATED, Json(document.without_embedding())))
}

pub async fn bulk_create_documents(
    State(state): State<AppState>,
    payload: Result<Json<BulkCreateRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let count = request.documents.len();

    if count == 0 || count > MAX_BULK_DOCUMENTS {
        return Err(ApiError(AppError::InvalidInput(format!(
            "Bulk requests take 1 to {} documents, got {}",
            MAX_BULK_DOCUMENTS, count
        ))));
    }

    let outcome = state.gateway.store().bulk_write(request.documents).await?;
    let failed_ids: Vec<String> = outcome.failed.iter().map(|f| f.id.clone()).collect();

    let (status, message) = if failed_ids.is_empty() {
        (
            StatusCode::CREATED,
            format!("Created {} documents", outcome.documents.len()),
        )
    } else {
        (
            StatusCode::MULTI_STATUS,
            format!(
                "Created {} of {} documents",
                outcome.documents.len(),
                count
            ),
        )
    };

    let body = BulkCreateResponse {
        success_count: outcome.documents.len(),
        failed_count: failed_ids.len(),
        failed_ids,
        message,
        documents: outcome
            .documents
            .into_iter()
            .map(Document::without_embedding)
            .collect(),
    };
    Ok((status, Json(body)).into_response())
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Document>> {
    let document = state.gateway.store().get(&id).await?;
    Ok(Json(document.without_embedding()))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.gateway.store().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn search_documents(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Json<SearchResponse>> {
    let Json(request) = payload?;

    let limit = match request.limit {
        Some(l) if l < 1 => {
            return Err(ApiError(AppError::InvalidInput(format!(
                "Search limit must be at least 1, got {}",
                l
            ))))
        }
        Some(l) => Some(usize::try_from(l).unwrap_or(usize::MAX)),
        None => None,
    };

    let started = Instant::now();
    let results = state
        .gateway
        .search()
        .search(&request.query, limit)
        .await?;

    Ok(Json(SearchResponse {
        query: request.query,
        total: results.len(),
        results,
        search_time: started.elapsed().as_secs_f64(),
    }))
}

pub async fn health(State(state): State<AppState>) -> Response {
    let report = state.gateway.health().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}
