//! Mapping from engine errors to HTTP responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use vecgate_core::AppError;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::InvalidInput(rejection.body_text()))
    }
}

pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::ProviderUnavailable(_) | AppError::IndexNotReady(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        AppError::Provider(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);

        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, self.0);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self.0);
        }

        let body = ErrorBody {
            error: self.0.kind().to_string(),
            detail: self.0.to_string(),
            timestamp: Utc::now(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
