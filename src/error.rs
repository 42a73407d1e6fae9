use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::repository::RepositoryError;

/// Renders the shared `{"status": "error", "code": ...}` body.
pub fn error_response(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "status": "error", "code": code }))).into_response()
}

/// ApiError
///
/// Failures raised by terminal handlers once a request is past the guard.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => error_response(StatusCode::NOT_FOUND, "not_found"),
            ApiError::Repository(err) => {
                tracing::error!(error = %err, "repository call failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}
