//! Request-level errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

use crate::error::StoreError;

use super::handlers::ErrorResponse;

/// Errors surfaced by the numbers endpoint.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The `number` parameter is missing or not a 32-bit integer.
    #[error("{0}")]
    InvalidParams(String),

    /// Insert failed; nothing was stored.
    #[error("failed to insert number: {0}")]
    Insert(#[source] StoreError),

    /// Sorted read failed after a committed insert.
    #[error("failed to get numbers: {0}")]
    List(#[source] StoreError),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            ApiError::Insert(_) | ApiError::List(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidParams(_) => "invalid_params",
            ApiError::Insert(_) => "store_insert",
            ApiError::List(_) => "store_list",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(kind = self.kind(), error = %self, "Request failed");
        } else {
            warn!(kind = self.kind(), error = %self, "Rejected request");
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
