//! HTTP error taxonomy, one variant per failure class §7 requires a
//! stable machine code for. Grounded in `riptide-api/src/errors.rs`'s
//! `ApiError`/`IntoResponse` pairing, trimmed to this surface's six
//! endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use eventscout_core::EventscoutError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Upstream(#[from] EventscoutError),

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("queue error: {0}")]
    Queue(#[from] eventscout_queue::QueueError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(EventscoutError::Blocked(_)) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(EventscoutError::InvalidUrl(_)) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Queue(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::Upstream(e) => e.code(),
            ApiError::NotFound(_) => "not_found",
            ApiError::Queue(_) => "queue_error",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(code = self.code(), message = %message, "request failed");
        } else {
            tracing::warn!(code = self.code(), message = %message, "request rejected");
        }
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        }));
        (status, body).into_response()
    }
}
