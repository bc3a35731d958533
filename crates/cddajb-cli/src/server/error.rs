use axum::response::{IntoResponse, Json, Response};
use cddajb_core::StoreError;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Process-wide incident counter; every error response gets the next number.
static INCIDENTS: AtomicU64 = AtomicU64::new(0);

/// Failure of a single API request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("a database update is already in progress")]
    UpdateRejected,

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    /// Short name shown in the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Store(e) => e.kind(),
            ApiError::UpdateRejected => "UpdateRejected",
            ApiError::Encode(_) => "EncodeError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let incident = INCIDENTS.fetch_add(1, Ordering::Relaxed) + 1;
        let message = format!("#{incident} {}: {self}", self.kind());
        tracing::error!(incident, kind = self.kind(), "{message}");

        // Failures still answer 200; the envelope carries the outcome.
        Json(json!({ "success": false, "error": message })).into_response()
    }
}

/// Failure to start or run the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;
