//! Error types for the solfa analyzer API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::audio::DecodeError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400) - wrong content type, missing field
    #[error("{0}")]
    InvalidInput(String),

    /// Upload exceeds the request body limit (413)
    #[error("Upload too large.")]
    PayloadTooLarge,

    /// Audio decode failure (500) - unreadable or corrupt upload
    #[error("Audio decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// Generic error (500)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::PayloadTooLarge => {
                (StatusCode::PAYLOAD_TOO_LARGE, "Upload too large.".to_string())
            }
            ApiError::Decode(ref err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Other(ref err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        // Error body uses the `detail` key; existing API consumers parse it.
        let body = Json(json!({ "detail": message }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
