//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use stevedore_core::ErrorResponse;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] stevedore_storage::StorageError),

    #[error(transparent)]
    Core(#[from] stevedore_core::Error),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal_error",
            Self::Storage(e) => match e {
                stevedore_storage::StorageError::NotFound(_) => "not_found",
                stevedore_storage::StorageError::Unavailable(_) => "storage_unavailable",
                _ => "storage_error",
            },
            Self::Core(e) => match e {
                stevedore_core::Error::SizeMismatch { .. } => "size_mismatch",
                stevedore_core::Error::InvalidReference(_) => "invalid_reference",
                stevedore_core::Error::InvalidManifest(_) => "invalid_manifest",
                _ => "bad_request",
            },
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(e) => match e {
                stevedore_storage::StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                stevedore_storage::StorageError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(e) => match e {
                stevedore_core::Error::SizeMismatch { .. } => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
