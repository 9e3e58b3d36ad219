//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use docstage_metadata::MetadataError;
use docstage_repository::RepositoryError;
use docstage_storage::StorageError;
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not all files required for upload are present")]
    MissingFiles { missing: Vec<u32> },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("core error: {0}")]
    Core(#[from] docstage_core::Error),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Conflict(_) => "conflict",
            Self::MissingFiles { .. } => "missing_files",
            Self::Internal(_) => "internal_error",
            Self::Storage(e) => match e {
                StorageError::OutOfRange { .. } => "out_of_range",
                StorageError::AlreadyExists(_) => "resource_conflict",
                _ => "storage_error",
            },
            Self::Metadata(_) => "metadata_error",
            Self::Repository(e) => match e {
                RepositoryError::SessionUnavailable(_) | RepositoryError::Disconnected(_) => {
                    "session_unavailable"
                }
                RepositoryError::InvalidKeyword { .. } => "invalid_keyword",
                _ => "repository_error",
            },
            Self::Core(_) => "core_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::MissingFiles { .. } => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(e) => match e {
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                StorageError::AlreadyExists(_) => StatusCode::CONFLICT,
                StorageError::OutOfRange { .. } | StorageError::InvalidKey(_) => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Metadata(e) => match e {
                MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
                MetadataError::AlreadyExists(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Repository(e) => match e {
                RepositoryError::SessionUnavailable(_) | RepositoryError::Disconnected(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                RepositoryError::DocumentTypeNotFound(_) | RepositoryError::DocumentNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                RepositoryError::InvalidKeyword { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_map_to_client_statuses() {
        let out_of_range = ApiError::from(StorageError::OutOfRange {
            key: "job/0_a.bin".to_string(),
            offset: 5000,
            len: 10,
            allocated: 100,
        });
        assert_eq!(out_of_range.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(out_of_range.code(), "out_of_range");

        let conflict = ApiError::from(StorageError::AlreadyExists("job/0_a.bin".to_string()));
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let io = ApiError::from(StorageError::Io(std::io::Error::other("disk full")));
        assert_eq!(io.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_repository_errors_map_to_statuses() {
        let unavailable =
            ApiError::from(RepositoryError::SessionUnavailable("connect failed".to_string()));
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let missing = ApiError::from(RepositoryError::DocumentNotFound(7));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let keyword = ApiError::from(RepositoryError::InvalidKeyword {
            keyword: "Loan Number".to_string(),
            reason: "not a number".to_string(),
        });
        assert_eq!(keyword.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_files_message() {
        let err = ApiError::MissingFiles { missing: vec![1] };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "not all files required for upload are present"
        );
    }
}
