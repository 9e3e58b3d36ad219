//! Repository error types.

use thiserror::Error;

/// Document repository and session pool errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No session could be produced for the caller.
    #[error("repository session unavailable: {0}")]
    SessionUnavailable(String),

    /// The session was used after it lost its connection.
    #[error("repository session disconnected: {0}")]
    Disconnected(String),

    #[error("document type not found: {0}")]
    DocumentTypeNotFound(String),

    #[error("document not found: {0}")]
    DocumentNotFound(i64),

    #[error("invalid keyword value for '{keyword}': {reason}")]
    InvalidKeyword { keyword: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RepositoryError {
    /// Whether this error was caused by the request rather than the repository.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::DocumentTypeNotFound(_) | Self::DocumentNotFound(_) | Self::InvalidKeyword { .. }
        )
    }
}

/// Result type for repository operations.
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;
