//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid upload id: {0}")]
    InvalidUploadId(String),

    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(u64),

    #[error("invalid document index: {0}")]
    InvalidDocumentIndex(String),

    #[error("invalid keyword value for '{keyword}': {reason}")]
    InvalidKeyword { keyword: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
