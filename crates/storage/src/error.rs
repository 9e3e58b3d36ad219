//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    /// A sized file was requested at a key that already holds data.
    #[error("object already exists: {0}")]
    AlreadyExists(String),

    /// A write would land outside the allocated length of the target.
    #[error("write out of range for {key}: offset {offset} + {len} bytes exceeds allocated length {allocated}")]
    OutOfRange {
        key: String,
        offset: u64,
        len: u64,
        allocated: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Whether this error was caused by the request rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists(_) | Self::OutOfRange { .. } | Self::InvalidKey(_)
        )
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
