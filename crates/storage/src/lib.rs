//! Staged file storage for docstage.
//!
//! This crate provides:
//! - A file store with pre-sized files and offset writes
//! - On-demand per-key locks for exclusive access to a staged file
//! - The chunk assembler that combines the two
//! - Backends: local filesystem

pub mod assembler;
pub mod backends;
pub mod error;
pub mod lock;
pub mod traits;

pub use assembler::ChunkAssembler;
pub use backends::filesystem::FilesystemBackend;
pub use error::{StorageError, StorageResult};
pub use lock::{KeyedLockGuard, KeyedLockManager};
pub use traits::{FileStore, ObjectMeta, StreamingUpload};

use docstage_core::config::StorageConfig;
use std::sync::Arc;

/// Create a file store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn FileStore>> {
    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
    }
}
