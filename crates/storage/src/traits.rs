//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Store for staged files addressed by relative keys.
///
/// Besides whole-object writes, the store supports pre-sizing a file and
/// writing into it at arbitrary offsets, which is what chunked uploads need.
/// Implementations do not serialize access to a key; callers that mix
/// operations on the same key must hold a [`crate::KeyedLockManager`] lock.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's size without fetching content.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Get an object's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Start a streaming write that replaces the object on finish.
    async fn put_stream(&self, key: &str) -> StorageResult<Box<dyn StreamingUpload>>;

    /// Create a new zero-filled object of exactly `size` bytes.
    ///
    /// Fails with `AlreadyExists` if anything is present at `key`.
    async fn create_sized(&self, key: &str, size: u64) -> StorageResult<()>;

    /// Overwrite bytes of an existing object starting at `offset`.
    ///
    /// Never extends the object: fails with `OutOfRange` if the write
    /// would end past the allocated length.
    async fn write_at(&self, key: &str, offset: u64, data: Bytes) -> StorageResult<()>;

    /// Delete an object.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Delete every object under a prefix. Missing prefixes are not an error.
    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()>;

    /// List objects with a prefix.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Get the name of this storage backend.
    ///
    /// Used for metrics and logging.
    fn backend_name(&self) -> &'static str;

    /// Check if the storage backend is accessible.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Metadata about a stored object.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time (if available).
    pub last_modified: Option<time::OffsetDateTime>,
}

/// Trait for streaming uploads.
#[async_trait]
pub trait StreamingUpload: Send {
    /// Write a chunk of data.
    async fn write(&mut self, data: Bytes) -> StorageResult<()>;

    /// Finish the upload and return the total bytes written.
    async fn finish(self: Box<Self>) -> StorageResult<u64>;

    /// Abort the upload.
    async fn abort(self: Box<Self>) -> StorageResult<()>;
}
