//! Assembly of staged files from whole-file streams and out-of-order chunks.
//!
//! Every operation takes the per-key lock for its target, so writes to one
//! file are serialized while different files proceed in parallel. The lock
//! is held across the storage I/O and nothing else.

use crate::error::{StorageError, StorageResult};
use crate::lock::KeyedLockManager;
use crate::traits::FileStore;
use bytes::Bytes;
use docstage_core::{ChunkPlan, chunk_offset};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tracing::instrument;

/// Writes staged files under per-key locks.
#[derive(Clone)]
pub struct ChunkAssembler {
    store: Arc<dyn FileStore>,
    locks: KeyedLockManager,
    chunk_size: u64,
}

impl ChunkAssembler {
    /// Create an assembler over `store` using `chunk_size` for offsets and plans.
    pub fn new(store: Arc<dyn FileStore>, locks: KeyedLockManager, chunk_size: u64) -> Self {
        Self {
            store,
            locks,
            chunk_size,
        }
    }

    /// Chunk size used for offsets and reported plans.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Lock manager guarding the staged files.
    pub fn locks(&self) -> &KeyedLockManager {
        &self.locks
    }

    /// Underlying file store.
    pub fn store(&self) -> &Arc<dyn FileStore> {
        &self.store
    }

    /// Create or replace `key` with the full contents of `source`.
    ///
    /// The file only becomes visible once the stream completes; a failing
    /// stream leaves any previous contents untouched.
    #[instrument(skip(self, source), fields(key = %key))]
    pub async fn create_whole_file<S>(&self, key: &str, source: S) -> StorageResult<u64>
    where
        S: Stream<Item = StorageResult<Bytes>> + Send,
    {
        let _guard = self.locks.acquire(key).await;
        let mut source = std::pin::pin!(source);

        let mut upload = self.store.put_stream(key).await?;
        while let Some(next) = source.next().await {
            let written = match next {
                Ok(data) => upload.write(data).await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                tracing::warn!(key = %key, error = %e, "whole file write failed, aborting");
                upload.abort().await?;
                return Err(e);
            }
        }

        let bytes = upload.finish().await?;
        tracing::debug!(key = %key, bytes, "whole file written");
        Ok(bytes)
    }

    /// Create `key` as a zero-filled file of `total_size` bytes ready for chunk writes.
    ///
    /// Fails with `AlreadyExists` if the key holds data; callers replacing a
    /// slot remove the previous file first.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn preallocate(&self, key: &str, total_size: u64) -> StorageResult<ChunkPlan> {
        let _guard = self.locks.acquire(key).await;
        self.store.create_sized(key, total_size).await?;

        let plan = ChunkPlan::for_size(total_size, self.chunk_size);
        tracing::debug!(
            key = %key,
            total_size,
            chunk_count = plan.chunk_count,
            "chunked file pre-allocated"
        );
        Ok(plan)
    }

    /// Write chunk `chunk_index` of `key` at `chunk_index * chunk_size`.
    ///
    /// Indices beyond the reported chunk count are accepted as long as the
    /// bytes fit inside the pre-allocated length.
    #[instrument(skip(self, data), fields(key = %key, size = data.len()))]
    pub async fn write_chunk(&self, key: &str, chunk_index: u64, data: Bytes) -> StorageResult<()> {
        let len = data.len() as u64;
        let offset =
            chunk_offset(chunk_index, self.chunk_size).ok_or_else(|| StorageError::OutOfRange {
                key: key.to_string(),
                offset: u64::MAX,
                len,
                allocated: 0,
            })?;

        let _guard = self.locks.acquire(key).await;
        self.store.write_at(key, offset, data).await?;
        tracing::debug!(key = %key, chunk_index, offset, len, "chunk written");
        Ok(())
    }

    /// Read the full contents of `key`.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn read(&self, key: &str) -> StorageResult<Bytes> {
        let _guard = self.locks.acquire(key).await;
        self.store.get(key).await
    }

    /// Delete `key`.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn remove(&self, key: &str) -> StorageResult<()> {
        let _guard = self.locks.acquire(key).await;
        self.store.delete(key).await
    }

    /// Delete `key`, treating a missing file as success.
    pub async fn remove_if_exists(&self, key: &str) -> StorageResult<()> {
        match self.remove(key).await {
            Ok(()) | Err(StorageError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
