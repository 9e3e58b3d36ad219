use async_trait::async_trait;
use bytes::Bytes;
use docstage_storage::error::{StorageError, StorageResult};
use docstage_storage::traits::{FileStore, ObjectMeta, StreamingUpload};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Wraps a real store and fails writes while `failing` is set.
/// Simulates a full or unavailable disk.
#[allow(dead_code)]
pub struct FailingStore {
    pub inner: Arc<dyn FileStore>,
    pub failing: AtomicBool,
}

#[allow(dead_code)]
impl FailingStore {
    pub fn new(inner: Arc<dyn FileStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "no space left on device",
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FileStore for FailingStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn put_stream(&self, key: &str) -> StorageResult<Box<dyn StreamingUpload>> {
        self.check()?;
        self.inner.put_stream(key).await
    }

    async fn create_sized(&self, key: &str, size: u64) -> StorageResult<()> {
        self.check()?;
        self.inner.create_sized(key, size).await
    }

    async fn write_at(&self, key: &str, offset: u64, data: Bytes) -> StorageResult<()> {
        self.check()?;
        self.inner.write_at(key, offset, data).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        self.inner.delete_prefix(prefix).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.list(prefix).await
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}
