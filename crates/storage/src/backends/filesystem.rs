//! Local filesystem storage backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::{FileStore, ObjectMeta, StreamingUpload};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::instrument;
use uuid::Uuid;

/// Local filesystem file store rooted at the staging working directory.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend, creating the root if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Root directory of this backend.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path inside the root.
    ///
    /// Runs the symlink checks on the blocking pool since they stat and
    /// canonicalize.
    async fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || resolve_key(&root, &key))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }

    /// Ensure parent directory exists.
    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

/// Map a not-found I/O error onto `StorageError::NotFound` for `key`.
fn not_found_or_io(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |e| {
        if e.kind() == ErrorKind::NotFound {
            StorageError::NotFound(key.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

/// Validate `key` and join it onto `root`.
///
/// Rejects absolute keys, `..` and other non-normal components, and any
/// existing path or nearest existing ancestor that resolves (through
/// symlinks) outside the root.
fn resolve_key(root: &Path, key: &str) -> StorageResult<PathBuf> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("empty key".to_string()));
    }
    if key.starts_with('/') || key.starts_with('\\') {
        return Err(StorageError::InvalidKey(format!(
            "path traversal not allowed: {key}"
        )));
    }
    if Path::new(key)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(StorageError::InvalidKey(format!(
            "contains unsafe path component: {key}"
        )));
    }

    let path = root.join(key);
    let root_canonical = root.canonicalize().map_err(|e| {
        StorageError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to canonicalize root: {e}"),
        ))
    })?;

    // The path itself if it exists (including dangling symlinks), otherwise
    // the nearest ancestor that does.
    let mut candidate = Some(path.as_path());
    while let Some(current) = candidate {
        match std::fs::symlink_metadata(current) {
            Ok(meta) => {
                let canonical = current.canonicalize().map_err(|e| {
                    if meta.file_type().is_symlink() {
                        StorageError::InvalidKey(format!(
                            "symlink target missing or invalid: {key}"
                        ))
                    } else {
                        StorageError::Io(e)
                    }
                })?;
                if !canonical.starts_with(&root_canonical) {
                    return Err(StorageError::InvalidKey(format!(
                        "resolved path escapes storage root: {key}"
                    )));
                }
                return Ok(path);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                candidate = current.parent();
            }
            Err(err) => return Err(StorageError::Io(err)),
        }
    }

    Ok(path)
}

#[async_trait]
impl FileStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key).await?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let path = self.key_path(key).await?;
        let metadata = fs::metadata(&path).await.map_err(not_found_or_io(key))?;

        Ok(ObjectMeta {
            size: metadata.len(),
            last_modified: metadata.modified().ok().map(|t| t.into()),
        })
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.key_path(key).await?;
        let data = fs::read(&path).await.map_err(not_found_or_io(key))?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn put_stream(&self, key: &str) -> StorageResult<Box<dyn StreamingUpload>> {
        let path = self.key_path(key).await?;
        self.ensure_parent(&path).await?;

        // Unique temp name so two writers never share a temp file
        let temp_name = format!(".tmp.{}", Uuid::new_v4());
        let temp_path = path.with_file_name(
            path.file_name()
                .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
                .unwrap_or_else(|| temp_name.clone()),
        );
        let file = fs::File::create(&temp_path).await?;

        Ok(Box::new(FilesystemUpload {
            file,
            temp_path,
            final_path: path,
            bytes_written: 0,
        }))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn create_sized(&self, key: &str, size: u64) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        self.ensure_parent(&path).await?;

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    StorageError::AlreadyExists(key.to_string())
                } else {
                    StorageError::Io(e)
                }
            })?;

        if let Err(e) = file.set_len(size).await {
            drop(file);
            let _ = fs::remove_file(&path).await;
            return Err(StorageError::Io(e));
        }
        file.sync_all().await?;
        Ok(())
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn write_at(&self, key: &str, offset: u64, data: Bytes) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        let mut file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .await
            .map_err(not_found_or_io(key))?;

        let allocated = file.metadata().await?.len();
        let len = data.len() as u64;
        let in_range = if len == 0 {
            offset <= allocated
        } else {
            offset < allocated && offset.checked_add(len).is_some_and(|end| end <= allocated)
        };
        if !in_range {
            return Err(StorageError::OutOfRange {
                key: key.to_string(),
                offset,
                len,
                allocated,
            });
        }

        file.seek(std::io::SeekFrom::Start(offset)).await?;
        file.write_all(&data).await?;
        file.sync_data().await?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        fs::remove_file(&path).await.map_err(not_found_or_io(key))?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        let path = self.key_path(prefix).await?;
        let meta = match fs::symlink_metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let result = if meta.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let base_path = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.key_path(prefix).await?
        };
        let mut results = Vec::new();

        match fs::try_exists(&base_path).await {
            Ok(false) => return Ok(results),
            Ok(true) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(results),
            Err(e) => return Err(StorageError::Io(e)),
        }

        let mut stack = vec![base_path];
        while let Some(dir) = stack.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                // file_type() does not follow symlinks; symlinks are skipped
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    stack.push(path);
                } else if file_type.is_file()
                    && let Ok(rel) = path.strip_prefix(&self.root)
                {
                    results.push(rel.to_string_lossy().to_string());
                }
            }
        }

        results.sort();
        Ok(results)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {e}"),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                ErrorKind::NotADirectory,
                format!("storage root is not a directory: {:?}", self.root),
            )));
        }

        Ok(())
    }
}

/// Streaming upload for filesystem backend.
struct FilesystemUpload {
    file: fs::File,
    temp_path: PathBuf,
    final_path: PathBuf,
    bytes_written: u64,
}

#[async_trait]
impl StreamingUpload for FilesystemUpload {
    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        self.file.write_all(&data).await?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    async fn finish(self: Box<Self>) -> StorageResult<u64> {
        let Self {
            file,
            temp_path,
            final_path,
            bytes_written,
        } = *self;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, &final_path).await?;
        Ok(bytes_written)
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        let Self {
            file, temp_path, ..
        } = *self;
        drop(file);
        let _ = fs::remove_file(&temp_path).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn backend() -> (tempfile::TempDir, FilesystemBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();
        (dir, backend)
    }

    async fn put(backend: &FilesystemBackend, key: &str, data: &'static [u8]) {
        let mut upload = backend.put_stream(key).await.unwrap();
        upload.write(Bytes::from_static(data)).await.unwrap();
        upload.finish().await.unwrap();
    }

    #[tokio::test]
    async fn test_put_stream_replaces_existing() {
        let (_dir, backend) = backend().await;

        put(&backend, "job/0_a.txt", b"first version").await;
        put(&backend, "job/0_a.txt", b"second").await;

        assert_eq!(
            backend.get("job/0_a.txt").await.unwrap(),
            Bytes::from_static(b"second")
        );
        // No temp files left behind
        assert_eq!(backend.list("job").await.unwrap(), vec!["job/0_a.txt"]);
    }

    #[tokio::test]
    async fn test_aborted_stream_leaves_nothing() {
        let (_dir, backend) = backend().await;

        let mut upload = backend.put_stream("job/0_a.txt").await.unwrap();
        upload.write(Bytes::from_static(b"partial")).await.unwrap();
        upload.abort().await.unwrap();

        assert!(!backend.exists("job/0_a.txt").await.unwrap());
        assert!(backend.list("job").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_sized_zero_fills() {
        let (_dir, backend) = backend().await;

        backend.create_sized("job/0_big.bin", 5000).await.unwrap();
        assert_eq!(backend.head("job/0_big.bin").await.unwrap().size, 5000);
        let data = backend.get("job/0_big.bin").await.unwrap();
        assert!(data.iter().all(|b| *b == 0));
    }

    #[tokio::test]
    async fn test_create_sized_rejects_existing() {
        let (_dir, backend) = backend().await;

        backend.create_sized("job/0_big.bin", 10).await.unwrap();
        let err = backend.create_sized("job/0_big.bin", 10).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_write_at_bounds() {
        let (_dir, backend) = backend().await;
        backend.create_sized("f", 10).await.unwrap();

        backend
            .write_at("f", 7, Bytes::from_static(b"abc"))
            .await
            .unwrap();
        assert!(matches!(
            backend.write_at("f", 8, Bytes::from_static(b"abc")).await,
            Err(StorageError::OutOfRange { .. })
        ));
        assert!(matches!(
            backend.write_at("f", 10, Bytes::from_static(b"a")).await,
            Err(StorageError::OutOfRange { .. })
        ));
        assert!(matches!(
            backend
                .write_at("f", u64::MAX, Bytes::from_static(b"a"))
                .await,
            Err(StorageError::OutOfRange { .. })
        ));

        // Never extends the file
        assert_eq!(backend.head("f").await.unwrap().size, 10);
        assert_eq!(&backend.get("f").await.unwrap()[7..], b"abc");
    }

    #[tokio::test]
    async fn test_write_at_missing_file() {
        let (_dir, backend) = backend().await;
        let err = backend
            .write_at("missing", 0, Bytes::from_static(b"a"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_delete_prefix_is_idempotent() {
        let (_dir, backend) = backend().await;
        put(&backend, "job/0_a.txt", b"a").await;
        put(&backend, "job/1_b.txt", b"b").await;
        put(&backend, "other/0_c.txt", b"c").await;

        backend.delete_prefix("job").await.unwrap();
        backend.delete_prefix("job").await.unwrap();

        assert_eq!(backend.list("").await.unwrap(), vec!["other/0_c.txt"]);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let (_dir, backend) = backend().await;

        assert!(backend.exists("../escape").await.is_err());
        assert!(backend.exists("/absolute/path").await.is_err());
        assert!(backend.exists("foo/../bar").await.is_err());
        assert!(backend.exists("").await.is_err());

        assert!(backend.exists("valid/nested/key").await.is_ok());
    }

    #[tokio::test]
    async fn test_dots_inside_file_names_allowed() {
        let (_dir, backend) = backend().await;

        put(&backend, "job/0_scan..v2.pdf", b"pdf").await;
        assert_eq!(backend.get("job/0_scan..v2.pdf").await.unwrap().as_ref(), b"pdf");
        assert!(!backend.exists("job/..hidden").await.unwrap());
        backend.delete("job/0_scan..v2.pdf").await.unwrap();
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_symlink_traversal_rejected() {
        use std::os::unix::fs::symlink;

        let (dir, backend) = backend().await;
        let outside_dir = tempfile::tempdir().unwrap();
        std::fs::write(outside_dir.path().join("secret.txt"), "secret data").unwrap();

        symlink(outside_dir.path(), dir.path().join("escape")).unwrap();

        let result = backend.get("escape/secret.txt").await;
        match result {
            Err(StorageError::InvalidKey(msg)) => assert!(msg.contains("escapes storage root")),
            other => panic!("expected InvalidKey error, got: {other:?}"),
        }

        // Creating through a symlinked ancestor is rejected too
        let result = backend.create_sized("escape/nested/file.bin", 10).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert!(!outside_dir.path().join("nested").exists());
    }
}
