//! Upload job and file slot repository.

use crate::error::MetadataResult;
use crate::models::{UploadFileRow, UploadJobRow};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for upload jobs and their file slots.
#[async_trait]
pub trait UploadRepo: Send + Sync {
    /// Create a new upload job. Fails with `AlreadyExists` on a duplicate id.
    async fn create_job(&self, job: &UploadJobRow) -> MetadataResult<()>;

    /// Get an upload job by ID.
    async fn get_job(&self, job_id: Uuid) -> MetadataResult<Option<UploadJobRow>>;

    /// Delete a job and, by cascade, all of its file slots.
    async fn delete_job(&self, job_id: Uuid) -> MetadataResult<()>;

    /// Insert the slot, or replace the one already recorded for the same job and index.
    ///
    /// A replaced slot keeps its original `created_at`.
    async fn upsert_file(&self, file: &UploadFileRow) -> MetadataResult<()>;

    /// Get the slot at `file_index` of a job.
    async fn get_file(&self, job_id: Uuid, file_index: i64)
    -> MetadataResult<Option<UploadFileRow>>;

    /// All slots of a job ordered by index.
    async fn list_files(&self, job_id: Uuid) -> MetadataResult<Vec<UploadFileRow>>;

    /// Delete a single slot.
    async fn delete_file(&self, job_id: Uuid, file_index: i64) -> MetadataResult<()>;
}
