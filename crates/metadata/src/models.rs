//! Database models mapping to the metadata schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Upload job record.
#[derive(Debug, Clone, FromRow)]
pub struct UploadJobRow {
    pub job_id: Uuid,
    /// Number of file slots the job expects, indexed `0..file_count`.
    pub file_count: i64,
    /// Serialized document index (type name and keywords) as JSON.
    pub document_index: String,
    pub created_at: OffsetDateTime,
}

/// One file slot of an upload job.
#[derive(Debug, Clone, FromRow)]
pub struct UploadFileRow {
    pub job_id: Uuid,
    pub file_index: i64,
    /// Storage key of the staged file.
    pub resource_path: String,
    pub content_type: String,
    /// Whether the file is being assembled from chunks.
    pub chunked: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
