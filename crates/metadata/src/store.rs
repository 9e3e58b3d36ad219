//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{UploadFileRow, UploadJobRow};
use crate::repos::UploadRepo;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: UploadRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub async fn new(
        path: impl AsRef<Path>,
        query_timeout_secs: Option<u64>,
    ) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection avoids
            // persistent "database is locked" failures under axum concurrency.
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(query_timeout_secs.unwrap_or(30)))
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::debug!(path = %path.display(), "sqlite metadata store opened");
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UploadRepo for SqliteStore {
    async fn create_job(&self, job: &UploadJobRow) -> MetadataResult<()> {
        if self.get_job(job.job_id).await?.is_some() {
            return Err(MetadataError::AlreadyExists(format!(
                "upload job {} already exists",
                job.job_id
            )));
        }

        sqlx::query(
            "INSERT INTO upload_jobs (job_id, file_count, document_index, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(job.job_id)
        .bind(job.file_count)
        .bind(&job.document_index)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> MetadataResult<Option<UploadJobRow>> {
        let row = sqlx::query_as::<_, UploadJobRow>("SELECT * FROM upload_jobs WHERE job_id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_job(&self, job_id: Uuid) -> MetadataResult<()> {
        let mut tx = self.pool.begin().await?;

        // Explicit so the slots go even on databases opened without foreign keys.
        sqlx::query("DELETE FROM upload_files WHERE job_id = ?")
            .bind(job_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM upload_jobs WHERE job_id = ?")
            .bind(job_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!(
                "upload job {} not found",
                job_id
            )));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_file(&self, file: &UploadFileRow) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO upload_files (
                job_id, file_index, resource_path, content_type, chunked, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id, file_index) DO UPDATE SET
                resource_path = excluded.resource_path,
                content_type = excluded.content_type,
                chunked = excluded.chunked,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(file.job_id)
        .bind(file.file_index)
        .bind(&file.resource_path)
        .bind(&file.content_type)
        .bind(file.chunked)
        .bind(file.created_at)
        .bind(file.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_file(
        &self,
        job_id: Uuid,
        file_index: i64,
    ) -> MetadataResult<Option<UploadFileRow>> {
        let row = sqlx::query_as::<_, UploadFileRow>(
            "SELECT * FROM upload_files WHERE job_id = ? AND file_index = ?",
        )
        .bind(job_id)
        .bind(file_index)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_files(&self, job_id: Uuid) -> MetadataResult<Vec<UploadFileRow>> {
        let rows = sqlx::query_as::<_, UploadFileRow>(
            "SELECT * FROM upload_files WHERE job_id = ? ORDER BY file_index",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_file(&self, job_id: Uuid, file_index: i64) -> MetadataResult<()> {
        let result = sqlx::query("DELETE FROM upload_files WHERE job_id = ? AND file_index = ?")
            .bind(job_id)
            .bind(file_index)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!(
                "file {} of upload job {} not found",
                file_index, job_id
            )));
        }
        Ok(())
    }
}

const SCHEMA_SQL: &str = r#"
-- Upload jobs
CREATE TABLE IF NOT EXISTS upload_jobs (
    job_id BLOB PRIMARY KEY,
    file_count INTEGER NOT NULL CHECK (file_count > 0),
    document_index TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- File slots, one per (job, index)
CREATE TABLE IF NOT EXISTS upload_files (
    job_id BLOB NOT NULL REFERENCES upload_jobs(job_id) ON DELETE CASCADE,
    file_index INTEGER NOT NULL CHECK (file_index >= 0),
    resource_path TEXT NOT NULL,
    content_type TEXT NOT NULL,
    chunked INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(job_id, file_index)
);
CREATE INDEX IF NOT EXISTS idx_upload_files_job ON upload_files(job_id);
"#;
