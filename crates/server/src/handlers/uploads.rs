//! Upload job handlers.
//!
//! A job is created with its document index and file count, each slot is
//! filled either as a whole multipart file or as a pre-allocated file that
//! receives chunks in any order, and the job is finally committed as one
//! document in the repository.

use crate::error::{ApiError, ApiResult};
use crate::metrics::{
    BYTES_STAGED, CHUNK_WRITE_DURATION, CHUNKS_WRITTEN, FILES_UPLOADED, UPLOAD_COMMIT_DURATION,
    UPLOADS_ABANDONED, UPLOADS_COMMITTED, UPLOADS_CREATED, record_upload_error,
};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Multipart, Path, Request, State};
use axum::http::StatusCode;
use docstage_core::upload::{
    ChunkedUploadRequest, CommitUploadResponse, CreateUploadRequest, CreateUploadResponse,
    is_image_content_type, sanitize_file_name, slot_key,
};
use docstage_core::{ChunkPlan, DocumentTypeDef, DocumentUploadIndex, UploadJobId};
use docstage_metadata::models::{UploadFileRow, UploadJobRow};
use docstage_repository::{FileFormat, Keyword, NewDocument, Page};
use docstage_storage::StorageError;
use futures::TryStreamExt;
use std::time::Instant;
use time::OffsetDateTime;

/// Maximum request body size for JSON requests (1 MiB).
const MAX_JSON_BODY_SIZE: usize = 1024 * 1024;

/// Read and parse a JSON request body.
async fn read_json<T: serde::de::DeserializeOwned>(req: Request) -> ApiResult<T> {
    let body = axum::body::to_bytes(req.into_body(), MAX_JSON_BODY_SIZE)
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read body: {e}")))?;
    serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))
}

/// Load an upload job or fail with 404.
async fn load_job(state: &AppState, upload_id: &str) -> ApiResult<(UploadJobId, UploadJobRow)> {
    let job_id = UploadJobId::parse(upload_id)?;
    let job = state
        .metadata
        .get_job(*job_id.as_uuid())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("upload job {job_id} not found")))?;
    Ok((job_id, job))
}

fn check_index(job: &UploadJobRow, index: u32) -> ApiResult<()> {
    if i64::from(index) >= job.file_count {
        return Err(ApiError::BadRequest(format!(
            "file index {index} is outside 0..{}",
            job.file_count
        )));
    }
    Ok(())
}

/// Pages of a multi-file document must be images.
fn check_content_type(job: &UploadJobRow, content_type: Option<&str>) -> ApiResult<String> {
    let content_type = content_type
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .ok_or_else(|| ApiError::BadRequest("content type is required".to_string()))?;

    if job.file_count > 1 && !is_image_content_type(content_type) {
        return Err(ApiError::BadRequest(format!(
            "content type {content_type} is not allowed for a multi-file upload"
        )));
    }
    Ok(content_type.to_string())
}

/// Type every keyword the document type knows; unknown names are skipped.
fn type_keywords(
    document_type: &DocumentTypeDef,
    index: &DocumentUploadIndex,
) -> ApiResult<Vec<Keyword>> {
    let mut keywords = Vec::new();
    for (name, value) in &index.keywords {
        let Some(keyword_type) = document_type.find_keyword_type(name) else {
            tracing::warn!(
                keyword = %name,
                document_type = %document_type.name,
                "keyword type not defined for document type, skipping"
            );
            continue;
        };
        for raw in value.values() {
            keywords.push(Keyword::parse(keyword_type, raw)?);
        }
    }
    Ok(keywords)
}

/// Drop whatever the slot held before, both the staged resource and its record.
///
/// The slot stays empty until [`record_slot`] runs after the new resource is
/// in place, so a failed write leaves the index missing rather than pointing
/// at a resource that does not exist.
async fn clear_slot(state: &AppState, job_id: &UploadJobId, index: u32) -> ApiResult<()> {
    let file_index = i64::from(index);
    let Some(previous) = state.metadata.get_file(*job_id.as_uuid(), file_index).await? else {
        return Ok(());
    };

    tracing::debug!(previous = %previous.resource_path, "removing previous slot resource");
    state
        .assembler
        .remove_if_exists(&previous.resource_path)
        .await
        .inspect_err(|_| record_upload_error("storage_failure"))?;
    state.metadata.delete_file(*job_id.as_uuid(), file_index).await?;
    Ok(())
}

/// Record a slot whose resource has been staged at `key`.
async fn record_slot(
    state: &AppState,
    job_id: &UploadJobId,
    index: u32,
    key: &str,
    content_type: String,
    chunked: bool,
) -> ApiResult<()> {
    let now = OffsetDateTime::now_utc();
    let row = UploadFileRow {
        job_id: *job_id.as_uuid(),
        file_index: i64::from(index),
        resource_path: key.to_string(),
        content_type,
        chunked,
        created_at: now,
        updated_at: now,
    };
    state.metadata.upsert_file(&row).await?;
    Ok(())
}

/// File name of a staged page, recovered from its slot key.
fn page_file_name(file: &UploadFileRow) -> String {
    let base = file
        .resource_path
        .rsplit('/')
        .next()
        .unwrap_or(&file.resource_path);
    let prefix = format!("{}_", file.file_index);
    base.strip_prefix(&prefix).unwrap_or(base).to_string()
}

/// POST /v1/uploads - Create an upload job.
#[tracing::instrument(skip(state, req), fields(document_type, upload_id))]
pub async fn create_upload(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<CreateUploadResponse>)> {
    let body: CreateUploadRequest = read_json(req).await?;
    tracing::Span::current().record("document_type", body.document_type_name.as_str());

    if body.file_count == 0 {
        return Err(ApiError::BadRequest(
            "file_count must be at least 1".to_string(),
        ));
    }

    let index = body.index();
    {
        let session = state.sessions.rent().await?;
        let document_type = session
            .find_document_type(&index.document_type_name)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "document type {} not found",
                    index.document_type_name
                ))
            })?;
        type_keywords(&document_type, &index)?;
    }

    let job_id = UploadJobId::new();
    tracing::Span::current().record("upload_id", tracing::field::display(&job_id));

    let job = UploadJobRow {
        job_id: *job_id.as_uuid(),
        file_count: i64::from(body.file_count),
        document_index: index.to_json()?,
        created_at: OffsetDateTime::now_utc(),
    };
    state.metadata.create_job(&job).await?;
    UPLOADS_CREATED.inc();

    tracing::info!(file_count = body.file_count, "upload job created");

    Ok((
        StatusCode::CREATED,
        Json(CreateUploadResponse {
            upload_id: job_id.to_string(),
        }),
    ))
}

/// PUT /v1/uploads/{upload_id}/files/{index} - Stage a whole file from a multipart form.
#[tracing::instrument(skip(state, multipart), fields(upload_id = %upload_id))]
pub async fn upload_file(
    State(state): State<AppState>,
    Path((upload_id, index)): Path<(String, u32)>,
    mut multipart: Multipart,
) -> ApiResult<StatusCode> {
    let (job_id, job) = load_job(&state, &upload_id).await?;
    check_index(&job, index)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let Some(raw_name) = field.file_name() else {
            continue;
        };
        let file_name = sanitize_file_name(raw_name)
            .ok_or_else(|| ApiError::BadRequest(format!("invalid file name: {raw_name}")))?;
        let content_type = check_content_type(&job, field.content_type())?;

        clear_slot(&state, &job_id, index).await?;

        let key = slot_key(&job_id, index, &file_name);
        let source = field.map_err(|e| StorageError::Io(std::io::Error::other(e)));
        let bytes = state
            .assembler
            .create_whole_file(&key, source)
            .await
            .inspect_err(|_| record_upload_error("storage_failure"))?;
        record_slot(&state, &job_id, index, &key, content_type, false).await?;

        FILES_UPLOADED.inc();
        BYTES_STAGED.inc_by(bytes);
        tracing::info!(key = %key, bytes, "file staged");
        return Ok(StatusCode::NO_CONTENT);
    }

    Err(ApiError::BadRequest(
        "multipart body contains no file".to_string(),
    ))
}

/// POST /v1/uploads/{upload_id}/files/{index}/chunk - Pre-allocate a slot for chunks.
#[tracing::instrument(skip(state, req), fields(upload_id = %upload_id))]
pub async fn start_chunked_upload(
    State(state): State<AppState>,
    Path((upload_id, index)): Path<(String, u32)>,
    req: Request,
) -> ApiResult<Json<ChunkPlan>> {
    let (job_id, job) = load_job(&state, &upload_id).await?;
    check_index(&job, index)?;

    let body: ChunkedUploadRequest = read_json(req).await?;
    let file_name = sanitize_file_name(&body.file_name)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid file name: {}", body.file_name)))?;
    let content_type = check_content_type(&job, Some(body.content_type.as_str()))?;

    clear_slot(&state, &job_id, index).await?;

    let key = slot_key(&job_id, index, &file_name);
    let plan = state
        .assembler
        .preallocate(&key, body.file_bytes)
        .await
        .inspect_err(|e| record_upload_error(storage_error_label(e)))?;
    record_slot(&state, &job_id, index, &key, content_type, true).await?;

    tracing::info!(
        key = %key,
        file_bytes = body.file_bytes,
        chunk_count = plan.chunk_count,
        "chunked upload started"
    );
    Ok(Json(plan))
}

/// PUT /v1/uploads/{upload_id}/files/{index}/chunk/{chunk_index} - Write one chunk.
#[tracing::instrument(skip(state, req), fields(upload_id = %upload_id))]
pub async fn upload_chunk(
    State(state): State<AppState>,
    Path((upload_id, index, chunk_index)): Path<(String, u32, u64)>,
    req: Request,
) -> ApiResult<StatusCode> {
    let start = Instant::now();
    let (job_id, _job) = load_job(&state, &upload_id).await?;

    let slot = state
        .metadata
        .get_file(*job_id.as_uuid(), i64::from(index))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("file {index} of upload {job_id} not found")))?;
    if !slot.chunked {
        return Err(ApiError::BadRequest(format!(
            "file {index} was not started as a chunked upload"
        )));
    }

    let limit = usize::try_from(state.assembler.chunk_size()).unwrap_or(usize::MAX);
    let data = axum::body::to_bytes(req.into_body(), limit)
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read chunk: {e}")))?;
    let len = data.len() as u64;

    state
        .assembler
        .write_chunk(&slot.resource_path, chunk_index, data)
        .await
        .inspect_err(|e| record_upload_error(storage_error_label(e)))?;

    CHUNKS_WRITTEN.inc();
    BYTES_STAGED.inc_by(len);
    CHUNK_WRITE_DURATION.observe(start.elapsed().as_secs_f64());
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/uploads/{upload_id}/commit - File the staged pages as one document.
#[tracing::instrument(skip(state), fields(upload_id = %upload_id, document_id))]
pub async fn commit_upload(
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
) -> ApiResult<Json<CommitUploadResponse>> {
    let start = Instant::now();
    let (job_id, job) = load_job(&state, &upload_id).await?;

    let session = state
        .sessions
        .rent()
        .await
        .inspect_err(|_| record_upload_error("session_unavailable"))?;

    let index = DocumentUploadIndex::from_json(&job.document_index)
        .map_err(|e| ApiError::Internal(format!("stored document index is unreadable: {e}")))?;
    let document_type = session
        .find_document_type(&index.document_type_name)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "document type {} not found",
                index.document_type_name
            ))
        })?;

    let files = state.metadata.list_files(*job_id.as_uuid()).await?;
    let missing: Vec<u32> = (0..job.file_count)
        .filter(|i| !files.iter().any(|f| f.file_index == *i))
        .filter_map(|i| u32::try_from(i).ok())
        .collect();
    if !missing.is_empty() {
        tracing::warn!(?missing, "commit requested with missing files");
        record_upload_error("missing_files");
        return Err(ApiError::MissingFiles { missing });
    }

    let keywords = type_keywords(&document_type, &index)?;

    let mut pages = Vec::with_capacity(files.len());
    for file in files.iter().filter(|f| f.file_index < job.file_count) {
        let data = state.assembler.read(&file.resource_path).await?;
        pages.push(Page {
            file_name: page_file_name(file),
            data,
        });
    }
    let page_names: Vec<&str> = pages.iter().map(|p| p.file_name.as_str()).collect();
    let file_format = FileFormat::for_pages(&page_names);

    let document_id = session
        .store_document(NewDocument {
            document_type,
            file_type_id: file_format.id(),
            keywords,
            pages,
        })
        .await?;
    drop(session);
    tracing::Span::current().record("document_id", document_id);

    // The document exists now; a failed cleanup must not make the client retry.
    if let Err(e) = state.metadata.delete_job(*job_id.as_uuid()).await {
        tracing::error!(error = %e, "failed to delete committed upload job");
    }
    if let Err(e) = state.storage.delete_prefix(&job_id.to_string()).await {
        tracing::error!(error = %e, "failed to delete staged files of committed upload");
    }

    UPLOADS_COMMITTED.inc();
    UPLOAD_COMMIT_DURATION.observe(start.elapsed().as_secs_f64());
    tracing::info!(document_id, ?file_format, "upload committed");

    Ok(Json(CommitUploadResponse { document_id }))
}

/// DELETE /v1/uploads/{upload_id} - Abandon an upload job.
#[tracing::instrument(skip(state), fields(upload_id = %upload_id))]
pub async fn delete_upload(
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
) -> ApiResult<StatusCode> {
    let (job_id, _job) = load_job(&state, &upload_id).await?;

    state.storage.delete_prefix(&job_id.to_string()).await?;
    state.metadata.delete_job(*job_id.as_uuid()).await?;
    UPLOADS_ABANDONED.inc();

    tracing::info!("upload job abandoned");
    Ok(StatusCode::NO_CONTENT)
}

/// Metric label for a storage error.
fn storage_error_label(e: &StorageError) -> &'static str {
    match e {
        StorageError::OutOfRange { .. } => "out_of_range",
        StorageError::AlreadyExists(_) => "resource_conflict",
        StorageError::NotFound(_) => "not_found",
        _ => "storage_failure",
    }
}
