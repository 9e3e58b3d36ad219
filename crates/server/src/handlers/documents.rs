//! Document type listing and stored document handlers.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use docstage_repository::{DocumentId, StoredDocument};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// A document type as listed to clients.
#[derive(Debug, Serialize)]
pub struct DocumentTypeResponse {
    pub id: i64,
    pub name: String,
    pub group: Option<String>,
}

/// Response for the document hash endpoint.
#[derive(Debug, Serialize)]
pub struct DocumentHashResponse {
    pub document_id: DocumentId,
    pub hash: String,
}

/// GET /v1/document-types - List the document types available for filing.
#[tracing::instrument(skip(state))]
pub async fn list_document_types(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<DocumentTypeResponse>>> {
    let session = state.sessions.rent().await?;
    let types = session.document_types().await?;
    if types.is_empty() {
        return Err(ApiError::NotFound("no document types available".to_string()));
    }

    Ok(Json(
        types
            .into_iter()
            .map(|dt| DocumentTypeResponse {
                id: dt.id,
                name: dt.name,
                group: dt.group,
            })
            .collect(),
    ))
}

/// Hash input: the latest revision id followed by each requested keyword's value.
///
/// Keywords are taken in document order and matched by case-insensitive name.
pub fn document_hash(document: &StoredDocument, keyword_names: &[String]) -> String {
    let mut input = document.latest_revision_id.to_string();
    for keyword in &document.keywords {
        if keyword_names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&keyword.name))
        {
            input.push_str(&keyword.value);
        }
    }
    STANDARD.encode(Sha256::digest(input.as_bytes()))
}

/// GET /v1/documents/{document_id}/hash?keyword=... - Hash a document's revision and keywords.
#[tracing::instrument(skip(state, params))]
pub async fn get_document_hash(
    State(state): State<AppState>,
    Path(document_id): Path<DocumentId>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Json<DocumentHashResponse>> {
    let keyword_names: Vec<String> = params
        .into_iter()
        .filter(|(key, _)| key == "keyword")
        .map(|(_, value)| value)
        .collect();

    let session = state.sessions.rent().await?;
    let document = session
        .get_document(document_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("document {document_id} not found")))?;

    Ok(Json(DocumentHashResponse {
        document_id,
        hash: document_hash(&document, &keyword_names),
    }))
}

/// DELETE /v1/documents/{document_id} - Delete a stored document.
#[tracing::instrument(skip(state))]
pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<DocumentId>,
) -> ApiResult<StatusCode> {
    let session = state.sessions.rent().await?;
    session.delete_document(document_id).await?;
    tracing::info!("document deleted");
    Ok(StatusCode::NO_CONTENT)
}
