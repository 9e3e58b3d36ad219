//! The document repository session boundary.

use crate::error::RepositoryResult;
use crate::keyword::Keyword;
use async_trait::async_trait;
use bytes::Bytes;
use docstage_core::DocumentTypeDef;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Identifier of a stored document.
pub type DocumentId = i64;

/// One page of a document to be stored.
#[derive(Clone, Debug)]
pub struct Page {
    /// Original file name, used for the extension.
    pub file_name: String,
    /// Page contents.
    pub data: Bytes,
}

/// Everything needed to file a new document.
#[derive(Clone, Debug)]
pub struct NewDocument {
    /// Resolved document type.
    pub document_type: DocumentTypeDef,
    /// File type id, see [`crate::FileFormat`].
    pub file_type_id: i64,
    /// Typed keywords in submission order.
    pub keywords: Vec<Keyword>,
    /// Pages in index order.
    pub pages: Vec<Page>,
}

/// A document as recorded by the repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub document_type_id: i64,
    pub document_type_name: String,
    pub file_type_id: i64,
    /// Bumped whenever the document content or keywords change.
    pub latest_revision_id: i64,
    pub keywords: Vec<Keyword>,
    /// Stored page file names in order.
    pub pages: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A stateful connection to a document repository.
///
/// Sessions are expensive to create and are pooled; see
/// [`crate::SessionPool`]. A session is used by one request at a time.
#[async_trait]
pub trait RepositorySession: Send + Sync {
    /// Identifier of this session, for logs.
    fn session_id(&self) -> &str;

    /// Whether the session still believes it is connected.
    fn is_connected(&self) -> bool;

    /// Round-trip to the repository to confirm the session is usable.
    async fn ping(&self) -> RepositoryResult<()>;

    /// All document types visible to this session.
    async fn document_types(&self) -> RepositoryResult<Vec<DocumentTypeDef>>;

    /// Find a document type by name (case-insensitive).
    async fn find_document_type(&self, name: &str) -> RepositoryResult<Option<DocumentTypeDef>>;

    /// Store a new document and return its id.
    async fn store_document(&self, document: NewDocument) -> RepositoryResult<DocumentId>;

    /// Load a document with its keywords, or `None` if it does not exist.
    async fn get_document(&self, id: DocumentId) -> RepositoryResult<Option<StoredDocument>>;

    /// Delete a document. Fails with `DocumentNotFound` if absent.
    async fn delete_document(&self, id: DocumentId) -> RepositoryResult<()>;

    /// Close the session. Further calls fail with `Disconnected`.
    async fn disconnect(&self) -> RepositoryResult<()>;
}
