//! Upload job types and request/response shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an upload job.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadJobId(Uuid);

impl UploadJobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidUploadId(e.to_string()))
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UploadJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UploadJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UploadJobId({})", self.0)
    }
}

impl fmt::Display for UploadJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A keyword value as supplied by the client: one string or a list of strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeywordValue {
    Single(String),
    Multiple(Vec<String>),
}

impl KeywordValue {
    /// All raw values, in the order supplied.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(v) => vec![v.as_str()],
            Self::Multiple(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

/// Index payload stored with a job and applied to the document at commit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUploadIndex {
    /// Name of the document type to file under.
    pub document_type_name: String,
    /// Keyword values keyed by keyword type name.
    #[serde(default)]
    pub keywords: BTreeMap<String, KeywordValue>,
}

impl DocumentUploadIndex {
    /// Serialize for storage alongside the job record.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| crate::Error::Serialization(e.to_string()))
    }

    /// Parse a stored payload.
    pub fn from_json(s: &str) -> crate::Result<Self> {
        serde_json::from_str(s).map_err(|e| crate::Error::InvalidDocumentIndex(e.to_string()))
    }
}

/// Request to create an upload job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateUploadRequest {
    /// Name of the document type to file under.
    pub document_type_name: String,
    /// Keyword values keyed by keyword type name.
    #[serde(default)]
    pub keywords: BTreeMap<String, KeywordValue>,
    /// Number of files (pages) the job expects.
    pub file_count: u32,
}

impl CreateUploadRequest {
    /// Split off the index payload stored with the job.
    pub fn index(&self) -> DocumentUploadIndex {
        DocumentUploadIndex {
            document_type_name: self.document_type_name.clone(),
            keywords: self.keywords.clone(),
        }
    }
}

/// Response after creating an upload job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateUploadResponse {
    /// The job ID to use for subsequent file uploads.
    pub upload_id: String,
}

/// Request to start a chunked file upload for one slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkedUploadRequest {
    /// Total size of the file in bytes.
    pub file_bytes: u64,
    /// Original file name.
    pub file_name: String,
    /// Declared MIME type.
    pub content_type: String,
}

/// Response after committing an upload job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitUploadResponse {
    /// Identifier of the stored document.
    pub document_id: i64,
}

/// MIME types accepted for pages of a multi-file upload.
pub const IMAGE_CONTENT_TYPES: &[&str] = &["image/bmp", "image/jpeg", "image/png", "image/tiff"];

/// Whether `content_type` is an image type accepted for multi-page documents.
pub fn is_image_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    IMAGE_CONTENT_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(essence))
}

/// Reduce a client-supplied file name to its final path component.
///
/// Returns `None` if nothing usable remains.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.to_string())
}

/// Storage key for the file in slot `index` of job `job_id`.
pub fn slot_key(job_id: &UploadJobId, index: u32, file_name: &str) -> String {
    format!("{job_id}/{index}_{file_name}")
}
