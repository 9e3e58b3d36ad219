//! Directory-backed document repository.
//!
//! Layout under the root:
//!
//! ```text
//! documents/{id}/document.json
//! documents/{id}/page_{n}.{ext}
//! ```
//!
//! `document.json` is written last and atomically, so a document directory
//! without it is an interrupted store and is ignored.

use crate::error::{RepositoryError, RepositoryResult};
use crate::pool::{HealthCheck, SessionFactory};
use crate::session::{DocumentId, NewDocument, RepositorySession, StoredDocument};
use async_trait::async_trait;
use docstage_core::DocumentTypeDef;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use time::OffsetDateTime;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

const DOCUMENTS_DIR: &str = "documents";
const DOCUMENT_FILE: &str = "document.json";

/// Repository state shared by all sessions.
pub struct LocalRepository {
    root: PathBuf,
    document_types: Vec<DocumentTypeDef>,
    /// Last allocated document id. Also serializes id allocation.
    last_id: Mutex<DocumentId>,
}

impl LocalRepository {
    /// Open the repository at `root`, creating it if needed.
    pub async fn open(
        root: impl AsRef<Path>,
        document_types: Vec<DocumentTypeDef>,
    ) -> RepositoryResult<Self> {
        let root = root.as_ref().to_path_buf();
        let documents = root.join(DOCUMENTS_DIR);
        fs::create_dir_all(&documents).await?;

        let mut last_id = 0;
        let mut entries = fs::read_dir(&documents).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<DocumentId>().ok())
            {
                last_id = last_id.max(id);
            }
        }

        tracing::info!(
            root = %root.display(),
            document_types = document_types.len(),
            last_id,
            "local repository opened"
        );

        Ok(Self {
            root,
            document_types,
            last_id: Mutex::new(last_id),
        })
    }

    /// Root directory of this repository.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_dir(&self, id: DocumentId) -> PathBuf {
        self.root.join(DOCUMENTS_DIR).join(id.to_string())
    }

    async fn allocate_dir(&self) -> RepositoryResult<(DocumentId, PathBuf)> {
        let mut last_id = self.last_id.lock().await;
        loop {
            *last_id += 1;
            let dir = self.document_dir(*last_id);
            match fs::create_dir(&dir).await {
                Ok(()) => return Ok((*last_id, dir)),
                // Left behind by an interrupted store; skip the id
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// A session against a [`LocalRepository`].
pub struct LocalSession {
    id: String,
    repo: Arc<LocalRepository>,
    connected: AtomicBool,
}

impl LocalSession {
    /// Connect a new session.
    pub fn connect(repo: Arc<LocalRepository>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            repo,
            connected: AtomicBool::new(true),
        }
    }

    fn ensure_connected(&self) -> RepositoryResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepositoryError::Disconnected(self.id.clone()))
        }
    }
}

#[async_trait]
impl RepositorySession for LocalSession {
    fn session_id(&self) -> &str {
        &self.id
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn ping(&self) -> RepositoryResult<()> {
        self.ensure_connected()?;
        let meta = fs::metadata(self.repo.root.join(DOCUMENTS_DIR)).await?;
        if !meta.is_dir() {
            return Err(RepositoryError::Internal(
                "repository documents path is not a directory".to_string(),
            ));
        }
        Ok(())
    }

    async fn document_types(&self) -> RepositoryResult<Vec<DocumentTypeDef>> {
        self.ensure_connected()?;
        Ok(self.repo.document_types.clone())
    }

    async fn find_document_type(&self, name: &str) -> RepositoryResult<Option<DocumentTypeDef>> {
        self.ensure_connected()?;
        Ok(self
            .repo
            .document_types
            .iter()
            .find(|dt| dt.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    #[instrument(skip(self, document), fields(session_id = %self.id, document_type = %document.document_type.name, pages = document.pages.len()))]
    async fn store_document(&self, document: NewDocument) -> RepositoryResult<DocumentId> {
        self.ensure_connected()?;
        let (id, dir) = self.repo.allocate_dir().await?;

        let mut pages = Vec::with_capacity(document.pages.len());
        for (n, page) in document.pages.iter().enumerate() {
            let name = match Path::new(&page.file_name).extension().and_then(|e| e.to_str()) {
                Some(ext) => format!("page_{n}.{}", ext.to_ascii_lowercase()),
                None => format!("page_{n}"),
            };
            fs::write(dir.join(&name), &page.data).await?;
            pages.push(name);
        }

        let stored = StoredDocument {
            id,
            document_type_id: document.document_type.id,
            document_type_name: document.document_type.name,
            file_type_id: document.file_type_id,
            latest_revision_id: 1,
            keywords: document.keywords,
            pages,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_vec_pretty(&stored)?;
        let temp = dir.join(format!(".{DOCUMENT_FILE}.{}", Uuid::new_v4()));
        fs::write(&temp, json).await?;
        fs::rename(&temp, dir.join(DOCUMENT_FILE)).await?;

        tracing::info!(document_id = id, "document stored");
        Ok(id)
    }

    async fn get_document(&self, id: DocumentId) -> RepositoryResult<Option<StoredDocument>> {
        self.ensure_connected()?;
        let path = self.repo.document_dir(id).join(DOCUMENT_FILE);
        match fs::read(&path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(session_id = %self.id))]
    async fn delete_document(&self, id: DocumentId) -> RepositoryResult<()> {
        self.ensure_connected()?;
        if self.get_document(id).await?.is_none() {
            return Err(RepositoryError::DocumentNotFound(id));
        }
        fs::remove_dir_all(self.repo.document_dir(id)).await?;
        tracing::info!(document_id = id, "document deleted");
        Ok(())
    }

    async fn disconnect(&self) -> RepositoryResult<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::debug!(session_id = %self.id, "session disconnected");
        }
        Ok(())
    }
}

/// Opens [`LocalSession`]s for the pool.
pub struct LocalSessionFactory {
    repo: Arc<LocalRepository>,
}

impl LocalSessionFactory {
    pub fn new(repo: Arc<LocalRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl SessionFactory<Box<dyn RepositorySession>> for LocalSessionFactory {
    async fn create(&self) -> RepositoryResult<Box<dyn RepositorySession>> {
        let session = LocalSession::connect(self.repo.clone());
        session
            .ping()
            .await
            .map_err(|e| RepositoryError::SessionUnavailable(e.to_string()))?;
        tracing::debug!(session_id = %session.id, "local session connected");
        Ok(Box::new(session))
    }

    async fn dispose(&self, session: Box<dyn RepositorySession>) {
        if let Err(e) = session.disconnect().await {
            tracing::warn!(session_id = %session.session_id(), error = %e, "failed to disconnect session");
        }
    }
}

/// Health check that requires a connected session answering a ping.
pub struct ConnectedProbe;

#[async_trait]
impl HealthCheck<Box<dyn RepositorySession>> for ConnectedProbe {
    async fn is_healthy(&self, session: &Box<dyn RepositorySession>) -> bool {
        if !session.is_connected() {
            return false;
        }
        match session.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(session_id = %session.session_id(), error = %e, "session ping failed");
                false
            }
        }
    }
}
