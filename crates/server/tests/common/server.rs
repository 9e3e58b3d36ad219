//! Server test utilities.

use super::fixtures::{loan_documents, scanned_correspondence};
use docstage_core::config::{AppConfig, MetadataConfig, RepositoryConfig, StorageConfig};
use docstage_server::{AppState, create_router};
use std::path::PathBuf;
use tempfile::TempDir;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary storage.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let mut config = AppConfig::for_testing();
        config.storage = StorageConfig::Filesystem {
            path: temp_dir.path().join("staging"),
        };
        config.metadata = MetadataConfig::Sqlite {
            path: temp_dir.path().join("metadata.db"),
            query_timeout_secs: None,
        };
        config.repository = RepositoryConfig::Local {
            path: temp_dir.path().join("repository"),
            document_types: vec![loan_documents(), scanned_correspondence()],
        };

        // Apply user modifications
        modifier(&mut config);

        let storage = docstage_storage::from_config(&config.storage)
            .await
            .expect("Failed to create staging storage");
        let metadata = docstage_metadata::from_config(&config.metadata)
            .await
            .expect("Failed to create metadata store");
        let sessions =
            docstage_repository::from_config(&config.repository, &config.session_pool)
                .await
                .expect("Failed to open repository");

        let state = AppState::new(config, storage, metadata, sessions);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Directory holding staged files.
    pub fn staging_dir(&self) -> PathBuf {
        self._temp_dir.path().join("staging")
    }

    /// Directory of a stored document in the local repository.
    pub fn document_dir(&self, document_id: i64) -> PathBuf {
        self._temp_dir
            .path()
            .join("repository")
            .join("documents")
            .join(document_id.to_string())
    }
}
