//! Application state shared across handlers.

use docstage_core::config::AppConfig;
use docstage_metadata::MetadataStore;
use docstage_repository::RepositoryPool;
use docstage_storage::{ChunkAssembler, FileStore, KeyedLockManager};
use std::sync::Arc;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Staging file store.
    pub storage: Arc<dyn FileStore>,
    /// Locked writes into the staging store.
    pub assembler: ChunkAssembler,
    /// Upload job metadata.
    pub metadata: Arc<dyn MetadataStore>,
    /// Pooled document repository sessions.
    pub sessions: RepositoryPool,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Logs a warning for settings that leave the API unusable.
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn FileStore>,
        metadata: Arc<dyn MetadataStore>,
        sessions: RepositoryPool,
    ) -> Self {
        if config.auth.api_key_hash.is_none() {
            tracing::warn!("auth.api_key_hash is not set; every /v1 request will fail");
        }

        let assembler = ChunkAssembler::new(
            storage.clone(),
            KeyedLockManager::new(),
            config.server.chunk_size,
        );

        Self {
            config: Arc::new(config),
            storage,
            assembler,
            metadata,
            sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstage_core::config::{RepositoryConfig, SessionPoolConfig};
    use docstage_metadata::SqliteStore;
    use docstage_storage::FilesystemBackend;
    use tempfile::tempdir;

    #[tokio::test]
    async fn assembler_uses_configured_chunk_size() {
        let temp = tempdir().unwrap();
        let storage: Arc<dyn FileStore> =
            Arc::new(FilesystemBackend::new(temp.path().join("staging")).await.unwrap());
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&temp.path().join("metadata.db"), None)
                .await
                .unwrap(),
        );
        let sessions = docstage_repository::from_config(
            &RepositoryConfig::Local {
                path: temp.path().join("repository"),
                document_types: Vec::new(),
            },
            &SessionPoolConfig::default(),
        )
        .await
        .unwrap();

        let mut config = AppConfig::for_testing();
        config.server.chunk_size = 4096;

        let state = AppState::new(config, storage, metadata, sessions);
        assert_eq!(state.assembler.chunk_size(), 4096);
        assert_eq!(state.sessions.available(), 0);
    }
}
