//! Document repository access for docstage.
//!
//! This crate provides:
//! - The repository session boundary and a directory-backed implementation
//! - A session pool that reuses healthy sessions and evicts stale ones
//! - Keyword value typing and file format resolution

pub mod backends;
pub mod error;
pub mod file_format;
pub mod keyword;
pub mod pool;
pub mod session;

pub use backends::local::{ConnectedProbe, LocalRepository, LocalSession, LocalSessionFactory};
pub use error::{RepositoryError, RepositoryResult};
pub use file_format::FileFormat;
pub use keyword::{Keyword, TypedKeyword};
pub use pool::{HealthCheck, PoolStats, RentedSession, SessionFactory, SessionPool};
pub use session::{DocumentId, NewDocument, Page, RepositorySession, StoredDocument};

use docstage_core::config::{RepositoryConfig, SessionPoolConfig};
use std::sync::Arc;

/// Pool of boxed repository sessions, as used by the server.
pub type RepositoryPool = SessionPool<Box<dyn RepositorySession>>;

/// Open the configured repository and build a session pool over it.
pub async fn from_config(
    config: &RepositoryConfig,
    pool_config: &SessionPoolConfig,
) -> RepositoryResult<RepositoryPool> {
    match config {
        RepositoryConfig::Local {
            path,
            document_types,
        } => {
            let repo = Arc::new(LocalRepository::open(path, document_types.clone()).await?);
            Ok(SessionPool::with_idle_timeout(
                Arc::new(LocalSessionFactory::new(repo)),
                Arc::new(ConnectedProbe),
                pool_config.idle_timeout(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_config_local_ok() {
        let temp = tempfile::tempdir().unwrap();
        let config = RepositoryConfig::Local {
            path: temp.path().join("repository"),
            document_types: Vec::new(),
        };

        let pool = from_config(&config, &SessionPoolConfig::default()).await.unwrap();
        assert_eq!(pool.idle_timeout(), pool::DEFAULT_IDLE_TIMEOUT);

        let session = pool.rent().await.unwrap();
        session.ping().await.unwrap();
        assert!(session.document_types().await.unwrap().is_empty());
        drop(session);
        assert_eq!(pool.available(), 1);
    }
}
