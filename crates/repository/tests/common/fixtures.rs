use docstage_core::{DocumentTypeDef, KeywordDataType, KeywordTypeDef};
use docstage_repository::{
    ConnectedProbe, LocalRepository, LocalSessionFactory, RepositoryPool, SessionPool,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A document type with one keyword of each commonly used data type.
#[allow(dead_code)]
pub fn loan_documents() -> DocumentTypeDef {
    DocumentTypeDef {
        id: 101,
        name: "Loan Documents".to_string(),
        group: Some("Lending".to_string()),
        keyword_types: vec![
            KeywordTypeDef {
                name: "Loan Number".to_string(),
                data_type: KeywordDataType::Numeric20,
            },
            KeywordTypeDef {
                name: "Borrower".to_string(),
                data_type: KeywordDataType::Alphanumeric,
            },
            KeywordTypeDef {
                name: "Closing Date".to_string(),
                data_type: KeywordDataType::Date,
            },
        ],
    }
}

/// A local repository in a temporary directory with a session pool over it.
#[allow(dead_code)]
pub struct TestRepository {
    pub repo: Arc<LocalRepository>,
    pub pool: RepositoryPool,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestRepository {
    pub async fn new() -> Self {
        Self::with_idle_timeout(Duration::from_secs(3600)).await
    }

    pub async fn with_idle_timeout(idle_timeout: Duration) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Arc::new(
            LocalRepository::open(temp_dir.path(), vec![loan_documents()])
                .await
                .expect("Failed to open repository"),
        );
        let pool = SessionPool::with_idle_timeout(
            Arc::new(LocalSessionFactory::new(repo.clone())),
            Arc::new(ConnectedProbe),
            idle_timeout,
        );
        Self {
            repo,
            pool,
            _temp_dir: temp_dir,
        }
    }
}
