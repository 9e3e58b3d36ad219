//! Upload job metadata for docstage.
//!
//! Jobs record the declared file count and the document index supplied at
//! creation; file slots record where each staged file lives and whether it
//! is being assembled from chunks.

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use models::{UploadFileRow, UploadJobRow};
pub use repos::UploadRepo;
pub use store::{MetadataStore, SqliteStore};

use docstage_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite {
            path,
            query_timeout_secs,
        } => {
            let store = SqliteStore::new(path, *query_timeout_secs).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
