//! Configuration types shared across crates.

use crate::document::DocumentTypeDef;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Chunk size in bytes for chunked uploads.
    /// Used for both the reported chunk count and chunk write offsets.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    /// Maximum size of a whole-file (multipart) upload in bytes.
    #[serde(default = "default_max_whole_file_size")]
    pub max_whole_file_size: u64,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_chunk_size() -> u64 {
    crate::DEFAULT_CHUNK_SIZE
}

fn default_max_whole_file_size() -> u64 {
    512 * 1024 * 1024
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            chunk_size: default_chunk_size(),
            max_whole_file_size: default_max_whole_file_size(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("server.chunk_size must be greater than 0".to_string());
        }
        if usize::try_from(self.chunk_size).is_err() {
            return Err(format!(
                "server.chunk_size {} exceeds platform address space",
                self.chunk_size
            ));
        }
        Ok(())
    }
}

/// Staging storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem working directory.
    Filesystem {
        /// Root directory for staged files.
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/staging"),
        }
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database.
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// Query timeout in seconds (advisory only, SQLite cannot cancel queries).
        #[serde(default = "default_sqlite_query_timeout_secs")]
        query_timeout_secs: Option<u64>,
    },
}

fn default_sqlite_query_timeout_secs() -> Option<u64> {
    Some(30)
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/metadata.db"),
            query_timeout_secs: default_sqlite_query_timeout_secs(),
        }
    }
}

/// Document repository configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RepositoryConfig {
    /// Directory-backed repository.
    Local {
        /// Root directory for stored documents.
        path: PathBuf,
        /// Document types available for filing.
        #[serde(default)]
        document_types: Vec<DocumentTypeDef>,
    },
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self::Local {
            path: PathBuf::from("./data/repository"),
            document_types: Vec::new(),
        }
    }
}

impl RepositoryConfig {
    /// Validate repository configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            RepositoryConfig::Local { document_types, .. } => {
                let mut seen = std::collections::HashSet::new();
                for dt in document_types {
                    if dt.name.trim().is_empty() {
                        return Err("repository document type name cannot be empty".to_string());
                    }
                    if !seen.insert(dt.name.to_ascii_lowercase()) {
                        return Err(format!(
                            "repository document type '{}' is defined more than once",
                            dt.name
                        ));
                    }
                }
                Ok(())
            }
        }
    }
}

/// Repository session pool configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionPoolConfig {
    /// Seconds an idle session may sit in the pool before it is discarded.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_idle_timeout_secs() -> u64 {
    3600 // 1 hour
}

impl Default for SessionPoolConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl SessionPoolConfig {
    /// Get the idle timeout as a Duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// API key authentication configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// SHA256 hex of the accepted `X-API-KEY` value.
    /// Generate with: `echo -n "your-api-key" | sha256sum`
    /// When unset, every protected request fails as a server misconfiguration.
    pub api_key_hash: Option<String>,
}

impl AuthConfig {
    /// Create a test configuration.
    ///
    /// **For testing only.** The matching key is `test-api-key`.
    pub fn for_testing() -> Self {
        Self {
            // SHA256 of "test-api-key"
            api_key_hash: Some(
                "4c806362b613f7496abf284146efd31da90e4b16169fe001841ca17290f427c4".to_string(),
            ),
        }
    }

    /// Validate the configured hash format.
    pub fn validate(&self) -> Result<(), String> {
        match &self.api_key_hash {
            Some(hash) if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) => {
                Err("auth.api_key_hash must be 64 hex characters (SHA256)".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Staging storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Document repository configuration.
    #[serde(default)]
    pub repository: RepositoryConfig,
    /// Session pool configuration.
    #[serde(default)]
    pub session_pool: SessionPoolConfig,
    /// API key configuration.
    #[serde(default)]
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses default paths and the test API key.
    pub fn for_testing() -> Self {
        Self {
            auth: AuthConfig::for_testing(),
            ..Default::default()
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.repository.validate()?;
        self.auth.validate()?;
        Ok(())
    }
}
