//! Core domain types and shared logic for docstage.
//!
//! This crate defines the data model used across all other crates:
//! - Upload jobs, file slots and the document index payload
//! - Chunk arithmetic shared by pre-allocation and chunk writes
//! - Document type and keyword type definitions
//! - Application configuration

pub mod chunk;
pub mod config;
pub mod document;
pub mod error;
pub mod upload;

pub use chunk::{ChunkPlan, chunk_count, chunk_offset};
pub use document::{DocumentTypeDef, KeywordDataType, KeywordTypeDef};
pub use error::{Error, Result};
pub use upload::{DocumentUploadIndex, KeywordValue, UploadJobId};

/// Default chunk size: 1,000,000 bytes.
///
/// Clients split files on this boundary, so changing it invalidates any
/// chunked upload that is in flight.
pub const DEFAULT_CHUNK_SIZE: u64 = 1_000_000;
