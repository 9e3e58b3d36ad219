//! HTTP upload service for docstage.
//!
//! This crate provides the HTTP facade over staging, metadata and the
//! document repository:
//! - Upload job creation with document index validation
//! - Whole-file and out-of-order chunked file staging
//! - Commit of a complete job as one repository document
//! - Document hash and delete endpoints

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use auth::TraceId;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
