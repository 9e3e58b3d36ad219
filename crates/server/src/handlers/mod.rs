//! HTTP request handlers.

pub mod documents;
pub mod uploads;

pub use documents::*;
pub use uploads::*;

use axum::http::StatusCode;

/// GET / - Liveness probe.
pub async fn root() -> StatusCode {
    StatusCode::NO_CONTENT
}
