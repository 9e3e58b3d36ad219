//! Prometheus metrics for the docstage server.
//!
//! Exposes counters for upload jobs, chunk writes and repository sessions.
//!
//! # Security Note
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping.
//! Metrics carry no job ids, file names or keyword values, but they do expose
//! aggregate usage. Restrict `/metrics` to the scraper's network at the
//! infrastructure level.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Upload job metrics
pub static UPLOADS_CREATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "docstage_uploads_created_total",
        "Total number of upload jobs created",
    )
    .expect("metric creation failed")
});

pub static UPLOADS_COMMITTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "docstage_uploads_committed_total",
        "Total number of upload jobs committed as documents",
    )
    .expect("metric creation failed")
});

pub static UPLOADS_ABANDONED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "docstage_uploads_abandoned_total",
        "Total number of upload jobs deleted before commit",
    )
    .expect("metric creation failed")
});

// File and chunk metrics
pub static FILES_UPLOADED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "docstage_files_uploaded_total",
        "Total number of whole files staged",
    )
    .expect("metric creation failed")
});

pub static CHUNKS_WRITTEN: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "docstage_chunks_written_total",
        "Total number of chunks written into staged files",
    )
    .expect("metric creation failed")
});

pub static BYTES_STAGED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "docstage_bytes_staged_total",
        "Total bytes written into staged files",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_COMMIT_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "docstage_upload_commit_duration_seconds",
            "Time taken to commit an upload job",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
    )
    .expect("metric creation failed")
});

pub static CHUNK_WRITE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "docstage_chunk_write_duration_seconds",
            "Time taken to write a single chunk",
        )
        .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
    )
    .expect("metric creation failed")
});

pub static UPLOAD_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("docstage_upload_errors_total", "Total upload errors by type"),
        &["error_type"],
    )
    .expect("metric creation failed")
});

// Repository session pool metrics, refreshed on scrape
pub static SESSIONS_CREATED: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "docstage_repository_sessions_created",
        "Repository sessions opened since startup",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_RENTED: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "docstage_repository_sessions_rented",
        "Repository session rentals since startup",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_EVICTED: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "docstage_repository_sessions_evicted",
        "Idle repository sessions discarded as stale or unhealthy",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_IDLE: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "docstage_repository_sessions_idle",
        "Repository sessions currently idle in the pool",
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(UPLOADS_CREATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOADS_COMMITTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOADS_ABANDONED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(FILES_UPLOADED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CHUNKS_WRITTEN.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(BYTES_STAGED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOAD_COMMIT_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CHUNK_WRITE_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOAD_ERRORS.clone()))
            .expect("metric registration failed");

        // Session pool
        REGISTRY
            .register(Box::new(SESSIONS_CREATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SESSIONS_RENTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SESSIONS_EVICTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SESSIONS_IDLE.clone()))
            .expect("metric registration failed");
    });
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Copy the session pool counters into their gauges.
pub fn update_pool_metrics(state: &AppState) {
    let stats = state.sessions.stats();
    SESSIONS_CREATED.set(saturating_i64(stats.created));
    SESSIONS_RENTED.set(saturating_i64(stats.rented));
    SESSIONS_EVICTED.set(saturating_i64(stats.evicted));
    SESSIONS_IDLE.set(saturating_i64(state.sessions.available() as u64));
}

/// Handler for the /metrics endpoint.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    update_pool_metrics(&state);

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record an upload error by type.
pub fn record_upload_error(error_type: &str) {
    UPLOAD_ERRORS.with_label_values(&[error_type]).inc();
}
