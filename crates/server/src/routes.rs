//! Route configuration.

use crate::auth::{require_api_key, trace_middleware};
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let max_whole_file = usize::try_from(state.config.server.max_whole_file_size)
        .unwrap_or(usize::MAX);

    let api_routes = Router::new()
        .route("/v1/document-types", get(handlers::list_document_types))
        // Upload jobs
        .route("/v1/uploads", post(handlers::create_upload))
        .route("/v1/uploads/{upload_id}", delete(handlers::delete_upload))
        .route(
            "/v1/uploads/{upload_id}/files/{index}",
            put(handlers::upload_file).layer(DefaultBodyLimit::max(max_whole_file)),
        )
        .route(
            "/v1/uploads/{upload_id}/files/{index}/chunk",
            post(handlers::start_chunked_upload),
        )
        .route(
            "/v1/uploads/{upload_id}/files/{index}/chunk/{chunk_index}",
            put(handlers::upload_chunk),
        )
        .route(
            "/v1/uploads/{upload_id}/commit",
            post(handlers::commit_upload),
        )
        // Stored documents
        .route(
            "/v1/documents/{document_id}/hash",
            get(handlers::get_document_hash),
        )
        .route(
            "/v1/documents/{document_id}",
            delete(handlers::delete_document),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    // Liveness probe stays unauthenticated for load balancers
    let mut router = Router::new()
        .route("/", get(handlers::root))
        .merge(api_routes);

    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        .layer(middleware::from_fn(trace_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
