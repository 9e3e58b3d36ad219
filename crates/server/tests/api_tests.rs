//! Integration tests for authentication, discovery and job creation.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{TEST_API_KEY, TestServer, json_request, send};
use docstage_core::config::RepositoryConfig;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_root_is_open() {
    let server = TestServer::new().await;

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(&server.router, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
}

#[tokio::test]
async fn test_v1_requires_api_key() {
    let server = TestServer::new().await;

    let request = Request::builder()
        .uri("/v1/document-types")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&server.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let request = Request::builder()
        .uri("/v1/document-types")
        .header("X-API-KEY", "not-the-key")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&server.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Header name is case-insensitive
    let request = Request::builder()
        .uri("/v1/document-types")
        .header("x-api-key", TEST_API_KEY)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&server.router, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unconfigured_api_key_is_server_error() {
    let server = TestServer::with_config(|config| {
        config.auth.api_key_hash = None;
    })
    .await;

    let (status, body) = json_request(&server.router, "GET", "/v1/document-types", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "internal_error");
}

#[tokio::test]
async fn test_list_document_types() {
    let server = TestServer::new().await;

    let (status, body) = json_request(&server.router, "GET", "/v1/document-types", None).await;
    assert_eq!(status, StatusCode::OK);

    let types = body.as_array().unwrap();
    assert_eq!(types.len(), 2);
    assert_eq!(types[0]["id"], 101);
    assert_eq!(types[0]["name"], "Loan Documents");
    assert_eq!(types[0]["group"], "Lending");
    assert!(types[1]["group"].is_null());
}

#[tokio::test]
async fn test_no_document_types_is_not_found() {
    let server = TestServer::with_config(|config| {
        let RepositoryConfig::Local { document_types, .. } = &mut config.repository;
        document_types.clear();
    })
    .await;

    let (status, _) = json_request(&server.router, "GET", "/v1/document-types", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_upload() {
    let server = TestServer::new().await;

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/v1/uploads",
        Some(json!({
            "document_type_name": "loan documents",
            "keywords": {
                "Loan Number": "42",
                "Borrower": ["Ada", "Grace"],
                "Not A Keyword": "ignored"
            },
            "file_count": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let upload_id = body["upload_id"].as_str().unwrap();
    let job_id = Uuid::parse_str(upload_id).unwrap();
    let job = server.state.metadata.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.file_count, 1);
    assert!(job.document_index.contains("Grace"));
}

#[tokio::test]
async fn test_create_upload_rejections() {
    let server = TestServer::new().await;

    // Unknown document type
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/uploads",
        Some(json!({"document_type_name": "Recipes", "file_count": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // No files
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/uploads",
        Some(json!({"document_type_name": "Loan Documents", "file_count": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Keyword value that does not fit its type
    let (status, body) = json_request(
        &server.router,
        "POST",
        "/v1/uploads",
        Some(json!({
            "document_type_name": "Loan Documents",
            "keywords": {"Loan Number": "forty-two"},
            "file_count": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_keyword");

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/uploads",
        Some(json!({
            "document_type_name": "Loan Documents",
            "keywords": {"Closing Date": "03/01/2024"},
            "file_count": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Keyword values must be strings or arrays of strings
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/uploads",
        Some(json!({
            "document_type_name": "Loan Documents",
            "keywords": {"Loan Number": 42},
            "file_count": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Malformed JSON
    let request = Request::builder()
        .method("POST")
        .uri("/v1/uploads")
        .header("X-API-KEY", TEST_API_KEY)
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&server.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_upload_id() {
    let server = TestServer::new().await;

    let (status, _) =
        json_request(&server.router, "POST", "/v1/uploads/not-a-uuid/commit", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = json_request(
        &server.router,
        "DELETE",
        &format!("/v1/uploads/{}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    docstage_server::metrics::register_metrics();
    let server = TestServer::new().await;

    // Unauthenticated scrape
    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("docstage_uploads_created_total"));
    assert!(text.contains("docstage_repository_sessions_idle"));
}

#[tokio::test]
async fn test_metrics_can_be_disabled() {
    let server = TestServer::with_config(|config| {
        config.server.metrics_enabled = false;
    })
    .await;

    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&server.router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
