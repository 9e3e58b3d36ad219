//! Test fixtures: document types, payloads and request helpers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use docstage_core::{DocumentTypeDef, KeywordDataType, KeywordTypeDef};
use serde_json::Value;
use tower::ServiceExt;

/// API key accepted by the testing configuration.
pub const TEST_API_KEY: &str = "test-api-key";

/// Boundary used by [`multipart_body`].
pub const MULTIPART_BOUNDARY: &str = "docstage-test-boundary";

/// Generate deterministic test data based on a seed.
#[allow(dead_code)]
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    let mut state = seed;

    for chunk in data.chunks_mut(8) {
        // Simple LCG for deterministic data
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    Bytes::from(data)
}

/// Single-file loan paperwork with numeric, text and date keywords.
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

/// Scanned pages filed as one multi-page image document.
#[allow(dead_code)]
pub fn scanned_correspondence() -> DocumentTypeDef {
    DocumentTypeDef {
        id: 202,
        name: "Scanned Correspondence".to_string(),
        group: None,
        keyword_types: vec![KeywordTypeDef {
            name: "Account".to_string(),
            data_type: KeywordDataType::Numeric9,
        }],
    }
}

/// A multipart form with one file field.
#[allow(dead_code)]
pub fn multipart_body(file_name: &str, content_type: Option<&str>, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    if let Some(ct) = content_type {
        body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

/// Send a request and return the status with the parsed JSON body (`Null` if empty).
#[allow(dead_code)]
pub async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Helper to make JSON requests with the test API key.
#[allow(dead_code)]
pub async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-API-KEY", TEST_API_KEY);

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    send(router, builder.body(body).unwrap()).await
}

/// Upload one whole file into a slot as multipart.
#[allow(dead_code)]
pub async fn put_file(
    router: &axum::Router,
    upload_id: &str,
    index: u32,
    file_name: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/v1/uploads/{upload_id}/files/{index}"))
        .header("X-API-KEY", TEST_API_KEY)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(multipart_body(file_name, content_type, data)))
        .unwrap();
    send(router, request).await
}

/// Write one raw chunk into a chunked slot.
#[allow(dead_code)]
pub async fn put_chunk(
    router: &axum::Router,
    upload_id: &str,
    index: u32,
    chunk_index: u64,
    data: Bytes,
) -> StatusCode {
    let request = Request::builder()
        .method("PUT")
        .uri(format!(
            "/v1/uploads/{upload_id}/files/{index}/chunk/{chunk_index}"
        ))
        .header("X-API-KEY", TEST_API_KEY)
        .header("Content-Type", "application/octet-stream")
        .body(Body::from(data))
        .unwrap();
    send(router, request).await.0
}
