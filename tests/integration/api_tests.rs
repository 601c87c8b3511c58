//! Public API integration tests.
//!
//! Tests verify:
//! - Greeting endpoint
//! - Health check
//! - Upload page (GET and HEAD)
//! - CORS headers
//! - Unknown routes and methods

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use bg_remover::server::RouterConfig;

use super::test_utils::{test_router, test_router_with_config, valid_token, ThresholdSegmenter};

async fn get(uri: &str) -> axum::response::Response {
    let router = test_router(ThresholdSegmenter::default());
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router.oneshot(request).await.unwrap()
}

// =============================================================================
// Hello
// =============================================================================

#[tokio::test]
async fn test_hello() {
    let response = get("/hello/World").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, serde_json::json!({"message": "Hello World"}));
}

#[tokio::test]
async fn test_hello_percent_encoded_name() {
    let response = get("/hello/Jane%20Doe").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["message"], "Hello Jane Doe");
}

#[tokio::test]
async fn test_hello_without_name() {
    let response = get("/hello/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let response = get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["model"], "threshold");
    assert_eq!(json["workers"], 2);
    assert!(json["version"].is_string());
}

// =============================================================================
// Upload Page
// =============================================================================

#[tokio::test]
async fn test_index_page() {
    let response = get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("<form id=\"upload-form\">"));
}

#[tokio::test]
async fn test_index_page_head() {
    let router = test_router(ThresholdSegmenter::default());
    let request = Request::builder()
        .method(Method::HEAD)
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body.is_empty());
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_unknown_route() {
    let response = get("/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_on_remove_background_requires_token() {
    // Auth wraps the method router, so a token-less GET is rejected first.
    let response = get("/remove-background").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_on_remove_background_not_allowed() {
    let router = test_router(ThresholdSegmenter::default());
    let request = Request::builder()
        .uri("/remove-background")
        .header(header::AUTHORIZATION, format!("Bearer {}", valid_token()))
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// =============================================================================
// CORS
// =============================================================================

#[tokio::test]
async fn test_cors_any_origin() {
    let router = test_router(ThresholdSegmenter::default());
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://example.com")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_cors_preflight_for_upload() {
    let config = RouterConfig::new()
        .with_tracing(false)
        .with_cors_origins(vec!["https://app.example.com".to_string()]);
    let router = test_router_with_config(ThresholdSegmenter::default(), config);

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/remove-background")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example.com"
    );
    let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap();
    assert!(methods.contains("POST"));
}

#[tokio::test]
async fn test_cors_disallowed_origin() {
    let config = RouterConfig::new()
        .with_tracing(false)
        .with_cors_origins(vec!["https://app.example.com".to_string()]);
    let router = test_router_with_config(ThresholdSegmenter::default(), config);

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
