//! Background removal integration tests.
//!
//! Tests verify:
//! - JPEG and PNG uploads come back as transparent PNGs
//! - Undecodable uploads and model failures return 500 with a message
//! - Missing `image` fields and malformed bodies return 422
//! - The upload size limit is enforced
//! - Every request runs the model again

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use bg_remover::remover::BackgroundRemover;
use bg_remover::server::{create_router, RouterConfig};

use super::test_utils::{
    create_test_jpeg, create_test_png, is_valid_png, test_router, test_router_with_config,
    test_tokens, upload_request, valid_token, FailingSegmenter, Part, ThresholdSegmenter,
};

// =============================================================================
// Success
// =============================================================================

#[tokio::test]
async fn test_remove_background_jpeg() {
    let router = test_router(ThresholdSegmenter::default());
    let jpeg = create_test_jpeg(32, 16);

    let response = router
        .oneshot(upload_request(&[Part::image(&jpeg)], Some(&valid_token())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_png(&body));

    let output = image::load_from_memory(&body).unwrap();
    assert!(output.color().has_alpha());

    let rgba = output.to_rgba8();
    assert_eq!(rgba.dimensions(), (32, 16));
    // White half is foreground, black half is cut away.
    assert_eq!(rgba.get_pixel(4, 8)[3], 255);
    assert_eq!(rgba.get_pixel(28, 8)[3], 0);
}

#[tokio::test]
async fn test_remove_background_png() {
    let router = test_router(ThresholdSegmenter::default());
    let png = create_test_png(20, 10);

    let part = Part {
        name: "image",
        file_name: Some("photo.png"),
        content_type: Some("image/png"),
        data: &png,
    };
    let response = router
        .oneshot(upload_request(&[part], Some(&valid_token())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let rgba = image::load_from_memory(&body).unwrap().to_rgba8();
    assert_eq!(rgba.dimensions(), (20, 10));
}

#[tokio::test]
async fn test_image_field_after_other_fields() {
    let router = test_router(ThresholdSegmenter::default());
    let jpeg = create_test_jpeg(8, 8);

    let parts = [Part::text("note", "hello"), Part::image(&jpeg)];
    let response = router
        .oneshot(upload_request(&parts, Some(&valid_token())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_content_type_not_trusted() {
    let router = test_router(ThresholdSegmenter::default());
    let png = create_test_png(8, 8);

    // Declared as JPEG, actually PNG: decoding goes by content.
    let response = router
        .oneshot(upload_request(&[Part::image(&png)], Some(&valid_token())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_each_request_runs_the_model() {
    let segmenter = Arc::new(ThresholdSegmenter::default());
    let remover = BackgroundRemover::with_shared_segmenter(Arc::clone(&segmenter), 2);
    let router = create_router(
        remover,
        test_tokens(),
        RouterConfig::new().with_tracing(false),
    );
    let jpeg = create_test_jpeg(8, 8);
    let token = valid_token();

    for _ in 0..3 {
        let response = router
            .clone()
            .oneshot(upload_request(&[Part::image(&jpeg)], Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(segmenter.calls(), 3);
}

// =============================================================================
// Processing Failures
// =============================================================================

#[tokio::test]
async fn test_non_image_upload() {
    let router = test_router(ThresholdSegmenter::default());
    let data = b"this is a text file, not an image";

    let response = router
        .oneshot(upload_request(&[Part::image(data)], Some(&valid_token())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let message = String::from_utf8(body.to_vec()).unwrap();
    assert!(!message.is_empty());
    assert!(message.contains("decode"));
}

#[tokio::test]
async fn test_empty_image_field() {
    let router = test_router(ThresholdSegmenter::default());

    let response = router
        .oneshot(upload_request(&[Part::image(&[])], Some(&valid_token())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_model_failure() {
    let router = test_router(FailingSegmenter);
    let jpeg = create_test_jpeg(8, 8);

    let response = router
        .oneshot(upload_request(&[Part::image(&jpeg)], Some(&valid_token())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let message = String::from_utf8(body.to_vec()).unwrap();
    assert!(message.contains("inference failed"));
}

// =============================================================================
// Malformed Uploads
// =============================================================================

#[tokio::test]
async fn test_missing_image_field() {
    let router = test_router(ThresholdSegmenter::default());

    let response = router
        .oneshot(upload_request(
            &[Part::text("file", "not the right field")],
            Some(&valid_token()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "missing_field");
    assert_eq!(json["status"], 422);
}

#[tokio::test]
async fn test_not_multipart() {
    let router = test_router(ThresholdSegmenter::default());

    let request = Request::builder()
        .method("POST")
        .uri("/remove-background")
        .header(header::AUTHORIZATION, format!("Bearer {}", valid_token()))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "invalid_multipart");
}

#[tokio::test]
async fn test_truncated_multipart_body() {
    let router = test_router(ThresholdSegmenter::default());

    let request = Request::builder()
        .method("POST")
        .uri("/remove-background")
        .header(header::AUTHORIZATION, format!("Bearer {}", valid_token()))
        .header(
            header::CONTENT_TYPE,
            "multipart/form-data; boundary=----bg-remover-test-boundary",
        )
        .body(Body::from(
            "------bg-remover-test-boundary\r\nContent-Disposition: form-data; name=\"image\"\r\n\r\nabc",
        ))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_upload_too_large() {
    let config = RouterConfig::new()
        .with_tracing(false)
        .with_max_upload_bytes(1024);
    let router = test_router_with_config(ThresholdSegmenter::default(), config);
    let data = vec![0xAB; 8 * 1024];

    let response = router
        .oneshot(upload_request(&[Part::image(&data)], Some(&valid_token())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
