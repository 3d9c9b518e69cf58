// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Endpoint tests for POST /generate_caption
//!
//! The caption model is mocked, so these cover the request contract:
//! input precedence, status codes and response bodies.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use image::RgbImage;
use image_captioner::{
    api::http_server::{create_app, AppState},
    config::FetchConfig,
    vision::{CaptionModel, CaptionModelManager, NO_CAPTION_FALLBACK},
};
use mockall::mock;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

// 1x1 red PNG
const TINY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

// 1x1 GIF
const TINY_GIF_BASE64: &str = "R0lGODlhAQABAIAAAP///wAAACH5BAEAAAAALAAAAAABAAEAAAICRAEAOw==";

mock! {
    pub Captioner {}

    impl CaptionModel for Captioner {
        fn model_id(&self) -> &str;
        fn generate_captions(&self, image: &RgbImage) -> anyhow::Result<Vec<String>>;
    }
}

/// Mock that must be called exactly `times` times and answers `captions`
fn mock_model(times: usize, captions: Vec<&'static str>) -> MockCaptioner {
    let mut model = MockCaptioner::new();
    model
        .expect_model_id()
        .return_const("test/mock-captioner".to_string());
    model
        .expect_generate_captions()
        .times(times)
        .returning(move |_| Ok(captions.iter().map(|s| s.to_string()).collect()));
    model
}

fn app_with_model(model: MockCaptioner) -> Router {
    let manager = Arc::new(CaptionModelManager::with_model(Arc::new(model)));
    let state = AppState::new(manager, &FetchConfig::default(), false).unwrap();
    create_app(state)
}

fn app_without_model() -> Router {
    let manager = Arc::new(CaptionModelManager::unavailable(
        "test/missing",
        "Caption model directory not found",
    ));
    let state = AppState::new(manager, &FetchConfig::default(), false).unwrap();
    create_app(state)
}

async fn post_caption(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/generate_caption")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn test_data_url_image_is_captioned() {
    let app = app_with_model(mock_model(1, vec!["a red square"]));
    let body = json!({"image_base64": format!("data:image/png;base64,{}", TINY_PNG_BASE64)});

    let (status, json) = post_caption(app, body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"success": true, "caption": "a red square"}));
}

#[tokio::test]
async fn test_bare_base64_image_is_captioned() {
    let app = app_with_model(mock_model(1, vec!["a white pixel"]));
    let body = json!({"image_base64": TINY_GIF_BASE64});

    let (status, json) = post_caption(app, body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["caption"], "a white pixel");
}

#[tokio::test]
async fn test_first_candidate_is_returned() {
    let app = app_with_model(mock_model(1, vec!["best", "second"]));
    let body = json!({"image_base64": TINY_PNG_BASE64});

    let (_, json) = post_caption(app, body.to_string()).await;

    assert_eq!(json["caption"], "best");
}

#[tokio::test]
async fn test_no_candidates_yields_fallback_caption() {
    let app = app_with_model(mock_model(1, vec![]));
    let body = json!({"image_base64": TINY_PNG_BASE64});

    let (status, json) = post_caption(app, body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["caption"], NO_CAPTION_FALLBACK);
}

#[tokio::test]
async fn test_empty_object_is_rejected() {
    let app = app_with_model(mock_model(0, vec![]));

    let (status, json) = post_caption(app, "{}").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({"success": false, "message": "No image provided"}));
}

#[tokio::test]
async fn test_empty_fields_are_rejected() {
    let app = app_with_model(mock_model(0, vec![]));
    let body = json!({"image_url": "", "image_base64": ""});

    let (status, json) = post_caption(app, body.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "No image provided");
}

#[tokio::test]
async fn test_invalid_base64_is_invalid_image() {
    let app = app_with_model(mock_model(0, vec![]));
    let body = json!({"image_base64": "this is not an image"});

    let (status, json) = post_caption(app, body.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({"success": false, "message": "Invalid image"}));
}

#[tokio::test]
async fn test_base64_of_non_image_is_invalid_image() {
    let app = app_with_model(mock_model(0, vec![]));
    // "hello world" is valid base64 but not an image
    let body = json!({"image_base64": "aGVsbG8gd29ybGQ="});

    let (status, json) = post_caption(app, body.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid image");
}

#[tokio::test]
async fn test_unreachable_url_is_server_error() {
    let app = app_with_model(mock_model(0, vec![]));
    let body = json!({"image_url": "http://nonexistent.invalid/x.png"});

    let (status, json) = post_caption(app, body.to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    let message = json["message"].as_str().unwrap();
    assert!(!message.is_empty());
    assert_ne!(message, "Invalid image");
}

/// Serve a PNG and a text file on an ephemeral local port
async fn serve_remote_images() -> String {
    use axum::routing::get;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    let png = STANDARD.decode(TINY_PNG_BASE64).unwrap();
    let router = Router::new()
        .route(
            "/image.png",
            get(move || {
                let png = png.clone();
                async move { ([("content-type", "image/png")], png) }
            }),
        )
        .route("/notes.txt", get(|| async { "plain text, not pixels" }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_remote_image_is_captioned() {
    let base = serve_remote_images().await;
    let app = app_with_model(mock_model(1, vec!["a remote dot"]));
    let body = json!({"image_url": format!("{}/image.png", base)});

    let (status, json) = post_caption(app, body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"success": true, "caption": "a remote dot"}));
}

#[tokio::test]
async fn test_remote_non_image_is_server_error_with_text() {
    let base = serve_remote_images().await;
    let app = app_with_model(mock_model(0, vec![]));
    let body = json!({"image_url": format!("{}/notes.txt", base)});

    let (status, json) = post_caption(app, body.to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Unsupported image format");
}

#[tokio::test]
async fn test_whitespace_url_is_attempted() {
    let app = app_with_model(mock_model(0, vec![]));
    let body = json!({"image_url": "   ", "image_base64": TINY_PNG_BASE64});

    let (status, json) = post_caption(app, body.to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_ne!(json["message"], "No image provided");
}

#[tokio::test]
async fn test_url_takes_precedence_over_base64() {
    // The inline image is valid, so only the URL can cause a failure
    let app = app_with_model(mock_model(0, vec![]));
    let body = json!({
        "image_url": "http://nonexistent.invalid/x.png",
        "image_base64": TINY_PNG_BASE64,
    });

    let (status, _) = post_caption(app, body.to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_unsupported_scheme_is_server_error() {
    let app = app_with_model(mock_model(0, vec![]));
    let body = json!({"image_url": "ftp://example.com/x.png"});

    let (status, json) = post_caption(app, body.to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["message"].as_str().unwrap().contains("scheme"));
}

#[tokio::test]
async fn test_model_unavailable_is_reported_first() {
    let body = json!({"image_base64": TINY_PNG_BASE64});
    let (status, json) = post_caption(app_without_model(), body.to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json,
        json!({"success": false, "message": "Image captioning model failed to load"})
    );

    // Even a request without an image sees the model error
    let (status, json) = post_caption(app_without_model(), "{}").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["message"], "Image captioning model failed to load");
}

#[tokio::test]
async fn test_generation_failure_is_generic() {
    let mut model = MockCaptioner::new();
    model
        .expect_model_id()
        .return_const("test/failing".to_string());
    model
        .expect_generate_captions()
        .times(1)
        .returning(|_| Err(anyhow::anyhow!("onnxruntime: invalid tensor shape")));

    let body = json!({"image_base64": TINY_PNG_BASE64});
    let (status, json) = post_caption(app_with_model(model), body.to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json,
        json!({"success": false, "message": "Caption generation failed"})
    );
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = app_with_model(mock_model(0, vec![]));

    let (status, json) = post_caption(app, "{\"image_base64\": ").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(!json["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_field_type_is_rejected() {
    let app = app_with_model(mock_model(0, vec![]));

    let (status, json) = post_caption(app, r#"{"image_url": 42}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_get_is_not_allowed() {
    let app = app_with_model(mock_model(0, vec![]));
    let request = Request::builder()
        .method(Method::GET)
        .uri("/generate_caption")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
