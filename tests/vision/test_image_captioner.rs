// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Library captioner tests: lazy loading, cached failures and typed errors

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use image_captioner::{
    config::{FetchConfig, ModelConfig},
    vision::{CaptionError, CaptionModel, CaptionModelManager, ImageCaptioner, ImageOrigin},
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Reports the size of every image it sees
struct SizeModel {
    calls: AtomicUsize,
}

impl CaptionModel for SizeModel {
    fn model_id(&self) -> &str {
        "test/size"
    }

    fn generate_captions(&self, image: &RgbImage) -> anyhow::Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![format!("{}x{} rgb", image.width(), image.height())])
    }
}

fn encode_png(image: DynamicImage) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    STANDARD.encode(buffer.into_inner())
}

fn captioner_with(model: Arc<SizeModel>) -> ImageCaptioner {
    let manager = Arc::new(CaptionModelManager::with_model(model));
    ImageCaptioner::with_manager(manager, &FetchConfig::default()).unwrap()
}

#[tokio::test]
async fn test_rgba_image_is_normalized_before_generation() {
    let model = Arc::new(SizeModel {
        calls: AtomicUsize::new(0),
    });
    let captioner = captioner_with(model.clone());

    let rgba = DynamicImage::ImageRgba8(RgbaImage::new(8, 4));
    let caption = captioner
        .caption_from_base64(&format!("data:image/png;base64,{}", encode_png(rgba)))
        .await
        .unwrap();

    assert_eq!(caption, "8x4 rgb");
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_grayscale_image_is_captioned() {
    let model = Arc::new(SizeModel {
        calls: AtomicUsize::new(0),
    });
    let captioner = captioner_with(model);

    let gray = DynamicImage::new_luma8(5, 7);
    let caption = captioner.caption_from_base64(&encode_png(gray)).await.unwrap();

    assert_eq!(caption, "5x7 rgb");
}

#[tokio::test]
async fn test_bad_base64_is_typed_inline_error() {
    let model = Arc::new(SizeModel {
        calls: AtomicUsize::new(0),
    });
    let captioner = captioner_with(model.clone());

    let err = captioner.caption_from_base64("%%%").await.unwrap_err();

    assert!(matches!(
        err,
        CaptionError::Decode {
            origin: ImageOrigin::Inline,
            ..
        }
    ));
    assert!(err
        .legacy_message(ImageOrigin::Inline)
        .starts_with("Error processing base64 image: "));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unreachable_url_is_fetch_error() {
    let model = Arc::new(SizeModel {
        calls: AtomicUsize::new(0),
    });
    let captioner = captioner_with(model);

    let err = captioner
        .caption_from_url("http://nonexistent.invalid/photo.jpg")
        .await
        .unwrap_err();

    assert!(matches!(err, CaptionError::Fetch(_)));
    assert!(err
        .legacy_message(ImageOrigin::Remote)
        .starts_with("Error downloading/processing image: "));
}

#[tokio::test]
async fn test_missing_model_reports_unavailable_without_retry() {
    let dir = tempfile::tempdir().unwrap();
    let config = ModelConfig {
        model_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let captioner = ImageCaptioner::new(config, &FetchConfig::default()).unwrap();

    assert!(!captioner.check_availability().await);
    let reason = captioner.load_error().await.unwrap();
    assert!(reason.contains("Model file not found"));

    let err = captioner
        .caption_from_url("http://nonexistent.invalid/photo.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, CaptionError::ModelUnavailable(_)));

    // Files appearing later are not picked up: the failure is cached
    std::fs::write(dir.path().join("encoder_model.onnx"), b"").unwrap();
    assert!(!captioner.check_availability().await);
    assert_eq!(captioner.load_error().await.unwrap(), reason);
}
