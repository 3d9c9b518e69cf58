// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Tests against the real pretrained export
//!
//! These download Xenova/vit-gpt2-image-captioning from the Hugging Face Hub
//! (or use CAPTION_MODEL_DIR) and are ignored by default:
//! `cargo test --test vision_tests -- --ignored`

use image::{DynamicImage, Rgb, RgbImage};
use image_captioner::{
    config::ModelConfig,
    vision::{encoder_decoder::EncoderDecoderCaptioner, CaptionModel},
};

fn model_config() -> ModelConfig {
    ModelConfig {
        model_dir: std::env::var("CAPTION_MODEL_DIR").ok().map(Into::into),
        ..Default::default()
    }
}

fn striped_image() -> RgbImage {
    RgbImage::from_fn(320, 240, |x, _| {
        if (x / 40) % 2 == 0 {
            Rgb([200, 30, 30])
        } else {
            Rgb([240, 240, 240])
        }
    })
}

#[tokio::test]
#[ignore] // Requires network access or a local model export
async fn test_pretrained_model_generates_caption() {
    let model = EncoderDecoderCaptioner::load(&model_config()).await.unwrap();

    let captions = model.generate_captions(&striped_image()).unwrap();

    assert_eq!(captions.len(), 1);
    assert!(!captions[0].is_empty());
    assert!(!captions[0].contains("<|endoftext|>"));
}

#[tokio::test]
#[ignore] // Requires network access or a local model export
async fn test_pretrained_model_is_deterministic() {
    let model = EncoderDecoderCaptioner::load(&model_config()).await.unwrap();
    let image = DynamicImage::ImageRgb8(striped_image()).to_rgb8();

    let first = model.generate_captions(&image).unwrap();
    let second = model.generate_captions(&image).unwrap();

    assert_eq!(first, second);
}
