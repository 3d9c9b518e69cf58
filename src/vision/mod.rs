// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image captioning
//!
//! This module provides:
//! - Image acquisition from base64 payloads and remote URLs
//! - RGB normalization and model-specific preprocessing
//! - ONNX vision-encoder-decoder inference with beam search
//! - A lazily loading library captioner

pub mod acquisition;
pub mod caption_model;
pub mod encoder_decoder;
pub mod error;
pub mod image_captioner;
pub mod image_utils;
pub mod model_manager;
pub mod normalize;
pub mod pipeline;

pub use acquisition::{ImageFetcher, ImageSource};
pub use caption_model::CaptionModel;
pub use error::{CaptionError, ImageOrigin};
pub use image_captioner::ImageCaptioner;
pub use image_utils::{decode_base64_image, decode_image_bytes, detect_format, ImageError, ImageInfo};
pub use model_manager::{CaptionModelInfo, CaptionModelManager};
pub use pipeline::{CaptionPipeline, RequestStage, NO_CAPTION_FALLBACK};
