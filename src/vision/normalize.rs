// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Color-space normalization ahead of tensor preparation

use image::{ColorType, DynamicImage, RgbImage};
use tracing::debug;

/// Number of channels the caption model expects
pub const MODEL_CHANNELS: u8 = 3;

/// Returns true if the image is already 8-bit, three-channel RGB
pub fn is_rgb8(image: &DynamicImage) -> bool {
    image.color() == ColorType::Rgb8
}

/// Convert any decoded image into an 8-bit RGB buffer
///
/// Alpha is dropped, grayscale is replicated across the three channels and
/// 16-bit or float images are scaled down. RGB8 input is moved through
/// without copying.
pub fn ensure_rgb(image: DynamicImage) -> RgbImage {
    match image {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => {
            debug!("Converting {:?} image to RGB8", other.color());
            other.to_rgb8()
        }
    }
}
