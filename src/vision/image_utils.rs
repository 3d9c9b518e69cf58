// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding helpers shared by inline (base64) and remote image sources

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

/// Default maximum decoded image size (10MB)
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Prefix that marks an inline image as a data URL
const DATA_URL_PREFIX: &str = "data:image";

/// Errors raised while turning raw input into a decoded image
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Malformed data URL: missing ',' before the base64 payload")]
    MalformedDataUrl,

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,

    #[error("Image has zero width or height")]
    ZeroDimensions,
}

/// Image information extracted during loading
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format
    pub format: ImageFormat,
    /// Size in bytes
    pub size_bytes: usize,
}

/// Strip an optional `data:image/...;base64,` prefix and return the payload
///
/// Only the text after the first comma is kept. Strings that do not start
/// with `data:image` are returned unchanged.
pub fn strip_data_url_prefix(input: &str) -> Result<&str, ImageError> {
    let trimmed = input.trim();
    if !trimmed.starts_with(DATA_URL_PREFIX) {
        return Ok(trimmed);
    }

    trimmed
        .split_once(',')
        .map(|(_, payload)| payload)
        .ok_or(ImageError::MalformedDataUrl)
}

/// Decode a base64 string (with or without a data URL prefix) into raw bytes
///
/// Whitespace inside the payload (line-wrapped base64) is ignored.
pub fn decode_base64_payload(input: &str, max_bytes: usize) -> Result<Vec<u8>, ImageError> {
    let payload = strip_data_url_prefix(input)?;
    if payload.is_empty() {
        return Err(ImageError::EmptyData);
    }

    // Reject before decoding anything that cannot fit once decoded
    let estimated = payload.len() / 4 * 3;
    if estimated > max_bytes.saturating_add(3) {
        return Err(ImageError::TooLarge(estimated, max_bytes));
    }

    let bytes = if payload.contains(char::is_whitespace) {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(compact)?
    } else {
        STANDARD.decode(payload)?
    };

    if bytes.len() > max_bytes {
        return Err(ImageError::TooLarge(bytes.len(), max_bytes));
    }

    Ok(bytes)
}

/// Decode a base64-encoded image
///
/// # Arguments
/// * `base64_str` - Base64 image data, optionally prefixed with `data:image/...;base64,`
/// * `max_bytes` - Upper bound on the decoded size
///
/// # Example
/// ```ignore
/// let (image, info) = decode_base64_image("data:image/png;base64,iVBORw0KGgo...", DEFAULT_MAX_IMAGE_BYTES)?;
/// println!("Image size: {}x{}", info.width, info.height);
/// ```
pub fn decode_base64_image(
    base64_str: &str,
    max_bytes: usize,
) -> Result<(DynamicImage, ImageInfo), ImageError> {
    let bytes = decode_base64_payload(base64_str, max_bytes)?;
    decode_image_bytes(&bytes, max_bytes)
}

/// Decode raw image bytes (remote downloads and already-decoded payloads)
pub fn decode_image_bytes(
    bytes: &[u8],
    max_bytes: usize,
) -> Result<(DynamicImage, ImageInfo), ImageError> {
    if bytes.len() > max_bytes {
        return Err(ImageError::TooLarge(bytes.len(), max_bytes));
    }

    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let format = detect_format(bytes)?;

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    if img.width() == 0 || img.height() == 0 {
        return Err(ImageError::ZeroDimensions);
    }

    let info = ImageInfo {
        width: img.width(),
        height: img.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((img, info))
}

/// Detect image format from magic bytes
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF87a / GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        // TIFF: II (little-endian) or MM (big-endian)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => Err(ImageError::UnsupportedFormat),
    }
}
