// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Turning a request's image reference into a decoded image
//!
//! Inline payloads are base64 (optionally a data URL); remote images are
//! downloaded with a bounded timeout and a size cap.

use anyhow::Context;
use image::DynamicImage;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::config::FetchConfig;
use crate::vision::error::CaptionError;
use crate::vision::image_utils::{decode_base64_image, decode_image_bytes};

const USER_AGENT: &str = concat!("image-captioner/", env!("CARGO_PKG_VERSION"));

/// Where the image for one request comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Base64 payload, with or without a `data:image/...;base64,` prefix
    InlineBase64(String),
    /// http(s) URL to download
    RemoteUrl(String),
}

impl ImageSource {
    /// Pick a source from optional request fields; the URL wins when both are set
    ///
    /// Empty strings count as absent.
    pub fn from_fields(image_url: Option<&str>, image_base64: Option<&str>) -> Option<Self> {
        let present = |s: Option<&str>| s.filter(|v| !v.is_empty()).map(str::to_string);
        present(image_url)
            .map(Self::RemoteUrl)
            .or_else(|| present(image_base64).map(Self::InlineBase64))
    }
}

/// Downloads and decodes images
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    max_image_bytes: usize,
}

impl ImageFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            max_image_bytes: config.max_image_bytes,
        })
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    /// Resolve any source into a decoded image
    pub async fn acquire(&self, source: &ImageSource) -> Result<DynamicImage, CaptionError> {
        match source {
            ImageSource::InlineBase64(payload) => self.decode_inline(payload),
            ImageSource::RemoteUrl(url) => self.fetch(url).await,
        }
    }

    pub fn decode_inline(&self, payload: &str) -> Result<DynamicImage, CaptionError> {
        let (image, info) = decode_base64_image(payload, self.max_image_bytes)
            .map_err(CaptionError::inline_decode)?;
        debug!(
            "Decoded inline image {}x{} ({:?}, {} bytes)",
            info.width, info.height, info.format, info.size_bytes
        );
        Ok(image)
    }

    /// Download and decode a remote image
    pub async fn fetch(&self, url: &str) -> Result<DynamicImage, CaptionError> {
        let parsed =
            Url::parse(url).map_err(|e| CaptionError::Fetch(format!("Invalid URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CaptionError::Fetch(format!(
                "Unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        debug!("Fetching image from: {}", url);

        let mut response = self.client.get(parsed).send().await.map_err(|e| {
            if e.is_timeout() {
                CaptionError::Fetch(format!("Timeout fetching: {}", url))
            } else {
                CaptionError::Fetch(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptionError::Fetch(format!("HTTP {} for: {}", status.as_u16(), url)));
        }

        if let Some(declared) = response.content_length() {
            if declared > self.max_image_bytes as u64 {
                return Err(CaptionError::Fetch(format!(
                    "Image too large: {} bytes (max: {} bytes)",
                    declared, self.max_image_bytes
                )));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                CaptionError::Fetch(format!("Timeout fetching: {}", url))
            } else {
                CaptionError::Fetch(e.to_string())
            }
        })? {
            let received = body.len() + chunk.len();
            if received > self.max_image_bytes {
                return Err(CaptionError::Fetch(format!(
                    "Image too large: {} bytes received (max: {} bytes)",
                    received, self.max_image_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }

        let (image, info) =
            decode_image_bytes(&body, self.max_image_bytes).map_err(CaptionError::remote_decode)?;
        info!(
            "Fetched image {}x{} ({:?}, {} bytes) from: {}",
            info.width, info.height, info.format, info.size_bytes, url
        );
        Ok(image)
    }
}
