// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Generate caption request types

use serde::{Deserialize, Serialize};

use crate::vision::acquisition::ImageSource;

/// Request for a caption; at least one image field must be non-empty
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateCaptionRequest {
    /// http(s) URL of the image; preferred when both fields are set
    #[serde(default)]
    pub image_url: Option<String>,

    /// Base64 image, optionally as a `data:image/...;base64,` URL
    #[serde(default)]
    pub image_base64: Option<String>,
}

impl GenerateCaptionRequest {
    /// The image to caption, or `None` if neither field carries one
    pub fn image_source(&self) -> Option<ImageSource> {
        ImageSource::from_fields(self.image_url.as_deref(), self.image_base64.as_deref())
    }
}
