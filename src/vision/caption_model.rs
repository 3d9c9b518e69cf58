// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! The seam between the request pipeline and a loaded captioning model

use anyhow::Result;
use image::RgbImage;

/// A loaded image-to-text model
///
/// Implementations must be callable from several blocking threads at once;
/// any internal serialization is their own business.
pub trait CaptionModel: Send + Sync {
    /// Identifier of the pretrained weights
    fn model_id(&self) -> &str;

    /// Candidate captions for an RGB image, best first
    ///
    /// An empty list is allowed and means the model produced nothing.
    fn generate_captions(&self, image: &RgbImage) -> Result<Vec<String>>;
}
