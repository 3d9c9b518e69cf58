// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error taxonomy for the caption pipeline

use thiserror::Error;

use super::image_utils::ImageError;

/// Message reported whenever the caption model is not available
pub const MODEL_UNAVAILABLE_MESSAGE: &str = "Image captioning model failed to load";

/// Message reported when a request carries no usable image source
pub const MISSING_INPUT_MESSAGE: &str = "No image provided";

/// Where an image came from, kept on decode errors so callers can tell a
/// bad inline payload (client fault) from a bad remote body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    Inline,
    Remote,
}

/// Failure of a single caption request
#[derive(Debug, Error)]
pub enum CaptionError {
    /// The model could not be constructed; never retried
    #[error("Image captioning model failed to load: {0}")]
    ModelUnavailable(String),

    #[error("No image provided")]
    MissingInput,

    #[error("Failed to fetch image: {0}")]
    Fetch(String),

    #[error("{error}")]
    Decode {
        origin: ImageOrigin,
        #[source]
        error: ImageError,
    },

    #[error("Caption generation failed: {0}")]
    Generation(String),
}

impl CaptionError {
    pub fn inline_decode(error: ImageError) -> Self {
        Self::Decode {
            origin: ImageOrigin::Inline,
            error,
        }
    }

    pub fn remote_decode(error: ImageError) -> Self {
        Self::Decode {
            origin: ImageOrigin::Remote,
            error,
        }
    }

    /// Short machine-readable kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::MissingInput => "missing_input",
            Self::Fetch(_) => "fetch_error",
            Self::Decode { .. } => "decode_error",
            Self::Generation(_) => "generation_error",
        }
    }

    /// Render the error the way the old string-returning captioner did
    ///
    /// The typed error replaces that behaviour; this exists for callers
    /// that still match on the old prefixes.
    pub fn legacy_message(&self, origin: ImageOrigin) -> String {
        match origin {
            ImageOrigin::Inline => format!("Error processing base64 image: {}", self),
            ImageOrigin::Remote => format!("Error downloading/processing image: {}", self),
        }
    }
}
