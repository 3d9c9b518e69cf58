// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;

use super::generate_caption::GenerateCaptionResponse;
use crate::vision::error::{CaptionError, ImageOrigin, MODEL_UNAVAILABLE_MESSAGE};

/// Message returned for an inline payload that is not a decodable image
pub const INVALID_IMAGE_MESSAGE: &str = "Invalid image";

/// Message returned when generation fails; details stay in the logs
pub const GENERATION_FAILED_MESSAGE: &str = "Caption generation failed";

/// Client-facing failure of a caption request
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    InvalidRequest(String),
    ModelUnavailable,
    InternalError(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_) => 400,
            ApiError::ModelUnavailable | ApiError::InternalError(_) => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::InvalidRequest(msg) | ApiError::InternalError(msg) => msg,
            ApiError::ModelUnavailable => MODEL_UNAVAILABLE_MESSAGE,
        }
    }
}

impl From<CaptionError> for ApiError {
    fn from(err: CaptionError) -> Self {
        match err {
            CaptionError::ModelUnavailable(_) => ApiError::ModelUnavailable,
            CaptionError::MissingInput => ApiError::InvalidRequest(err.to_string()),
            CaptionError::Decode {
                origin: ImageOrigin::Inline,
                ..
            } => ApiError::InvalidRequest(INVALID_IMAGE_MESSAGE.to_string()),
            CaptionError::Decode {
                origin: ImageOrigin::Remote,
                ..
            }
            | CaptionError::Fetch(_) => ApiError::InternalError(err.to_string()),
            CaptionError::Generation(_) => {
                ApiError::InternalError(GENERATION_FAILED_MESSAGE.to_string())
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = GenerateCaptionResponse::failure(self.message());
        (status, Json(body)).into_response()
    }
}
