// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Generate caption endpoint handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::debug;

use super::request::GenerateCaptionRequest;
use super::response::GenerateCaptionResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// POST /generate_caption - Caption an inline or remote image
///
/// Accepts `{"image_url": ...}` or `{"image_base64": ...}`; the URL wins
/// when both are present.
pub async fn generate_caption_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerateCaptionRequest>, JsonRejection>,
) -> Result<Json<GenerateCaptionResponse>, ApiError> {
    // Model availability is reported before anything about the body
    if !state.pipeline.manager().is_loaded() {
        return Err(ApiError::ModelUnavailable);
    }

    let Json(request) = payload.map_err(|rejection| {
        debug!("Rejected caption request body: {}", rejection);
        ApiError::InvalidRequest(rejection.body_text())
    })?;

    let source = request.image_source();
    let caption = state.pipeline.caption(source.as_ref()).await?;

    Ok(Json(GenerateCaptionResponse::success(caption)))
}
