// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Diagnostic and liveness endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::http_server::AppState;
use crate::version::{get_version_info, get_version_string};

/// Runtime state of the service
///
/// `torch_cuda_available` reports the ONNX Runtime CUDA execution
/// provider. `python_version` carries the service build string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResponse {
    pub model_loaded: bool,
    pub torch_cuda_available: bool,
    pub python_version: String,
    pub model_id: String,
    pub load_error: Option<String>,
    pub version_info: Value,
}

/// GET /diagnostic
pub async fn diagnostic_handler(State(state): State<AppState>) -> Json<DiagnosticResponse> {
    let info = state.pipeline.manager().info();
    Json(DiagnosticResponse {
        model_loaded: info.loaded,
        torch_cuda_available: state.cuda_available,
        python_version: get_version_string(),
        model_id: info.model_id,
        load_error: info.load_error,
        version_info: get_version_info(),
    })
}

/// GET /health
pub async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
