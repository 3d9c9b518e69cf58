// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the image captioning service

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Inference runtime reported by diagnostics
pub const RUNTIME: &str = "onnxruntime";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "base64-images",
    "data-url-images",
    "remote-images",
    "beam-search",
    "hf-hub-download",
    "cuda-execution-provider",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Image Captioner {} ({})", VERSION_NUMBER, RUNTIME)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "runtime": RUNTIME,
        "features": FEATURES,
    })
}
