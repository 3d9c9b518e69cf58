// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Generate caption response types

use serde::{Deserialize, Serialize};

/// `{success: true, caption}` or `{success: false, message}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateCaptionResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GenerateCaptionResponse {
    pub fn success(caption: impl Into<String>) -> Self {
        Self {
            success: true,
            caption: Some(caption.into()),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            caption: None,
            message: Some(message.into()),
        }
    }
}
