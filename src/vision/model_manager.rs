// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption model manager: loads the model once and shares it

use std::sync::Arc;

use crate::config::ModelConfig;
use crate::vision::caption_model::CaptionModel;
use crate::vision::encoder_decoder::EncoderDecoderCaptioner;

/// Snapshot of the model state, reported by diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionModelInfo {
    pub model_id: String,
    pub loaded: bool,
    pub load_error: Option<String>,
}

/// Owns the caption model for the lifetime of the process
///
/// A failed load is recorded, not retried; requests then see the model as
/// unavailable. The model is released when the manager is dropped.
pub struct CaptionModelManager {
    model_id: String,
    model: Option<Arc<dyn CaptionModel>>,
    load_error: Option<String>,
}

impl std::fmt::Debug for CaptionModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionModelManager")
            .field("model_id", &self.model_id)
            .field("loaded", &self.model.is_some())
            .field("load_error", &self.load_error)
            .finish()
    }
}

impl CaptionModelManager {
    /// Load the configured model
    ///
    /// Load failures are logged and kept; the manager itself is always built.
    pub async fn new(config: &ModelConfig) -> anyhow::Result<Self> {
        match EncoderDecoderCaptioner::load(config).await {
            Ok(model) => {
                tracing::info!("✅ Caption model loaded: {}", config.model_id);
                Ok(Self::with_model(Arc::new(model)))
            }
            Err(e) => {
                tracing::warn!("⚠️ Failed to load caption model {}: {:#}", config.model_id, e);
                Ok(Self::unavailable(&config.model_id, format!("{:#}", e)))
            }
        }
    }

    /// Wrap an already loaded model
    pub fn with_model(model: Arc<dyn CaptionModel>) -> Self {
        Self {
            model_id: model.model_id().to_string(),
            model: Some(model),
            load_error: None,
        }
    }

    /// A manager whose model failed to load
    pub fn unavailable(model_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            model: None,
            load_error: Some(reason.into()),
        }
    }

    pub fn get_model(&self) -> Option<Arc<dyn CaptionModel>> {
        self.model.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn info(&self) -> CaptionModelInfo {
        CaptionModelInfo {
            model_id: self.model_id.clone(),
            loaded: self.is_loaded(),
            load_error: self.load_error.clone(),
        }
    }
}
