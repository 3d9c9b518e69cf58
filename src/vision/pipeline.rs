// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-request caption pipeline
//!
//! `Idle -> AcquiringImage -> Normalizing -> Generating -> Responding`,
//! with `Failed` reachable from every stage. The model check always runs
//! before any image work.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::vision::acquisition::{ImageFetcher, ImageSource};
use crate::vision::error::CaptionError;
use crate::vision::model_manager::CaptionModelManager;
use crate::vision::normalize::ensure_rgb;

/// Caption returned when the model yields no candidates
pub const NO_CAPTION_FALLBACK: &str = "No caption generated";

/// Where a request is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Idle,
    AcquiringImage,
    Normalizing,
    Generating,
    Responding,
    Failed,
}

impl std::fmt::Display for RequestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AcquiringImage => "acquiring_image",
            Self::Normalizing => "normalizing",
            Self::Generating => "generating",
            Self::Responding => "responding",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Shared, cloneable entry point for caption requests
#[derive(Debug, Clone)]
pub struct CaptionPipeline {
    manager: Arc<CaptionModelManager>,
    fetcher: ImageFetcher,
}

impl CaptionPipeline {
    pub fn new(manager: Arc<CaptionModelManager>, fetcher: ImageFetcher) -> Self {
        Self { manager, fetcher }
    }

    pub fn manager(&self) -> &Arc<CaptionModelManager> {
        &self.manager
    }

    /// Caption one image
    ///
    /// `source` is `None` when the request named no image.
    pub async fn caption(&self, source: Option<&ImageSource>) -> Result<String, CaptionError> {
        let start = Instant::now();
        let mut stage = RequestStage::Idle;

        let result = self.run(source, &mut stage).await;
        match &result {
            Ok(caption) => {
                info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Caption generated: '{}'", caption
                );
            }
            Err(e) => {
                let failed_at = std::mem::replace(&mut stage, RequestStage::Failed);
                warn!(
                    stage = %failed_at,
                    kind = e.kind(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Caption request failed: {}", e
                );
            }
        }
        debug!(stage = %stage, "Caption request finished");
        result
    }

    async fn run(
        &self,
        source: Option<&ImageSource>,
        stage: &mut RequestStage,
    ) -> Result<String, CaptionError> {
        let model = self.manager.get_model().ok_or_else(|| {
            CaptionError::ModelUnavailable(
                self.manager
                    .load_error()
                    .unwrap_or("model not loaded")
                    .to_string(),
            )
        })?;

        let source = source.ok_or(CaptionError::MissingInput)?;

        *stage = RequestStage::AcquiringImage;
        let image = self.fetcher.acquire(source).await?;

        *stage = RequestStage::Normalizing;
        let rgb = ensure_rgb(image);
        debug!("Normalized image to {}x{} RGB", rgb.width(), rgb.height());

        *stage = RequestStage::Generating;
        let candidates = tokio::task::spawn_blocking(move || model.generate_captions(&rgb))
            .await
            .map_err(|e| CaptionError::Generation(format!("generation task failed: {}", e)))?
            .map_err(|e| CaptionError::Generation(format!("{:#}", e)))?;

        *stage = RequestStage::Responding;
        Ok(candidates
            .into_iter()
            .next()
            .unwrap_or_else(|| NO_CAPTION_FALLBACK.to_string()))
    }
}
