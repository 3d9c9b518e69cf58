// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Embeddable captioner that loads its model on first use

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::{FetchConfig, ModelConfig};
use crate::vision::acquisition::{ImageFetcher, ImageSource};
use crate::vision::error::CaptionError;
use crate::vision::model_manager::CaptionModelManager;
use crate::vision::pipeline::CaptionPipeline;

/// Library entry point for captioning outside the HTTP service
///
/// Construction is cheap. The model is loaded by the first call that needs
/// it; a failed load is remembered and never retried.
#[derive(Debug)]
pub struct ImageCaptioner {
    /// `None` when built around an existing manager
    model_config: Option<ModelConfig>,
    fetcher: ImageFetcher,
    pipeline: OnceCell<CaptionPipeline>,
}

impl ImageCaptioner {
    pub fn new(model_config: ModelConfig, fetch_config: &FetchConfig) -> anyhow::Result<Self> {
        Ok(Self {
            model_config: Some(model_config),
            fetcher: ImageFetcher::new(fetch_config)?,
            pipeline: OnceCell::new(),
        })
    }

    /// Use an already built manager instead of loading from config
    pub fn with_manager(
        manager: Arc<CaptionModelManager>,
        fetch_config: &FetchConfig,
    ) -> anyhow::Result<Self> {
        let fetcher = ImageFetcher::new(fetch_config)?;
        let pipeline = CaptionPipeline::new(manager, fetcher.clone());
        Ok(Self {
            model_config: None,
            fetcher,
            pipeline: OnceCell::new_with(Some(pipeline)),
        })
    }

    async fn pipeline(&self) -> &CaptionPipeline {
        self.pipeline
            .get_or_init(|| async {
                let manager = match &self.model_config {
                    Some(config) => {
                        info!("Loading caption model on first use: {}", config.model_id);
                        // Load failures are recorded inside the manager
                        match CaptionModelManager::new(config).await {
                            Ok(manager) => manager,
                            Err(e) => CaptionModelManager::unavailable(
                                &config.model_id,
                                format!("{:#}", e),
                            ),
                        }
                    }
                    None => CaptionModelManager::unavailable("unconfigured", "no model configured"),
                };
                CaptionPipeline::new(Arc::new(manager), self.fetcher.clone())
            })
            .await
    }

    /// Caption a base64 image (bare or `data:image/...;base64,` prefixed)
    pub async fn caption_from_base64(&self, image_base64: &str) -> Result<String, CaptionError> {
        let source = ImageSource::from_fields(None, Some(image_base64));
        self.pipeline().await.caption(source.as_ref()).await
    }

    /// Download an image and caption it
    pub async fn caption_from_url(&self, image_url: &str) -> Result<String, CaptionError> {
        let source = ImageSource::from_fields(Some(image_url), None);
        self.pipeline().await.caption(source.as_ref()).await
    }

    /// Load the model if needed and report whether it is usable
    pub async fn check_availability(&self) -> bool {
        self.pipeline().await.manager().is_loaded()
    }

    /// Load error, if the model was loaded and failed
    pub async fn load_error(&self) -> Option<String> {
        self.pipeline()
            .await
            .manager()
            .load_error()
            .map(str::to_string)
    }
}
