// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Locating model files, either in a local directory or on the Hugging Face Hub

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

const ENCODER_NAMES: &[&str] = &[
    "encoder_model.onnx",
    "vision_encoder.onnx",
    "encoder.onnx",
];
const DECODER_NAMES: &[&str] = &["decoder_model.onnx", "decoder.onnx"];
const TOKENIZER_FILE: &str = "tokenizer.json";
const PROCESSOR_FILE: &str = "preprocessor_config.json";
const CONFIG_FILE: &str = "config.json";
const GENERATION_CONFIG_FILE: &str = "generation_config.json";

/// Subdirectories searched after the model root
const SEARCH_SUBDIRS: &[&str] = &["", "onnx"];

/// Paths to every file a vision-encoder-decoder export needs
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFiles {
    pub encoder: PathBuf,
    pub decoder: PathBuf,
    pub tokenizer: PathBuf,
    pub processor_config: PathBuf,
    pub config: PathBuf,
    pub generation_config: Option<PathBuf>,
}

impl ModelFiles {
    /// Resolve files from a local export directory
    ///
    /// Each file may sit at the root or under `onnx/`, matching the layout
    /// of Optimum and Transformers.js exports.
    pub fn from_dir<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let model_dir = model_dir.as_ref();

        if !model_dir.exists() {
            anyhow::bail!("Caption model directory not found: {}", model_dir.display());
        }

        Ok(Self {
            encoder: find_model_file(model_dir, ENCODER_NAMES)?,
            decoder: find_model_file(model_dir, DECODER_NAMES)?,
            tokenizer: find_model_file(model_dir, &[TOKENIZER_FILE])?,
            processor_config: find_model_file(model_dir, &[PROCESSOR_FILE])?,
            config: find_model_file(model_dir, &[CONFIG_FILE])?,
            generation_config: find_model_file(model_dir, &[GENERATION_CONFIG_FILE]).ok(),
        })
    }

    /// Download (or reuse from the local cache) an export from the Hub
    pub async fn from_hub(model_id: &str) -> Result<Self> {
        let api = hf_hub::api::tokio::Api::new().context("Failed to initialize Hugging Face Hub client")?;
        let repo = api.model(model_id.to_string());

        info!(model_id, "Resolving caption model files from Hugging Face Hub");

        let encoder = get_first(&repo, model_id, ENCODER_NAMES).await?;
        let decoder = get_first(&repo, model_id, DECODER_NAMES).await?;
        let tokenizer = get_first(&repo, model_id, &[TOKENIZER_FILE]).await?;
        let processor_config = get_first(&repo, model_id, &[PROCESSOR_FILE]).await?;
        let config = get_first(&repo, model_id, &[CONFIG_FILE]).await?;
        let generation_config = get_first(&repo, model_id, &[GENERATION_CONFIG_FILE]).await.ok();

        Ok(Self {
            encoder,
            decoder,
            tokenizer,
            processor_config,
            config,
            generation_config,
        })
    }
}

/// Find a model file by trying multiple possible names and locations
fn find_model_file(dir: &Path, names: &[&str]) -> Result<PathBuf> {
    for subdir in SEARCH_SUBDIRS {
        for name in names {
            let path = dir.join(subdir).join(name);
            if path.is_file() {
                return Ok(path);
            }
        }
    }
    anyhow::bail!(
        "Model file not found in {}. Tried: {:?}",
        dir.display(),
        names
    );
}

async fn get_first(
    repo: &hf_hub::api::tokio::ApiRepo,
    model_id: &str,
    names: &[&str],
) -> Result<PathBuf> {
    let mut last_error = None;
    for subdir in SEARCH_SUBDIRS {
        for name in names {
            let remote = if subdir.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", subdir, name)
            };
            match repo.get(&remote).await {
                Ok(path) => return Ok(path),
                Err(e) => last_error = Some(e),
            }
        }
    }

    let reason = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no candidates".to_string());
    anyhow::bail!(
        "Model file not found in {} on the Hub. Tried: {:?} ({})",
        model_id,
        names,
        reason
    );
}
