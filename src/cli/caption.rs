// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Args;
use std::io::Read;
use std::path::PathBuf;

use crate::config::{FetchConfig, ModelConfig};
use crate::vision::error::ImageOrigin;
use crate::vision::ImageCaptioner;

#[derive(Args, Debug)]
pub struct Base64Args {
    /// Base64 payload, optionally a data URL; read from stdin when omitted
    #[arg(conflicts_with = "file")]
    pub data: Option<String>,

    /// Image file to encode and caption
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct UrlArgs {
    /// http(s) URL of the image
    pub url: String,
}

pub fn build_captioner(model: ModelConfig, fetch: &FetchConfig) -> Result<ImageCaptioner> {
    model.generation.validate()?;
    ImageCaptioner::new(model, fetch)
}

fn read_base64(args: Base64Args) -> Result<String> {
    if let Some(data) = args.data {
        return Ok(data);
    }
    if let Some(path) = args.file {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read image file {}", path.display()))?;
        return Ok(STANDARD.encode(bytes));
    }
    let mut data = String::new();
    std::io::stdin()
        .read_to_string(&mut data)
        .context("Failed to read base64 image from stdin")?;
    Ok(data)
}

pub async fn caption_base64(captioner: &ImageCaptioner, args: Base64Args) -> Result<()> {
    let data = read_base64(args)?;
    let caption = captioner
        .caption_from_base64(&data)
        .await
        .map_err(|e| anyhow::anyhow!(e.legacy_message(ImageOrigin::Inline)))?;
    println!("{}", caption);
    Ok(())
}

pub async fn caption_url(captioner: &ImageCaptioner, args: UrlArgs) -> Result<()> {
    let caption = captioner
        .caption_from_url(&args.url)
        .await
        .map_err(|e| anyhow::anyhow!(e.legacy_message(ImageOrigin::Remote)))?;
    println!("{}", caption);
    Ok(())
}

pub async fn check_model(captioner: &ImageCaptioner) -> Result<()> {
    if captioner.check_availability().await {
        println!("✅ Model loaded successfully");
        Ok(())
    } else {
        let reason = captioner
            .load_error()
            .await
            .unwrap_or_else(|| "unknown error".to_string());
        anyhow::bail!("Model not available: {}", reason)
    }
}
