// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use image_captioner::{
    api::{start_server, AppState},
    config::ServiceConfig,
    version,
    vision::{encoder_decoder::cuda_available, CaptionModelManager},
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ServiceConfig::parse();
    let addr = config.listen_addr()?;

    tracing::info!("🚀 Starting {}", version::get_version_string());
    tracing::info!(
        "🧠 Caption model: {} (max_length={}, num_beams={}, early_stopping={})",
        config.model.model_id,
        config.model.generation.max_length,
        config.model.generation.num_beams,
        config.model.generation.early_stopping
    );

    // A failed load still starts the server; requests then report the model as unavailable
    let manager = Arc::new(CaptionModelManager::new(&config.model).await?);
    let cuda = cuda_available();
    tracing::info!("CUDA execution provider available: {}", cuda);

    let state = AppState::new(manager, &config.fetch, cuda)?;
    start_server(addr, state).await?;

    tracing::info!("👋 Image captioner shut down");
    Ok(())
}
