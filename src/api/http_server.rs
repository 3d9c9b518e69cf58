// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::diagnostic::{diagnostic_handler, health_handler};
use super::generate_caption::generate_caption_handler;
use super::index::{index_handler, scripts_handler};
use crate::config::FetchConfig;
use crate::vision::acquisition::ImageFetcher;
use crate::vision::model_manager::CaptionModelManager;
use crate::vision::pipeline::CaptionPipeline;

/// Headroom over the base64-encoded image for the JSON envelope
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<CaptionPipeline>,
    /// Probed once at startup
    pub cuda_available: bool,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        manager: Arc<CaptionModelManager>,
        fetch: &FetchConfig,
        cuda_available: bool,
    ) -> anyhow::Result<Self> {
        let fetcher = ImageFetcher::new(fetch)?;
        Ok(Self {
            pipeline: Arc::new(CaptionPipeline::new(manager, fetcher)),
            cuda_available,
            // base64 grows payloads by 4/3
            max_body_bytes: (fetch.max_image_bytes / 3)
                .saturating_mul(4)
                .saturating_add(4 + BODY_OVERHEAD_BYTES),
        })
    }
}

/// Build the router with every route and layer
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/static/scripts.js", get(scripts_handler))
        .route("/generate_caption", post(generate_caption_handler))
        .route("/diagnostic", get(diagnostic_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve until Ctrl-C, then drain in-flight requests
pub async fn start_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received, draining requests"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}
