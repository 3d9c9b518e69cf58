// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod diagnostic;
pub mod errors;
pub mod generate_caption;
pub mod http_server;
pub mod index;

pub use diagnostic::{diagnostic_handler, health_handler, DiagnosticResponse};
pub use errors::ApiError;
pub use generate_caption::{
    generate_caption_handler, GenerateCaptionRequest, GenerateCaptionResponse,
};
pub use http_server::{create_app, start_server, AppState};
