// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Generate caption API endpoint module
//!
//! Provides POST /generate_caption for captioning an inline or remote image.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::generate_caption_handler;
pub use request::GenerateCaptionRequest;
pub use response::GenerateCaptionResponse;
