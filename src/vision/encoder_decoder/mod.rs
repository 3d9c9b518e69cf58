// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX vision-encoder-decoder captioning (ViT-GPT2, BLIP-style exports)

pub mod beam_search;
pub mod decoder;
pub mod encoder;
pub mod files;
pub mod model;
pub mod preprocessing;
pub mod session;

pub use beam_search::{beam_search, Hypothesis, SpecialTokens, TokenScorer};
pub use decoder::TextDecoder;
pub use encoder::VisionEncoder;
pub use files::ModelFiles;
pub use model::EncoderDecoderCaptioner;
pub use preprocessing::ImageProcessorConfig;
pub use session::cuda_available;
