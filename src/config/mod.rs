// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Runtime configuration
//!
//! Every option can be given as a command-line flag or through the
//! environment (a `.env` file is loaded by the binaries).

use anyhow::{ensure, Result};
use clap::{ArgAction, Args, Parser};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::vision::image_utils::DEFAULT_MAX_IMAGE_BYTES;

/// ONNX export of nlpconnect/vit-gpt2-image-captioning
pub const DEFAULT_MODEL_ID: &str = "Xenova/vit-gpt2-image-captioning";

pub const DEFAULT_MAX_LENGTH: usize = 16;
pub const DEFAULT_NUM_BEAMS: usize = 4;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Bounded decoding parameters
#[derive(Args, Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Maximum caption length in tokens, decoder start token included
    #[arg(long, env = "CAPTION_MAX_LENGTH", default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_length: usize,

    /// Beam search width
    #[arg(long, env = "CAPTION_NUM_BEAMS", default_value_t = DEFAULT_NUM_BEAMS)]
    pub num_beams: usize,

    /// Stop as soon as `num_beams` finished hypotheses exist
    #[arg(long, env = "CAPTION_EARLY_STOPPING", default_value_t = true, action = ArgAction::Set)]
    pub early_stopping: bool,

    /// Number of candidate captions returned per image
    #[arg(skip = 1usize)]
    pub num_return_sequences: usize,

    /// Exponent applied to hypothesis length when ranking finished beams
    #[arg(skip = 1.0)]
    pub length_penalty: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            num_beams: DEFAULT_NUM_BEAMS,
            early_stopping: true,
            num_return_sequences: 1,
            length_penalty: 1.0,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.num_beams >= 1, "num_beams must be at least 1");
        ensure!(
            self.max_length >= 2,
            "max_length must leave room for at least one generated token, got {}",
            self.max_length
        );
        ensure!(
            self.num_return_sequences >= 1 && self.num_return_sequences <= self.num_beams,
            "num_return_sequences must be between 1 and num_beams ({}), got {}",
            self.num_beams,
            self.num_return_sequences
        );
        Ok(())
    }
}

/// Which pretrained captioning model to load and how to run it
#[derive(Args, Debug, Clone)]
pub struct ModelConfig {
    /// Hugging Face model id; selects the weights, processor and tokenizer
    #[arg(long, env = "CAPTION_MODEL_ID", default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    /// Local directory with the ONNX export; skips the Hub download when set
    #[arg(long, env = "CAPTION_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// ONNX Runtime intra-op threads per session
    #[arg(long, env = "CAPTION_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    #[command(flatten)]
    pub generation: GenerationConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            model_dir: None,
            intra_threads: 4,
            generation: GenerationConfig::default(),
        }
    }
}

/// Limits applied while acquiring images
#[derive(Args, Debug, Clone)]
pub struct FetchConfig {
    /// Timeout for remote image downloads, in seconds
    #[arg(long = "fetch-timeout-secs", env = "CAPTION_FETCH_TIMEOUT_SECS", default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Largest accepted image, in bytes, for both inline and remote sources
    #[arg(long, env = "CAPTION_MAX_IMAGE_BYTES", default_value_t = DEFAULT_MAX_IMAGE_BYTES)]
    pub max_image_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Image captioning HTTP service
#[derive(Parser, Debug, Clone)]
#[command(name = "image-captioner")]
#[command(version)]
#[command(about = "HTTP service that captions images with a pretrained vision-encoder-decoder model", long_about = None)]
pub struct ServiceConfig {
    /// Interface to bind
    #[arg(long, env = "API_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "API_PORT", default_value_t = 5000)]
    pub port: u16,

    #[command(flatten)]
    pub model: ModelConfig,

    #[command(flatten)]
    pub fetch: FetchConfig,
}

impl ServiceConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port).parse()?;
        Ok(addr)
    }
}
