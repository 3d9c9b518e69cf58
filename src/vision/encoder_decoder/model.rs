// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision-encoder-decoder captioner
//!
//! Pipeline per image:
//! 1. Resize and normalize with the exported processor config
//! 2. Encode pixels into patch embeddings
//! 3. Beam search over the text decoder
//! 4. Detokenize, skipping special tokens

use anyhow::{Context, Result};
use image::RgbImage;
use serde::Deserialize;
use std::path::Path;
use std::time::Instant;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::beam_search::{beam_search, SpecialTokens};
use super::decoder::TextDecoder;
use super::encoder::VisionEncoder;
use super::files::ModelFiles;
use super::preprocessing::ImageProcessorConfig;
use crate::config::{GenerationConfig, ModelConfig};
use crate::vision::caption_model::CaptionModel;

/// Tokens tried, in order, when the configs do not name a start token
const START_TOKEN_CANDIDATES: &[&str] = &["<|endoftext|>", "[CLS]", "<s>"];
const EOS_TOKEN_CANDIDATES: &[&str] = &["<|endoftext|>", "[SEP]", "</s>"];

/// `eos_token_id` is either a single id or a list in generation configs
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TokenIdOrList {
    One(u32),
    Many(Vec<u32>),
}

impl TokenIdOrList {
    fn first(&self) -> Option<u32> {
        match self {
            Self::One(id) => Some(*id),
            Self::Many(ids) => ids.first().copied(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TokenIdSection {
    decoder_start_token_id: Option<u32>,
    bos_token_id: Option<u32>,
    eos_token_id: Option<TokenIdOrList>,
}

/// Token-id fields from `config.json` and `generation_config.json`
#[derive(Debug, Clone, Default, Deserialize)]
struct TokenIdConfig {
    #[serde(flatten)]
    top: TokenIdSection,
    #[serde(default)]
    decoder: Option<TokenIdSection>,
    #[serde(default)]
    text_config: Option<TokenIdSection>,
}

impl TokenIdConfig {
    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
    }

    fn sections(&self) -> impl Iterator<Item = &TokenIdSection> {
        std::iter::once(&self.top)
            .chain(self.decoder.iter())
            .chain(self.text_config.iter())
    }
}

/// Pick start and end tokens: generation config first, then model config,
/// then well-known tokenizer specials
fn resolve_special_tokens(
    configs: &[TokenIdConfig],
    tokenizer: &Tokenizer,
) -> Result<SpecialTokens> {
    let sections: Vec<&TokenIdSection> = configs.iter().flat_map(|c| c.sections()).collect();
    let lookup = |names: &[&str]| names.iter().find_map(|name| tokenizer.token_to_id(name));

    let decoder_start_token_id = sections
        .iter()
        .find_map(|s| s.decoder_start_token_id)
        .or_else(|| sections.iter().find_map(|s| s.bos_token_id))
        .or_else(|| lookup(START_TOKEN_CANDIDATES))
        .context("Could not determine decoder start token id")?;

    let eos_token_id = sections
        .iter()
        .find_map(|s| s.eos_token_id.as_ref().and_then(TokenIdOrList::first))
        .or_else(|| lookup(EOS_TOKEN_CANDIDATES))
        .context("Could not determine end-of-sequence token id")?;

    Ok(SpecialTokens {
        decoder_start_token_id,
        eos_token_id,
    })
}

/// ONNX vision-encoder-decoder captioning model
pub struct EncoderDecoderCaptioner {
    model_id: String,
    encoder: VisionEncoder,
    decoder: TextDecoder,
    tokenizer: Tokenizer,
    processor: ImageProcessorConfig,
    special: SpecialTokens,
    generation: GenerationConfig,
}

impl std::fmt::Debug for EncoderDecoderCaptioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncoderDecoderCaptioner")
            .field("model_id", &self.model_id)
            .field("special", &self.special)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl EncoderDecoderCaptioner {
    /// Resolve files (local directory or Hub) and load every component
    pub async fn load(config: &ModelConfig) -> Result<Self> {
        config.generation.validate()?;

        let files = match &config.model_dir {
            Some(dir) => ModelFiles::from_dir(dir)?,
            None => ModelFiles::from_hub(&config.model_id).await?,
        };

        let model_id = config.model_id.clone();
        let intra_threads = config.intra_threads;
        let generation = config.generation.clone();

        // Session construction is CPU-heavy; keep it off the async workers
        tokio::task::spawn_blocking(move || {
            Self::from_files(model_id, &files, intra_threads, generation)
        })
        .await
        .context("Model loading task panicked")?
    }

    pub fn from_files(
        model_id: String,
        files: &ModelFiles,
        intra_threads: usize,
        generation: GenerationConfig,
    ) -> Result<Self> {
        let start = Instant::now();
        info!(model_id = %model_id, "Loading caption model");

        let tokenizer = Tokenizer::from_file(&files.tokenizer).map_err(|e| {
            anyhow::anyhow!(
                "Failed to load tokenizer from {}: {}",
                files.tokenizer.display(),
                e
            )
        })?;

        let processor = ImageProcessorConfig::from_file(&files.processor_config)?;

        let mut configs = Vec::with_capacity(2);
        if let Some(path) = &files.generation_config {
            configs.push(TokenIdConfig::from_file(path)?);
        }
        configs.push(TokenIdConfig::from_file(&files.config)?);
        let special = resolve_special_tokens(&configs, &tokenizer)?;
        debug!(?special, "Resolved special tokens");

        let encoder = VisionEncoder::new(&files.encoder, intra_threads)
            .context("Failed to load vision encoder")?;
        let decoder = TextDecoder::new(&files.decoder, intra_threads)
            .context("Failed to load text decoder")?;

        info!(
            model_id = %model_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Caption model ready"
        );

        Ok(Self {
            model_id,
            encoder,
            decoder,
            tokenizer,
            processor,
            special,
            generation,
        })
    }
}

impl CaptionModel for EncoderDecoderCaptioner {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn generate_captions(&self, image: &RgbImage) -> Result<Vec<String>> {
        let start = Instant::now();

        let pixel_values = self.processor.preprocess(image);
        let hidden = self
            .encoder
            .encode(&pixel_values)
            .context("Failed to encode image")?;
        debug!("Encoder states: {:?}", hidden.shape());

        let scorer = self.decoder.with_image(&hidden);
        let hypotheses = beam_search(&scorer, &self.generation, self.special)
            .context("Beam search failed")?;

        let mut captions = Vec::with_capacity(hypotheses.len());
        for hyp in hypotheses {
            let text = self
                .tokenizer
                .decode(&hyp.tokens, true)
                .map_err(|e| anyhow::anyhow!("Failed to decode tokens: {}", e))?;
            captions.push(text.trim().to_string());
        }

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            candidates = captions.len(),
            "Generated captions"
        );

        Ok(captions)
    }
}
