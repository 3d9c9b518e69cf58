// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text decoder: token prefixes plus encoder states in, next-token logits out

use anyhow::{Context, Result};
use ndarray::{s, Array2, Array3, Ix3};
use ort::session::{Session, SessionInputValue};
use ort::value::Value;
use std::borrow::Cow;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::beam_search::TokenScorer;
use super::session::build_session;

const INPUT_IDS: &str = "input_ids";
const ENCODER_HIDDEN_STATES: &str = "encoder_hidden_states";
const ENCODER_ATTENTION_MASK: &str = "encoder_attention_mask";
const ATTENTION_MASK: &str = "attention_mask";

/// ONNX text decoder of a vision-encoder-decoder model
///
/// Runs without a KV cache: every step feeds the whole prefix.
#[derive(Clone)]
pub struct TextDecoder {
    session: Arc<Mutex<Session>>,
    input_names: Vec<String>,
}

impl std::fmt::Debug for TextDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextDecoder")
            .field("input_names", &self.input_names)
            .finish_non_exhaustive()
    }
}

impl TextDecoder {
    pub fn new<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Text decoder model not found: {}", model_path.display());
        }

        info!("Loading text decoder from {}", model_path.display());
        let session = build_session(model_path, intra_threads)?;

        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        debug!("Text decoder inputs: {:?}", input_names);

        for required in [INPUT_IDS, ENCODER_HIDDEN_STATES] {
            if !input_names.iter().any(|n| n == required) {
                anyhow::bail!(
                    "Text decoder is missing input '{}' (has {:?}); merged or cached exports are not supported",
                    required,
                    input_names
                );
            }
        }

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_names,
        })
    }

    fn has_input(&self, name: &str) -> bool {
        self.input_names.iter().any(|n| n == name)
    }

    /// Last-position logits for each sequence, attending to one image's states
    pub fn next_token_logits(
        &self,
        encoder_hidden: &Array3<f32>,
        sequences: &[Vec<u32>],
    ) -> Result<Vec<Vec<f32>>> {
        let batch = sequences.len();
        anyhow::ensure!(batch > 0, "No sequences to decode");
        let seq_len = sequences[0].len();
        anyhow::ensure!(
            sequences.iter().all(|s| s.len() == seq_len),
            "Beam sequences must share a length"
        );

        let (_, enc_len, hidden) = encoder_hidden.dim();

        let ids: Vec<i64> = sequences
            .iter()
            .flat_map(|s| s.iter().map(|&t| t as i64))
            .collect();
        let input_ids = Array2::from_shape_vec((batch, seq_len), ids)
            .context("Failed to shape input_ids")?;

        let states = encoder_hidden
            .slice(s![0..1, .., ..])
            .broadcast((batch, enc_len, hidden))
            .context("Failed to broadcast encoder states across beams")?
            .to_owned();

        let mut inputs: Vec<(Cow<'static, str>, SessionInputValue<'_>)> = vec![
            (
                Cow::Borrowed(INPUT_IDS),
                Value::from_array(input_ids)
                    .context("Failed to create input_ids tensor")?
                    .into(),
            ),
            (
                Cow::Borrowed(ENCODER_HIDDEN_STATES),
                Value::from_array(states)
                    .context("Failed to create encoder states tensor")?
                    .into(),
            ),
        ];
        if self.has_input(ENCODER_ATTENTION_MASK) {
            let mask = Array2::<i64>::ones((batch, enc_len));
            inputs.push((
                Cow::Borrowed(ENCODER_ATTENTION_MASK),
                Value::from_array(mask)?.into(),
            ));
        }
        if self.has_input(ATTENTION_MASK) {
            let mask = Array2::<i64>::ones((batch, seq_len));
            inputs.push((Cow::Borrowed(ATTENTION_MASK), Value::from_array(mask)?.into()));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Text decoder session lock poisoned"))?;

        let outputs = session.run(inputs).context("Decoder inference failed")?;

        let logits = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract decoder logits")?
            .into_dimensionality::<Ix3>()
            .context("Unexpected decoder output rank, expected [batch, seq_len, vocab]")?;

        let (out_batch, out_len, _) = logits.dim();
        anyhow::ensure!(
            out_batch == batch && out_len > 0,
            "Decoder returned logits of shape {:?} for {} sequences",
            logits.shape(),
            batch
        );

        Ok((0..batch)
            .map(|b| logits.slice(s![b, out_len - 1, ..]).to_vec())
            .collect())
    }

    /// Bind this decoder to one image's encoder output
    pub fn with_image<'a>(&'a self, encoder_hidden: &'a Array3<f32>) -> ImageConditionedDecoder<'a> {
        ImageConditionedDecoder {
            decoder: self,
            encoder_hidden,
        }
    }
}

/// Decoder scoring step for a single image
pub struct ImageConditionedDecoder<'a> {
    decoder: &'a TextDecoder,
    encoder_hidden: &'a Array3<f32>,
}

impl TokenScorer for ImageConditionedDecoder<'_> {
    fn next_token_logits(&self, sequences: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
        self.decoder
            .next_token_logits(self.encoder_hidden, sequences)
    }
}
