// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision encoder: pixel tensor in, patch embeddings out

use anyhow::{Context, Result};
use ndarray::{Array3, Array4, Ix3};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::session::build_session;

/// ONNX vision encoder of a vision-encoder-decoder model
#[derive(Clone)]
pub struct VisionEncoder {
    /// ONNX Runtime session (run takes `&mut`, so it sits behind a mutex)
    session: Arc<Mutex<Session>>,
    input_name: String,
}

impl std::fmt::Debug for VisionEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionEncoder")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl VisionEncoder {
    /// Load the encoder from an ONNX file
    pub fn new<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Vision encoder model not found: {}", model_path.display());
        }

        info!("Loading vision encoder from {}", model_path.display());
        let session = build_session(model_path, intra_threads)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "pixel_values".to_string());

        debug!("Vision encoder input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
        })
    }

    /// Encode a `[1, 3, H, W]` pixel tensor into `[1, seq_len, hidden]` states
    pub fn encode(&self, pixel_values: &Array4<f32>) -> Result<Array3<f32>> {
        let shape = pixel_values.shape();
        if shape[0] != 1 || shape[1] != 3 {
            anyhow::bail!("Invalid input shape: {:?}, expected [1, 3, H, W]", shape);
        }

        let input_value =
            Value::from_array(pixel_values.to_owned()).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Vision encoder session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Encoder inference failed")?;

        let hidden = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract encoder output")?;

        debug!("Encoder output shape: {:?}", hidden.shape());

        let hidden = hidden
            .into_dimensionality::<Ix3>()
            .context("Unexpected encoder output rank, expected [batch, seq_len, hidden]")?
            .to_owned();

        Ok(hidden)
    }
}
