// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing driven by the model's `preprocessor_config.json`

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use serde::Deserialize;
use std::path::Path;

/// Target size declared by the processor config
///
/// Hugging Face exports use three shapes for this field.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProcessorSize {
    HeightWidth { height: u32, width: u32 },
    ShortestEdge { shortest_edge: u32 },
    Square(u32),
}

impl ProcessorSize {
    /// Output (width, height) for an input of the given dimensions
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        match *self {
            Self::HeightWidth { height, width } => (width, height),
            Self::Square(side) => (side, side),
            Self::ShortestEdge { shortest_edge } => {
                let (w, h) = (width.max(1) as f32, height.max(1) as f32);
                let scale = shortest_edge as f32 / w.min(h);
                (
                    ((w * scale).round() as u32).max(1),
                    ((h * scale).round() as u32).max(1),
                )
            }
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_rescale_factor() -> f32 {
    1.0 / 255.0
}

fn default_resample() -> u8 {
    2
}

fn default_size() -> ProcessorSize {
    ProcessorSize::HeightWidth {
        height: 224,
        width: 224,
    }
}

fn default_stats() -> [f32; 3] {
    [0.5, 0.5, 0.5]
}

/// The subset of a Hugging Face image processor config needed for inference
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageProcessorConfig {
    #[serde(default = "default_true")]
    pub do_resize: bool,
    #[serde(default = "default_size")]
    pub size: ProcessorSize,
    /// PIL resample id: 0 nearest, 1 lanczos, 2 bilinear, 3 bicubic
    #[serde(default = "default_resample")]
    pub resample: u8,
    #[serde(default)]
    pub do_center_crop: bool,
    /// Crop window; `None` falls back to `size`
    #[serde(default)]
    pub crop_size: Option<ProcessorSize>,
    #[serde(default = "default_true")]
    pub do_rescale: bool,
    #[serde(default = "default_rescale_factor")]
    pub rescale_factor: f32,
    #[serde(default = "default_true")]
    pub do_normalize: bool,
    #[serde(default = "default_stats")]
    pub image_mean: [f32; 3],
    #[serde(default = "default_stats")]
    pub image_std: [f32; 3],
}

impl Default for ImageProcessorConfig {
    fn default() -> Self {
        Self {
            do_resize: true,
            size: default_size(),
            resample: default_resample(),
            do_center_crop: false,
            crop_size: None,
            do_rescale: true,
            rescale_factor: default_rescale_factor(),
            do_normalize: true,
            image_mean: default_stats(),
            image_std: default_stats(),
        }
    }
}

impl ImageProcessorConfig {
    /// Load `preprocessor_config.json`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read processor config {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Invalid processor config {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        anyhow::ensure!(
            config.image_std.iter().all(|s| *s != 0.0),
            "image_std must not contain zeros"
        );
        Ok(config)
    }

    pub fn filter(&self) -> FilterType {
        match self.resample {
            0 => FilterType::Nearest,
            1 => FilterType::Lanczos3,
            3 => FilterType::CatmullRom,
            _ => FilterType::Triangle,
        }
    }

    /// Crop window (width, height), when center cropping is enabled
    pub fn crop_dimensions(&self) -> Option<(u32, u32)> {
        if !self.do_center_crop {
            return None;
        }
        let dims = match self.crop_size.unwrap_or(self.size) {
            ProcessorSize::HeightWidth { height, width } => (width, height),
            ProcessorSize::Square(side) => (side, side),
            ProcessorSize::ShortestEdge { shortest_edge } => (shortest_edge, shortest_edge),
        };
        Some(dims)
    }

    /// Convert an RGB image into an NCHW `[1, 3, H, W]` tensor
    pub fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
        let resized;
        let rgb = if self.do_resize {
            let (w, h) = self.size.target_dimensions(image.width(), image.height());
            if (w, h) == image.dimensions() {
                image
            } else {
                resized = image::imageops::resize(image, w, h, self.filter());
                &resized
            }
        } else {
            image
        };

        let cropped;
        let rgb = match self.crop_dimensions() {
            Some(dims) if dims != rgb.dimensions() => {
                cropped = center_crop(rgb, dims);
                &cropped
            }
            _ => rgb,
        };

        let (width, height) = (rgb.width() as usize, rgb.height() as usize);
        let scale = if self.do_rescale { self.rescale_factor } else { 1.0 };

        let mut tensor = Array4::<f32>::zeros((1, 3, height, width));
        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3 {
                let mut value = pixel[c] as f32 * scale;
                if self.do_normalize {
                    value = (value - self.image_mean[c]) / self.image_std[c];
                }
                tensor[[0, c, y as usize, x as usize]] = value;
            }
        }

        tensor
    }
}

/// Cut a centered `(width, height)` window out of `image`
///
/// Sides smaller than the window are zero-padded on both ends.
fn center_crop(image: &RgbImage, (width, height): (u32, u32)) -> RgbImage {
    let offset = |outer: u32, inner: u32| (i64::from(inner) - i64::from(outer)) / 2;
    let mut canvas = RgbImage::new(width.max(1), height.max(1));
    image::imageops::overlay(
        &mut canvas,
        image,
        offset(image.width(), width),
        offset(image.height(), height),
    );
    canvas
}
