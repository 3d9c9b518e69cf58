// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Caption model manager tests

use image_captioner::{config::ModelConfig, vision::CaptionModelManager};
use std::path::PathBuf;

#[tokio::test]
async fn test_manager_survives_missing_model_dir() {
    let config = ModelConfig {
        model_dir: Some(PathBuf::from("/nonexistent/caption-model")),
        ..Default::default()
    };

    let manager = CaptionModelManager::new(&config).await.unwrap();

    assert!(!manager.is_loaded());
    assert!(manager.get_model().is_none());
    assert_eq!(manager.model_id(), config.model_id);
    assert!(manager.load_error().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_manager_reports_partial_export() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("onnx")).unwrap();
    std::fs::write(dir.path().join("onnx/encoder_model.onnx"), b"").unwrap();

    let config = ModelConfig {
        model_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let manager = CaptionModelManager::new(&config).await.unwrap();

    assert!(!manager.is_loaded());
    assert!(manager.load_error().unwrap().contains("decoder_model.onnx"));
}

#[tokio::test]
async fn test_manager_reports_invalid_generation_config() {
    let mut config = ModelConfig {
        model_dir: Some(PathBuf::from("/nonexistent/caption-model")),
        ..Default::default()
    };
    config.generation.num_beams = 0;

    let manager = CaptionModelManager::new(&config).await.unwrap();

    assert!(manager.load_error().unwrap().contains("num_beams"));
}
