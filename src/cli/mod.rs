// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod caption;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::{FetchConfig, ModelConfig};

/// Image Captioner CLI
#[derive(Parser, Debug)]
#[command(name = "caption-cli")]
#[command(version)]
#[command(about = "Caption images from the command line", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub model: ModelConfig,

    #[command(flatten)]
    pub fetch: FetchConfig,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Caption a base64 image (argument, image file, or stdin)
    Base64(caption::Base64Args),

    /// Download an image and caption it
    Url(caption::UrlArgs),

    /// Load the model and report whether it is usable
    Check,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let captioner = caption::build_captioner(cli.model, &cli.fetch)?;
    match cli.command {
        Commands::Base64(args) => caption::caption_base64(&captioner, args).await,
        Commands::Url(args) => caption::caption_url(&captioner, args).await,
        Commands::Check => caption::check_model(&captioner).await,
    }
}
