//! Generate command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use brandkit_core::{AspectRatio, ImageGenerator, ImageGeneratorConfig};
use colored::Colorize;
use tracing::info;

use crate::utils;

/// Execute the generate command.
pub async fn execute(
    prompt: String,
    aspect: String,
    out: PathBuf,
    api_key: Option<String>,
    quiet: bool,
) -> Result<()> {
    let aspect: AspectRatio = aspect.parse()?;

    let api_key = api_key
        .or_else(|| std::env::var("GEMINI_API_KEY").ok())
        .context("No API key: pass --api-key or set GEMINI_API_KEY")?;
    let generator = ImageGenerator::new(ImageGeneratorConfig::new(api_key))
        .context("Failed to create image generator")?;

    info!(aspect = %aspect, "Requesting image generation");
    let image = generator
        .generate(&prompt, aspect)
        .await
        .context("Image generation failed")?;

    std::fs::write(&out, &image.bytes)
        .with_context(|| format!("Failed to write image: {}", out.display()))?;

    if !quiet {
        println!();
        println!("{}", "Image generated!".green().bold());
        println!();
        println!("   {} {}", "Saved:".dimmed(), out.display());
        println!("   {} {}", "Type:".dimmed(), image.mime_type);
        println!(
            "   {} {}",
            "Size:".dimmed(),
            utils::human_bytes(image.bytes.len())
        );
    }

    Ok(())
}
