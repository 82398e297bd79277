//! Brand command implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use brandkit_core::{
    BatchRunner, GeminiAdvisor, GeminiAdvisorConfig, ItemState, ItemStatus, MockAdvisor,
    PlacementAdvisor, RunObserver, RunOptions, RunResult, SourceAsset,
};
use colored::Colorize;
use tracing::{debug, info};

use crate::utils;

pub struct BrandArgs {
    pub images: Vec<PathBuf>,
    pub logo: PathBuf,
    pub out: PathBuf,
    pub padding: u32,
    pub batch_size: u32,
    pub square: bool,
    pub mock_advisor: bool,
    pub api_key: Option<String>,
}

/// Prints per-item progress lines as the pipeline advances.
struct ProgressPrinter {
    quiet: bool,
    total: usize,
}

impl RunObserver for ProgressPrinter {
    fn item_changed(&mut self, item: &ItemState) {
        if self.quiet {
            return;
        }
        match item.status {
            ItemStatus::Analyzing => {
                println!(
                    "{} {}",
                    format!("[{}/{}]", item.id + 1, self.total).dimmed(),
                    item.name
                );
            }
            ItemStatus::Completed => {
                let corner = item
                    .placement
                    .as_ref()
                    .map(|p| p.corner.to_string())
                    .unwrap_or_default();
                println!("      {} logo at {corner}", "branded:".green());
            }
            ItemStatus::Error => {
                println!(
                    "      {} {}",
                    "skipped:".yellow(),
                    item.error_reason.as_deref().unwrap_or("error")
                );
            }
            _ => {}
        }
    }
}

/// Execute the brand command.
pub async fn execute(args: BrandArgs, quiet: bool) -> Result<()> {
    let logo = std::fs::read(&args.logo)
        .with_context(|| format!("Failed to read logo file: {}", args.logo.display()))?;
    debug!(path = %args.logo.display(), bytes = logo.len(), "Read logo");

    let mut assets = Vec::with_capacity(args.images.len());
    for path in &args.images {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        assets.push(SourceAsset::new(name, bytes));
    }
    info!(images = assets.len(), "Gallery loaded");

    let options = RunOptions {
        padding: args.padding,
        force_square: args.square,
        batch_size: args.batch_size as usize,
    };
    let mut observer = ProgressPrinter {
        quiet,
        total: assets.len(),
    };

    let result = if args.mock_advisor {
        if !quiet {
            eprintln!(
                "{}",
                "Using mock advisor (fallback placement for every image)".yellow()
            );
        }
        run_batch(MockAdvisor::default(), &assets, &logo, &options, &mut observer).await?
    } else {
        let api_key = args
            .api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .context("No API key: pass --api-key, set GEMINI_API_KEY, or use --mock-advisor")?;
        let advisor = GeminiAdvisor::new(GeminiAdvisorConfig::new(api_key))
            .context("Failed to create placement advisor")?;
        run_batch(advisor, &assets, &logo, &options, &mut observer).await?
    };

    let Some(archive) = result.archive else {
        bail!("Failed to assemble the output archive");
    };
    std::fs::write(&args.out, &archive)
        .with_context(|| format!("Failed to write archive: {}", args.out.display()))?;

    info!(path = %args.out.display(), bytes = archive.len(), "Archive saved");

    if !quiet {
        let skipped = result.items.len() - result.completed;
        println!();
        println!("{}", "Branding run complete!".green().bold());
        println!();
        println!(
            "   {} {} of {}",
            "Branded:".dimmed(),
            result.completed,
            result.items.len()
        );
        if skipped > 0 {
            println!("   {} {}", "Skipped:".dimmed(), skipped);
        }
        println!(
            "   {} {} ({})",
            "Archive:".dimmed(),
            args.out.display(),
            utils::human_bytes(archive.len())
        );
    }

    Ok(())
}

async fn run_batch<A: PlacementAdvisor>(
    advisor: A,
    assets: &[SourceAsset],
    logo: &[u8],
    options: &RunOptions,
    observer: &mut ProgressPrinter,
) -> Result<RunResult> {
    let runner = BatchRunner::new(advisor);
    runner
        .run(assets, logo, options, observer)
        .await
        .context("Branding run failed")
}
