//! Brandkit CLI - batch image branding tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;
mod exit_codes;
mod utils;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   success
  1   general error
  64  usage error (missing credential, invalid option)
  66  cannot read an input file
  69  external service unavailable
  74  cannot write an output file";

#[derive(Parser)]
#[command(name = "brandkit")]
#[command(author, version, about = "Batch image branding with AI-assisted logo placement")]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Suppress progress and summary output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Brand a gallery of product photos and package them into a ZIP archive
    Brand {
        /// Product photos to brand, processed in the given order
        #[arg(value_name = "IMAGE", required = true)]
        images: Vec<PathBuf>,

        /// Brand logo image
        #[arg(short, long, value_name = "FILE")]
        logo: PathBuf,

        /// Output archive path
        #[arg(short, long, default_value = "branded.zip")]
        out: PathBuf,

        /// Corner-logo padding, authored against a 1000-unit-wide frame
        #[arg(short, long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(0..=200))]
        padding: u32,

        /// Images processed between cooperative scheduler yields
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=50))]
        batch_size: u32,

        /// Force square output canvases on a white background
        #[arg(long)]
        square: bool,

        /// Skip the vision model and use the fallback placement for every image
        #[arg(long)]
        mock_advisor: bool,

        /// Gemini API key (defaults to the GEMINI_API_KEY environment variable)
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
    },

    /// Generate a product image from a text prompt
    Generate {
        /// Free-text prompt
        #[arg(value_name = "PROMPT")]
        prompt: String,

        /// Output aspect ratio: 1:1, 3:4, 4:3, 9:16 or 16:9
        #[arg(short, long, default_value = "1:1")]
        aspect: String,

        /// Output image path
        #[arg(short, long, default_value = "generated.png")]
        out: PathBuf,

        /// Gemini API key (defaults to the GEMINI_API_KEY environment variable)
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    utils::init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Brand {
            images,
            logo,
            out,
            padding,
            batch_size,
            square,
            mock_advisor,
            api_key,
        } => {
            commands::brand::execute(
                commands::brand::BrandArgs {
                    images,
                    logo,
                    out,
                    padding,
                    batch_size,
                    square,
                    mock_advisor,
                    api_key,
                },
                cli.quiet,
            )
            .await
        }
        Commands::Generate {
            prompt,
            aspect,
            out,
            api_key,
        } => commands::generate::execute(prompt, aspect, out, api_key, cli.quiet).await,
    };

    if let Err(e) = result {
        let exit = exit_codes::ExitCode::from_anyhow(&e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(exit.code);
    }
}
