//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod editor;
mod ocr;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use indicatif::ProgressStyle;

use crate::config::load_settings;

#[derive(Parser)]
#[command(name = "pecha")]
#[command(about = "Convert OCR output and editor markup into annotated pechas")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Build a pecha from editor HTML
    Editor {
        /// HTML file exported by the editor
        file: PathBuf,
        /// Base name of the unit (default: file stem)
        #[arg(short, long)]
        base_name: Option<String>,
        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a pecha from the Google Vision OCR output of an image group
    Ocr {
        /// Image group ID (directory name under the OCR dir)
        image_group: String,
        /// Root directory of OCR artifacts (overrides config)
        #[arg(long, env = "PECHA_OCR_DIR")]
        ocr_dir: Option<PathBuf>,
        /// Pages formatted concurrently (overrides config)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Language for undetermined detections (overrides config)
        #[arg(short = 'l', long)]
        default_language: Option<String>,
        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Progress bar style shared by long-running commands.
fn progress_style() -> anyhow::Result<ProgressStyle> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")?
        .progress_chars("█▓░"))
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut settings, _config) = load_settings(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Editor {
            file,
            base_name,
            output,
        } => {
            if let Some(output) = output {
                settings.output_dir = output;
            }
            editor::cmd_editor(&settings, &file, base_name).await
        }
        Commands::Ocr {
            image_group,
            ocr_dir,
            workers,
            default_language,
            output,
        } => {
            if let Some(ocr_dir) = ocr_dir {
                settings.ocr_dir = Some(ocr_dir);
            }
            if let Some(workers) = workers {
                settings.workers = workers.max(1);
            }
            if let Some(language) = default_language {
                settings.default_language = language;
            }
            if let Some(output) = output {
                settings.output_dir = output;
            }
            ocr::cmd_ocr(&settings, &image_group).await
        }
    }
}
