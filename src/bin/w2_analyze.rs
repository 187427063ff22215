//! W-2 Analyzer CLI
//!
//! Usage:
//!   cargo run --bin w2_analyze -- path/to/w2.jpg
//!
//! Runs against mock data unless TEST_MODE=false and GEMINI_API_KEY is set.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pricegap_backend::{config::Config, w2::W2Analyzer};

#[derive(Parser, Debug)]
#[command(name = "w2_analyze")]
#[command(about = "Extract W-2 fields from an image and print insights as JSON")]
struct Args {
    /// W-2 image or PDF
    #[arg(default_value = "896-1-1024x721.jpg")]
    path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if !args.path.exists() {
        bail!("W-2 file not found: {}", args.path.display());
    }

    let analyzer = W2Analyzer::new(&config.w2)?;
    eprintln!("Processing W-2...");
    let report = analyzer.process_file(&args.path).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to render report")?
    );
    Ok(())
}
