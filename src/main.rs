use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use coursemology_uploader::{logging, orchestrator, Config};

/// Bulk-upload student programming submissions to a Coursemology
/// assessment.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let jobs = orchestrator::run(&config).await?;
    info!(count = jobs.len(), "submitted files for grading");
    println!("Submitted {} files for grading.", jobs.len());

    Ok(())
}
