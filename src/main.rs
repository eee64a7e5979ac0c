//! # Paper Harvest
//!
//! A pipeline that scrapes a conference proceedings site year by year,
//! persists paper metadata to dual stores (CSV + JSON) alongside the
//! downloaded PDFs, and — as a separate pass — assigns each paper a topical
//! category via an OpenAI-compatible model call.
//!
//! ## Usage
//!
//! ```sh
//! paper_harvest scrape --from-year 2018 --to-year 2023
//! paper_harvest annotate
//! ```
//!
//! ## Architecture
//!
//! The scrape command follows a strictly sequential pipeline:
//! 1. **Indexing**: walk one year's index page for paper references
//! 2. **Dedup**: drop references whose titles are already stored
//! 3. **Fetching**: download each new paper page (and its PDF)
//! 4. **Storing**: append the extracted record to both metadata stores
//!
//! Reruns are safe: dedup by title makes the stores grow-only and
//! duplicate-free. The annotate command reads the JSON store and writes an
//! annotated CSV without touching the original.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod annotate;
mod api;
mod cli;
mod config;
mod error;
mod extract;
mod fetch;
mod index;
mod models;
mod pipeline;
mod store;
mod utils;

use annotate::run_annotation;
use cli::{Cli, Command};
use config::HarvestConfig;
use error::HarvestError;
use pipeline::Pipeline;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), HarvestError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("paper_harvest starting up");

    let args = Cli::parse();
    let mut config = HarvestConfig::load(args.config.as_deref())?;
    if let Some(key) = args.api_key {
        config.api_key = key;
    }

    match args.command {
        Command::Scrape { from_year, to_year } => {
            if from_year > to_year {
                return Err(HarvestError::Config(format!(
                    "--from-year {from_year} is after --to-year {to_year}"
                )));
            }

            // Permission problems should abort before any network traffic.
            if let Err(e) = ensure_writable_dir(&config.download_dir).await {
                error!(
                    path = %config.download_dir.display(),
                    error = %e,
                    "download directory is not writable (fix perms or choose a different path)"
                );
                return Err(HarvestError::Config(format!(
                    "download directory not writable: {e}"
                )));
            }

            info!(from_year, to_year, "starting scrape pipeline");
            let pipeline = Pipeline::new(&config)?;
            pipeline.run(from_year..=to_year).await?;
        }
        Command::Annotate { input, output } => {
            let input = input.unwrap_or_else(|| config.json_file.clone());
            let output = output.unwrap_or_else(|| config.annotated_csv_file.clone());
            run_annotation(&config, &input, &output).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "execution complete"
    );
    Ok(())
}
