//! closefeed CLI — update the consolidated Kraken USD close-price dataset.
//!
//! Takes no arguments. Every run discovers the USD pairs, fetches daily
//! candles since the dataset's last date (or the full lookback window for
//! new pairs), and rewrites the CSV in place. Log verbosity follows
//! `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use clap::Parser;
use closefeed_core::data::KrakenClient;
use closefeed_core::{run_update, JobConfig, UpdateOutcome, UpdateSummary};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "closefeed",
    version,
    about = "Incrementally update the Kraken USD pairs close-price history CSV"
)]
struct Cli {}

fn main() -> Result<()> {
    let _cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = JobConfig::default();
    let client = KrakenClient::new(&config).context("failed to set up Kraken client")?;

    let summary = run_update(&config, &client, chrono::Utc::now())
        .with_context(|| format!("update of {} failed", config.dataset_path.display()))?;

    report(&summary);
    Ok(())
}

fn report(summary: &UpdateSummary) {
    for pair in &summary.interrupted {
        warn!(pair = pair.as_str(), "history incomplete for this run");
    }

    match &summary.outcome {
        UpdateOutcome::NoPairs => info!("nothing to do"),
        UpdateOutcome::NoNewData => info!(
            pairs = summary.pairs,
            requests = summary.requests,
            "no new data, dataset unchanged"
        ),
        UpdateOutcome::Written { rows, hash } => info!(
            pairs = summary.pairs,
            new_pairs = summary.new_pairs,
            requests = summary.requests,
            fetched = summary.rows_fetched,
            rows,
            %hash,
            "CSV file updated successfully"
        ),
    }
}
