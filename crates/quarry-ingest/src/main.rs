//! `quarry-ingest` binary entrypoint (scheduled job).
//!
//! Runs one ingestion and prints a JSON status object to stdout. Exits
//! non-zero if the run fails.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use quarry_core::{LogFormat, init_logging, open_storage};
use quarry_ingest::{HttpSource, IngestConfig, IngestReport, Ingestor, SnapshotPublisher};

#[derive(Serialize)]
struct Status<'a> {
    status: &'a str,
    message: String,
}

async fn run(config: IngestConfig) -> Result<IngestReport> {
    let storage = open_storage(&config.settings.storage_location, config.debug)
        .context("opening storage")?;
    let publisher = SnapshotPublisher::new(storage, config.settings.key_prefix.clone())?;
    let source = HttpSource::new(config.settings.source_url.clone(), config.fetch_timeout())?;

    let report = Ingestor::new(Arc::new(source), publisher).run().await?;
    Ok(report)
}

fn print_status(status: &Status<'_>) {
    match serde_json::to_string(status) {
        Ok(line) => println!("{line}"),
        Err(e) => eprintln!("failed to render status: {e}"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = match IngestConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            print_status(&Status {
                status: "error",
                message: e.to_string(),
            });
            return ExitCode::FAILURE;
        }
    };

    init_logging(LogFormat::for_debug(config.debug));

    match run(config).await {
        Ok(report) => {
            print_status(&Status {
                status: "ok",
                message: report.message(),
            });
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "ingestion failed");
            print_status(&Status {
                status: "error",
                message: format!("{e:#}"),
            });
            ExitCode::FAILURE
        }
    }
}
