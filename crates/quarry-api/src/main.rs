//! `quarry-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use anyhow::{Context, Result};

use quarry_api::config::Config;
use quarry_api::server::Server;
use quarry_core::observability::{LogFormat, init_logging};
use quarry_core::open_storage;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("loading configuration")?;

    init_logging(LogFormat::for_debug(config.debug));

    let storage = open_storage(&config.settings.storage_location, config.debug)
        .context("opening storage")?;

    let server = Server::with_storage_backend(config, storage);
    server.serve().await?;
    Ok(())
}
