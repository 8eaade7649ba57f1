//! Ingestor configuration.

use std::time::Duration;

use quarry_core::config::DEBUG;
use quarry_core::{EnvVars, SnapshotSettings};

use crate::error::{IngestError, Result};

/// Environment variable for the source request timeout in seconds.
pub const FETCH_TIMEOUT_SECS: &str = "FETCH_TIMEOUT_SECS";

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const MAX_FETCH_TIMEOUT_SECS: u64 = 600;

/// Configuration for one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Storage location, source URL, and key prefix.
    pub settings: SnapshotSettings,
    /// Source request timeout in seconds (1-600).
    pub fetch_timeout_secs: u64,
    /// Pretty logs instead of JSON.
    pub debug: bool,
}

impl IngestConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Config` naming the offending variable.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&EnvVars::process())
    }

    /// Loads configuration through a lookup.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Config` naming the offending variable.
    pub fn from_vars<F>(vars: &EnvVars<F>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = SnapshotSettings::from_vars(vars).map_err(config_error)?;
        let debug = vars.bool(DEBUG).map_err(config_error)?.unwrap_or(false);
        let fetch_timeout_secs = vars
            .parsed::<u64>(FETCH_TIMEOUT_SECS, "a number of seconds")
            .map_err(config_error)?
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);

        if !(1..=MAX_FETCH_TIMEOUT_SECS).contains(&fetch_timeout_secs) {
            return Err(IngestError::Config {
                message: format!(
                    "{FETCH_TIMEOUT_SECS} must be between 1 and {MAX_FETCH_TIMEOUT_SECS}"
                ),
            });
        }

        Ok(Self {
            settings,
            fetch_timeout_secs,
            debug,
        })
    }

    /// Returns the source request timeout.
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn config_error(err: quarry_core::Error) -> IngestError {
    IngestError::Config {
        message: err.to_string(),
    }
}
