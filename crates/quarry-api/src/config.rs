//! Server configuration.

use quarry_core::config::DEBUG;
use quarry_core::{EnvVars, MissPolicy, Result, SnapshotSettings};

/// Environment variable for the HTTP listen port.
pub const HTTP_PORT: &str = "HTTP_PORT";
/// Environment variable selecting the miss policy.
pub const MISS_POLICY: &str = "MISS_POLICY";

const DEFAULT_HTTP_PORT: u16 = 8080;

/// Query server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP port to listen on.
    pub http_port: u16,
    /// Enable debug mode (pretty logs, `memory://` storage allowed).
    pub debug: bool,
    /// What to do when a supplied identifier matches nothing.
    pub miss_policy: MissPolicy,
    /// Storage location, source URL, and key prefix.
    pub settings: SnapshotSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            debug: true,
            miss_policy: MissPolicy::default(),
            settings: SnapshotSettings {
                storage_location: "memory://".to_string(),
                source_url: String::new(),
                key_prefix: "data".to_string(),
            },
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Required: `STORAGE_LOCATION`, `SOURCE_URL`, `KEY_PREFIX`.
    ///
    /// Optional:
    /// - `HTTP_PORT` (default 8080)
    /// - `DEBUG` (default false)
    /// - `MISS_POLICY` (`fallback_random` | `not_found`, default `fallback_random`)
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable that is missing or unparseable.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&EnvVars::process())
    }

    /// Loads configuration through a lookup.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable that is missing or unparseable.
    pub fn from_vars<F>(vars: &EnvVars<F>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = SnapshotSettings::from_vars(vars)?;
        let http_port = vars
            .parsed::<u16>(HTTP_PORT, "a port number")?
            .unwrap_or(DEFAULT_HTTP_PORT);
        let debug = vars.bool(DEBUG)?.unwrap_or(false);
        let miss_policy = vars
            .parsed::<MissPolicy>(MISS_POLICY, "fallback_random or not_found")?
            .unwrap_or_default();

        Ok(Self {
            http_port,
            debug,
            miss_policy,
            settings,
        })
    }

    /// Returns the snapshot key prefix.
    #[must_use]
    pub fn key_prefix(&self) -> &str {
        &self.settings.key_prefix
    }
}
