//! Observability infrastructure for Quarry.
//!
//! Structured logging with consistent spans for both binaries. Production
//! runs emit JSON lines; debug runs use the pretty formatter.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

impl LogFormat {
    /// Picks the format for a debug flag.
    #[must_use]
    pub const fn for_debug(debug: bool) -> Self {
        if debug { Self::Pretty } else { Self::Json }
    }
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `quarry_api=debug`)
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for one ingestion run.
///
/// # Example
///
/// ```rust
/// use quarry_core::observability::ingest_span;
///
/// let span = ingest_span("run-1", "data");
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn ingest_span(run_id: &str, prefix: &str) -> Span {
    tracing::info_span!("ingest", run_id = run_id, prefix = prefix)
}

/// Creates a span for one record query.
#[must_use]
pub fn query_span(prefix: &str, has_id: bool) -> Span {
    tracing::info_span!(
        "query",
        prefix = prefix,
        has_id = has_id,
        snapshot = tracing::field::Empty,
    )
}
