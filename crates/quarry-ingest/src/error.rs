//! Error types for ingestion runs.
//!
//! Every variant aborts the run before anything is written, so no reader
//! ever observes a partial snapshot.

use thiserror::Error;

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors that can occur during an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The source dataset could not be fetched.
    #[error("source fetch failed: {message}")]
    SourceFetch {
        /// Description of the fetch failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The source content is not valid delimited text.
    #[error("parse error: {message}")]
    Parse {
        /// Description of the parse failure.
        message: String,
    },

    /// The snapshot could not be written to the blob store.
    #[error("publish failed: {message}")]
    Publish {
        /// Description of the publish failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<quarry_core::Error>,
    },

    /// The ingestor is misconfigured.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },
}

impl IngestError {
    /// Creates a fetch error without an underlying cause.
    #[must_use]
    pub fn source_fetch(message: impl Into<String>) -> Self {
        Self::SourceFetch {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a fetch error with an underlying cause.
    #[must_use]
    pub fn source_fetch_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::SourceFetch {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a publish error wrapping its core cause.
    #[must_use]
    pub fn publish_with(message: impl Into<String>, source: quarry_core::Error) -> Self {
        Self::Publish {
            message: message.into(),
            source: Some(source),
        }
    }
}
