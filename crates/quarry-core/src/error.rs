//! Error types and result aliases for Quarry.
//!
//! Errors are structured for programmatic handling: the query server maps
//! them onto HTTP statuses and the ingestor onto run failures.

/// The result type used throughout Quarry.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Quarry operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid record identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the ID invalid.
        message: String,
    },

    /// A snapshot key did not have the `<prefix>_<YYYYMMDDHHMMSS>` shape.
    #[error("invalid snapshot key: {message}")]
    InvalidKey {
        /// Description of what made the key invalid.
        message: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// A path or object was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A precondition for a conditional write was not met.
    #[error("precondition failed: {message}")]
    PreconditionFailed {
        /// Description of the failed precondition.
        message: String,
    },

    /// No snapshot has been published under the prefix.
    #[error("no snapshot found under prefix '{prefix}'")]
    NoSnapshotFound {
        /// The prefix that was resolved.
        prefix: String,
    },

    /// The current snapshot has no records to serve.
    #[error("snapshot {key} contains no records")]
    EmptySnapshot {
        /// Key of the empty snapshot.
        key: String,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::serialization(value.to_string())
    }
}
