//! Snapshot publication.
//!
//! A snapshot is written once under a fresh time-ordered key with a
//! does-not-exist precondition. Existing keys are never overwritten, so a
//! failed or conflicting publish leaves every prior snapshot untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use quarry_core::snapshot::validate_prefix;
use quarry_core::{Record, Snapshot, SnapshotKey, StorageBackend, WritePrecondition, WriteResult};

use crate::error::{IngestError, Result};

/// Content type recorded on every snapshot object.
pub const SNAPSHOT_CONTENT_TYPE: &str = "application/json";

/// Writes record collections as new snapshots under a prefix.
#[derive(Clone)]
pub struct SnapshotPublisher {
    storage: Arc<dyn StorageBackend>,
    prefix: String,
}

impl std::fmt::Debug for SnapshotPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotPublisher")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl SnapshotPublisher {
    /// Creates a publisher for `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Config` if the prefix is not a valid key prefix.
    pub fn new(storage: Arc<dyn StorageBackend>, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix).map_err(|e| IngestError::Config {
            message: e.to_string(),
        })?;
        Ok(Self { storage, prefix })
    }

    /// Returns the key prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Publishes `records` under a key for the current UTC second.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Publish` if the key is taken or the write fails.
    pub async fn publish(&self, records: Vec<Record>) -> Result<SnapshotKey> {
        self.publish_at(records, Utc::now()).await
    }

    /// Publishes `records` under the key for `at`.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Publish` if the key is taken or the write fails.
    pub async fn publish_at(&self, records: Vec<Record>, at: DateTime<Utc>) -> Result<SnapshotKey> {
        let key = SnapshotKey::new(&self.prefix, at)
            .map_err(|e| IngestError::publish_with("cannot build snapshot key", e))?;
        let snapshot = Snapshot::new(key.clone(), records);
        let data = snapshot
            .encode()
            .map_err(|e| IngestError::publish_with(format!("cannot encode {key}"), e))?;
        let size = data.len();

        tracing::info!(
            snapshot = %key,
            records = snapshot.len(),
            bytes = size,
            "Attempting snapshot publish"
        );

        let result = self
            .storage
            .put_with_content_type(
                key.as_str(),
                data,
                WritePrecondition::DoesNotExist,
                SNAPSHOT_CONTENT_TYPE,
            )
            .await
            .map_err(|e| IngestError::publish_with(format!("writing {key} failed"), e))?;

        match result {
            WriteResult::Success { version } => {
                tracing::info!(
                    snapshot = %key,
                    version = %version,
                    "Snapshot published successfully"
                );
                Ok(key)
            }
            WriteResult::PreconditionFailed { current_version } => {
                tracing::warn!(
                    snapshot = %key,
                    current_version = %current_version,
                    "Snapshot publish failed - key already exists"
                );
                Err(IngestError::publish_with(
                    format!("snapshot {key} already exists"),
                    quarry_core::Error::PreconditionFailed {
                        message: format!("{key} exists at version {current_version}"),
                    },
                ))
            }
        }
    }
}
