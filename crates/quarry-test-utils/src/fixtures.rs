//! Pre-built test fixtures for common test scenarios.
//!
//! Provides factory functions to create test data with sensible defaults.

use std::sync::Arc;

use bytes::Bytes;
use quarry_core::{Record, RecordId, Snapshot, SnapshotKey, StorageBackend, WritePrecondition};

use crate::storage::TracingMemoryBackend;

/// Default key prefix used by fixtures.
pub const TEST_PREFIX: &str = "fruit";

/// Source table matching [`fruit_records`].
pub const FRUIT_CSV: &str = "name,colour,price\nApple,red,1.00\nBanana,yellow,0.25\nPear,green,0.50\n";

/// Test context with pre-configured storage and prefix.
pub struct TestContext {
    /// Shared storage backend.
    pub storage: Arc<TracingMemoryBackend>,
    /// Key prefix under test.
    pub prefix: String,
}

impl TestContext {
    /// Creates a new test context with the default prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::with_prefix(TEST_PREFIX)
    }

    /// Creates context with a specific prefix.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            storage: Arc::new(TracingMemoryBackend::new()),
            prefix: prefix.into(),
        }
    }

    /// Returns the key for `timestamp` (`YYYYMMDDHHMMSS`) under this prefix.
    #[must_use]
    pub fn key(&self, timestamp: &str) -> SnapshotKey {
        snapshot_key(&self.prefix, timestamp)
    }

    /// Publishes `records` at `timestamp` and returns the key.
    pub async fn publish(&self, timestamp: &str, records: Vec<Record>) -> SnapshotKey {
        let key = self.key(timestamp);
        publish_snapshot(self.storage.as_ref(), &Snapshot::new(key.clone(), records)).await;
        key
    }

    /// Writes raw bytes under `path`.
    pub async fn put_raw(&self, path: &str, data: impl Into<Bytes>) {
        self.storage
            .put(path, data.into(), WritePrecondition::None)
            .await
            .expect("put raw object");
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses `<prefix>_<timestamp>` into a key.
#[must_use]
pub fn snapshot_key(prefix: &str, timestamp: &str) -> SnapshotKey {
    SnapshotKey::parse_with_prefix(&format!("{prefix}_{timestamp}"), prefix)
        .expect("valid snapshot key")
}

/// Builds a record from field pairs with a fresh identifier.
pub fn record(fields: &[(&str, &str)]) -> Record {
    Record::new(RecordId::generate(), fields.iter().copied())
}

/// Three fruit records with distinct names.
pub fn fruit_records() -> Vec<Record> {
    vec![
        record(&[("name", "Apple"), ("colour", "red"), ("price", "1.00")]),
        record(&[("name", "Banana"), ("colour", "yellow"), ("price", "0.25")]),
        record(&[("name", "Pear"), ("colour", "green"), ("price", "0.50")]),
    ]
}

/// Writes a snapshot in its persisted form.
pub async fn publish_snapshot<S: StorageBackend + ?Sized>(storage: &S, snapshot: &Snapshot) {
    storage
        .put_with_content_type(
            snapshot.key().as_str(),
            snapshot.encode().expect("encode snapshot"),
            WritePrecondition::DoesNotExist,
            "application/json",
        )
        .await
        .expect("publish snapshot");
}

/// Reads and decodes the snapshot stored under `key`.
pub async fn read_snapshot<S: StorageBackend + ?Sized>(storage: &S, key: &SnapshotKey) -> Snapshot {
    let bytes = storage.get(key.as_str()).await.expect("read snapshot");
    Snapshot::decode(key.clone(), &bytes).expect("decode snapshot")
}
