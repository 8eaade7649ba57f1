//! In-memory snapshot cache.
//!
//! One slot per server instance holding the most recently loaded snapshot.
//! The current key is resolved on every request; only the decoded payload
//! is reused, and only when its key equals the resolved key.

use std::sync::Arc;

use tokio::sync::RwLock;

use quarry_core::{Result, Snapshot, SnapshotKey, StorageBackend};

use crate::metrics::{record_cache_hit, record_cache_miss};

/// Holds the most recently loaded snapshot.
pub struct SnapshotCache {
    storage: Arc<dyn StorageBackend>,
    slot: RwLock<Option<Arc<Snapshot>>>,
}

impl std::fmt::Debug for SnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("storage", &"<StorageBackend>")
            .finish_non_exhaustive()
    }
}

impl SnapshotCache {
    /// Creates an empty cache reading from `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            slot: RwLock::new(None),
        }
    }

    /// Returns the key of the cached snapshot, if any.
    pub async fn cached_key(&self) -> Option<SnapshotKey> {
        self.slot.read().await.as_ref().map(|s| s.key().clone())
    }

    /// Returns the snapshot for `key`, loading it on a miss.
    ///
    /// The returned snapshot always has exactly `key`. A loaded snapshot
    /// replaces the slot unless the slot already holds a newer key.
    ///
    /// # Errors
    ///
    /// Returns an error if the object cannot be read or decoded.
    pub async fn load(&self, key: &SnapshotKey) -> Result<Arc<Snapshot>> {
        if let Some(hit) = self.hit(key).await {
            record_cache_hit();
            return Ok(hit);
        }

        record_cache_miss();
        let bytes = self.storage.get(key.as_str()).await?;
        let snapshot = Arc::new(Snapshot::decode(key.clone(), &bytes)?);
        tracing::info!(
            snapshot = %key,
            records = snapshot.len(),
            bytes = bytes.len(),
            "loaded snapshot"
        );

        let mut slot = self.slot.write().await;
        match slot.as_ref() {
            Some(current) if current.key() > key => {
                tracing::debug!(
                    cached = %current.key(),
                    loaded = %key,
                    "keeping newer cached snapshot"
                );
            }
            _ => *slot = Some(Arc::clone(&snapshot)),
        }

        Ok(snapshot)
    }

    async fn hit(&self, key: &SnapshotKey) -> Option<Arc<Snapshot>> {
        self.slot
            .read()
            .await
            .as_ref()
            .filter(|s| s.key() == key)
            .map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use quarry_core::{MemoryBackend, Record, RecordId, WritePrecondition};

    async fn store_with(keys: &[&str]) -> Arc<MemoryBackend> {
        let backend = Arc::new(MemoryBackend::new());
        for raw in keys {
            let key = SnapshotKey::parse(raw).unwrap();
            let snapshot = Snapshot::new(
                key,
                vec![Record::new(RecordId::generate(), [("name", *raw)])],
            );
            backend
                .put(raw, snapshot.encode().unwrap(), WritePrecondition::DoesNotExist)
                .await
                .unwrap();
        }
        backend
    }

    #[tokio::test]
    async fn miss_loads_and_fills_slot() {
        let cache = SnapshotCache::new(store_with(&["data_20240101000000"]).await);
        let key = SnapshotKey::parse("data_20240101000000").unwrap();

        assert!(cache.cached_key().await.is_none());
        let snapshot = cache.load(&key).await.unwrap();
        assert_eq!(snapshot.key(), &key);
        assert_eq!(cache.cached_key().await, Some(key));
    }

    #[tokio::test]
    async fn hit_returns_same_allocation() {
        let cache = SnapshotCache::new(store_with(&["data_20240101000000"]).await);
        let key = SnapshotKey::parse("data_20240101000000").unwrap();

        let first = cache.load(&key).await.unwrap();
        let second = cache.load(&key).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn older_load_does_not_replace_newer_slot() {
        let cache = SnapshotCache::new(
            store_with(&["data_20240101000000", "data_20240102000000"]).await,
        );
        let old = SnapshotKey::parse("data_20240101000000").unwrap();
        let new = SnapshotKey::parse("data_20240102000000").unwrap();

        cache.load(&new).await.unwrap();
        let loaded = cache.load(&old).await.unwrap();

        assert_eq!(loaded.key(), &old);
        assert_eq!(cache.cached_key().await, Some(new));
    }

    #[tokio::test]
    async fn corrupt_object_is_an_error() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .put(
                "data_20240101000000",
                Bytes::from("not json"),
                WritePrecondition::None,
            )
            .await
            .unwrap();
        let cache = SnapshotCache::new(backend);
        let key = SnapshotKey::parse("data_20240101000000").unwrap();

        assert!(cache.load(&key).await.is_err());
        assert!(cache.cached_key().await.is_none());
    }
}
