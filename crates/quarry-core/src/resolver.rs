//! Current-snapshot resolution.
//!
//! The current snapshot is never stored as a pointer. It is derived on
//! every call from the keys present in the blob store, so a freshly
//! published snapshot becomes current without coordinating with readers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::snapshot::SnapshotKey;
use crate::storage::StorageBackend;

/// Maps a key prefix to the key of the current snapshot.
#[async_trait]
pub trait SnapshotResolver: Send + Sync + 'static {
    /// Returns the current snapshot key under `prefix`.
    ///
    /// Returns `Error::NoSnapshotFound` if nothing has been published.
    async fn resolve(&self, prefix: &str) -> Result<SnapshotKey>;
}

/// Resolver that lists the store and takes the maximal key.
///
/// Keys under the prefix that are not well-formed snapshot keys (for example
/// `data_backup` next to `data_20240101000000`) are ignored.
#[derive(Clone)]
pub struct ListingResolver {
    storage: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for ListingResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingResolver")
            .field("storage", &"<StorageBackend>")
            .finish()
    }
}

impl ListingResolver {
    /// Creates a resolver over the given store.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl SnapshotResolver for ListingResolver {
    async fn resolve(&self, prefix: &str) -> Result<SnapshotKey> {
        let listing_prefix = SnapshotKey::listing_prefix(prefix);
        let objects = self.storage.list(&listing_prefix).await?;
        let listed = objects.len();

        let current = objects
            .into_iter()
            .filter_map(|meta| match SnapshotKey::parse_with_prefix(&meta.path, prefix) {
                Ok(key) => Some(key),
                Err(e) => {
                    tracing::debug!(path = %meta.path, error = %e, "Skipping non-snapshot key");
                    None
                }
            })
            .max();

        match current {
            Some(key) => {
                tracing::debug!(prefix, listed, current = %key, "Resolved current snapshot");
                Ok(key)
            }
            None => Err(Error::NoSnapshotFound {
                prefix: prefix.to_string(),
            }),
        }
    }
}
