//! Storage backend abstraction for the snapshot blob store.
//!
//! The contract is the small subset of object storage that snapshot
//! publishing and serving need:
//! - Whole-object reads
//! - Conditional writes (snapshots are written with `DoesNotExist`)
//! - Listing by *string* prefix
//! - Metadata probes for readiness checks
//!
//! ## Prefix semantics
//!
//! `list("data_")` returns every key that starts with `data_`, on every
//! backend. Cloud SDKs list by path segment (`data_` would only match
//! `data_/...`); [`ObjectStoreBackend`] lists the enclosing directory and
//! filters so callers never see that difference.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use object_store::aws::{AmazonS3Builder, S3ConditionalPut};
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::prefix::PrefixStore;
use object_store::{
    Attribute, Attributes, ObjectStore, PutMode, PutOptions, PutPayload,
};

use crate::error::{Error, Result};

/// Precondition for conditional writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WritePrecondition {
    /// Write only if object does not exist.
    DoesNotExist,
    /// Write unconditionally.
    None,
}

/// Result of a conditional write.
#[derive(Debug, Clone)]
pub enum WriteResult {
    /// Write succeeded, returns new version token.
    Success {
        /// The new version token after the write.
        version: String,
    },
    /// Precondition failed, returns current version token.
    PreconditionFailed {
        /// The current version that caused the precondition to fail.
        current_version: String,
    },
}

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Object path (key).
    pub path: String,
    /// Object size in bytes.
    pub size: u64,
    /// Opaque version token (`ETag`, generation or counter).
    pub version: String,
    /// Last modification timestamp.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Storage backend trait for the snapshot blob store.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Reads entire object.
    ///
    /// Returns `Error::NotFound` if object doesn't exist.
    async fn get(&self, path: &str) -> Result<Bytes>;

    /// Writes with optional precondition.
    ///
    /// Returns `WriteResult::PreconditionFailed` if precondition not met.
    /// Never returns error for precondition failure - that's a normal result.
    async fn put(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> Result<WriteResult>;

    /// Writes with a content type recorded alongside the object.
    ///
    /// Backends without object attributes ignore the content type.
    async fn put_with_content_type(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
        content_type: &str,
    ) -> Result<WriteResult> {
        let _ = content_type;
        self.put(path, data, precondition).await
    }

    /// Lists objects whose key starts with `prefix`.
    ///
    /// Returns empty vec if no objects match. Order is unspecified.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>>;

    /// Gets object metadata without reading content.
    ///
    /// Returns `None` if object doesn't exist.
    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>>;
}

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory storage backend for tests and local development.
///
/// Thread-safe via `RwLock`. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    version: i64,
    content_type: Option<String>,
    last_modified: DateTime<Utc>,
}

impl StoredObject {
    fn meta(&self, path: &str) -> ObjectMeta {
        ObjectMeta {
            path: path.to_string(),
            size: self.data.len() as u64,
            version: self.version.to_string(),
            last_modified: Some(self.last_modified),
        }
    }
}

impl MemoryBackend {
    /// Creates a new empty memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the content type recorded for an object.
    #[must_use]
    pub fn content_type(&self, path: &str) -> Option<String> {
        self.objects
            .read()
            .ok()?
            .get(path)
            .and_then(|o| o.content_type.clone())
    }

    fn write(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
        content_type: Option<&str>,
    ) -> Result<WriteResult> {
        let mut objects = self.objects.write().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        let current = objects.get(path);

        match precondition {
            WritePrecondition::DoesNotExist => {
                if let Some(obj) = current {
                    return Ok(WriteResult::PreconditionFailed {
                        current_version: obj.version.to_string(),
                    });
                }
            }
            WritePrecondition::None => {}
        }

        let new_version = current.map_or(1, |o| o.version + 1);
        objects.insert(
            path.to_string(),
            StoredObject {
                data,
                version: new_version,
                content_type: content_type.map(str::to_string),
                last_modified: Utc::now(),
            },
        );
        drop(objects);

        Ok(WriteResult::Success {
            version: new_version.to_string(),
        })
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        objects
            .get(path)
            .map(|o| o.data.clone())
            .ok_or_else(|| Error::NotFound(format!("object not found: {path}")))
    }

    async fn put(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> Result<WriteResult> {
        self.write(path, data, precondition, None)
    }

    async fn put_with_content_type(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
        content_type: &str,
    ) -> Result<WriteResult> {
        self.write(path, data, precondition, Some(content_type))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        Ok(objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(path, obj)| obj.meta(path))
            .collect())
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        Ok(objects.get(path).map(|obj| obj.meta(path)))
    }
}

// ============================================================================
// ObjectStoreBackend
// ============================================================================

/// Storage backend over the `object_store` crate.
///
/// Supported locations:
/// - `s3://bucket[/root]` (credentials from the standard `AWS_*` environment)
/// - `gs://bucket[/root]` (credentials from the standard `GOOGLE_*` environment)
/// - `file:///absolute/dir` (created if missing)
/// - `memory://` (process-local, for development)
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
    location: String,
    supports_attributes: bool,
}

impl std::fmt::Debug for ObjectStoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreBackend")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl ObjectStoreBackend {
    /// Builds a backend from a location URL.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for unsupported schemes or a missing
    /// bucket, and `Error::Storage` if the client cannot be constructed.
    pub fn from_location(location: &str) -> Result<Self> {
        let location = location.trim();
        let (scheme, rest) = location.split_once("://").ok_or_else(|| {
            Error::InvalidInput(format!(
                "storage location must be a URL like s3://bucket (got {location})"
            ))
        })?;

        let (store, supports_attributes): (Arc<dyn ObjectStore>, bool) =
            match scheme.to_ascii_lowercase().as_str() {
                "s3" | "s3a" => {
                    let (bucket, root) = split_bucket(location, rest)?;
                    let s3 = s3_builder(bucket)
                        .build()
                        .map_err(|e| Error::storage_with_source("failed to build S3 client", e))?;
                    (scoped(s3, root), true)
                }
                "gs" | "gcs" => {
                    let (bucket, root) = split_bucket(location, rest)?;
                    let gcs = GoogleCloudStorageBuilder::from_env()
                        .with_bucket_name(bucket)
                        .build()
                        .map_err(|e| Error::storage_with_source("failed to build GCS client", e))?;
                    (scoped(gcs, root), true)
                }
                "file" => {
                    if !rest.starts_with('/') {
                        return Err(Error::InvalidInput(format!(
                            "file storage location must be absolute (got {location})"
                        )));
                    }
                    std::fs::create_dir_all(rest).map_err(|e| {
                        Error::storage_with_source(format!("failed to create {rest}"), e)
                    })?;
                    let local = LocalFileSystem::new_with_prefix(rest).map_err(|e| {
                        Error::storage_with_source(format!("failed to open {rest}"), e)
                    })?;
                    // Local files carry no object attributes.
                    (Arc::new(local), false)
                }
                "memory" => (Arc::new(InMemory::new()), true),
                other => {
                    return Err(Error::InvalidInput(format!(
                        "unsupported storage scheme '{other}' (expected s3, gs, file or memory)"
                    )));
                }
            };

        Ok(Self {
            store,
            location: location.to_string(),
            supports_attributes,
        })
    }

    /// Returns the location this backend was built from.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    async fn put_opts(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
        content_type: Option<&str>,
    ) -> Result<WriteResult> {
        let location = parse_path(path)?;
        let mode = match precondition {
            WritePrecondition::DoesNotExist => PutMode::Create,
            WritePrecondition::None => PutMode::Overwrite,
        };

        let mut attributes = Attributes::new();
        if let (Some(content_type), true) = (content_type, self.supports_attributes) {
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
        }
        let opts = PutOptions {
            mode,
            attributes,
            ..PutOptions::default()
        };

        match self
            .store
            .put_opts(&location, PutPayload::from(data), opts)
            .await
        {
            Ok(result) => Ok(WriteResult::Success {
                version: result
                    .e_tag
                    .or(result.version)
                    .unwrap_or_else(|| "unknown".to_string()),
            }),
            Err(
                object_store::Error::AlreadyExists { .. }
                | object_store::Error::Precondition { .. },
            ) => {
                let current_version = self
                    .head(path)
                    .await?
                    .map_or_else(|| "0".to_string(), |meta| meta.version);
                Ok(WriteResult::PreconditionFailed { current_version })
            }
            Err(e) => Err(Error::storage_with_source(format!("put {path} failed"), e)),
        }
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let location = parse_path(path)?;
        let result = match self.store.get(&location).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(Error::NotFound(format!("object not found: {path}")));
            }
            Err(e) => return Err(Error::storage_with_source(format!("get {path} failed"), e)),
        };
        result
            .bytes()
            .await
            .map_err(|e| Error::storage_with_source(format!("read {path} failed"), e))
    }

    async fn put(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> Result<WriteResult> {
        self.put_opts(path, data, precondition, None).await
    }

    async fn put_with_content_type(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
        content_type: &str,
    ) -> Result<WriteResult> {
        self.put_opts(path, data, precondition, Some(content_type))
            .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let dir = prefix.rsplit_once('/').map_or("", |(dir, _)| dir);
        let dir = if dir.is_empty() {
            None
        } else {
            Some(parse_path(dir)?)
        };

        let listed: Vec<object_store::ObjectMeta> = self
            .store
            .list(dir.as_ref())
            .try_collect()
            .await
            .map_err(|e| Error::storage_with_source(format!("list {prefix} failed"), e))?;

        Ok(listed
            .into_iter()
            .filter(|meta| meta.location.as_ref().starts_with(prefix))
            .map(convert_meta)
            .collect())
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        let location = parse_path(path)?;
        match self.store.head(&location).await {
            Ok(meta) => Ok(Some(convert_meta(meta))),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(Error::storage_with_source(format!("head {path} failed"), e)),
        }
    }
}

/// Opens the backend for a configured storage location.
///
/// `memory://` is process-local and only accepted when `allow_memory` is set.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the location is unsupported or is
/// `memory://` without `allow_memory`.
pub fn open_storage(location: &str, allow_memory: bool) -> Result<Arc<dyn StorageBackend>> {
    if location.trim().to_ascii_lowercase().starts_with("memory://") {
        if !allow_memory {
            return Err(Error::InvalidInput(
                "memory:// storage is only allowed in debug mode".into(),
            ));
        }
        tracing::warn!("using in-memory storage backend (debug only)");
        return Ok(Arc::new(MemoryBackend::new()));
    }

    let backend = ObjectStoreBackend::from_location(location)?;
    tracing::info!(location = %backend.location(), "using object storage backend");
    Ok(Arc::new(backend))
}

/// S3 rejects create-only writes unless conditional put is enabled; snapshot
/// publication relies on `If-None-Match: *`.
fn s3_builder(bucket: &str) -> AmazonS3Builder {
    AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .with_conditional_put(S3ConditionalPut::ETagMatch)
}

fn scoped<T: ObjectStore>(store: T, root: &str) -> Arc<dyn ObjectStore> {
    if root.is_empty() {
        Arc::new(store)
    } else {
        Arc::new(PrefixStore::new(store, root))
    }
}

fn split_bucket<'a>(location: &str, rest: &'a str) -> Result<(&'a str, &'a str)> {
    let rest = rest.trim_end_matches('/');
    let (bucket, root) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return Err(Error::InvalidInput(format!(
            "storage location is missing a bucket name (got {location})"
        )));
    }
    Ok((bucket, root))
}

fn parse_path(path: &str) -> Result<Path> {
    Path::parse(path).map_err(|e| Error::InvalidInput(format!("invalid object path '{path}': {e}")))
}

fn convert_meta(meta: object_store::ObjectMeta) -> ObjectMeta {
    ObjectMeta {
        path: meta.location.to_string(),
        size: u64::try_from(meta.size).unwrap_or(u64::MAX),
        version: meta
            .e_tag
            .or(meta.version)
            .unwrap_or_else(|| meta.last_modified.timestamp_millis().to_string()),
        last_modified: Some(meta.last_modified),
    }
}
