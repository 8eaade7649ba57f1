//! # quarry-core
//!
//! Shared model for the Quarry snapshot ingestor and query server.
//!
//! This crate provides the types both components agree on:
//!
//! - **Records**: typed rows with a generated [`RecordId`]
//! - **Snapshots**: immutable record collections under time-ordered keys
//! - **Resolution**: mapping a key prefix to the current snapshot
//! - **Storage Traits**: the blob-store seam and its backends
//! - **Configuration and Logging**: env loading and `tracing` setup
//!
//! ## Example
//!
//! ```rust
//! use quarry_core::prelude::*;
//!
//! let record = Record::new(RecordId::generate(), [("name", "Apple")]);
//! assert_eq!(record.get("name"), Some("Apple"));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod id;
pub mod observability;
pub mod record;
pub mod resolver;
pub mod snapshot;
pub mod storage;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::RecordId;
    pub use crate::record::Record;
    pub use crate::resolver::{ListingResolver, SnapshotResolver};
    pub use crate::snapshot::{LookupResult, MissPolicy, Snapshot, SnapshotKey};
    pub use crate::storage::{
        MemoryBackend, ObjectMeta, ObjectStoreBackend, StorageBackend, WritePrecondition,
        WriteResult,
    };
}

pub use config::{EnvVars, SnapshotSettings};
pub use error::{Error, Result};
pub use id::RecordId;
pub use observability::{LogFormat, init_logging};
pub use record::Record;
pub use resolver::{ListingResolver, SnapshotResolver};
pub use snapshot::{LookupResult, MissPolicy, Snapshot, SnapshotKey};
pub use storage::{
    MemoryBackend, ObjectMeta, ObjectStoreBackend, StorageBackend, WritePrecondition, WriteResult,
    open_storage,
};
