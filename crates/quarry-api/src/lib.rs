//! # quarry-api
//!
//! HTTP query server for Quarry snapshots.
//!
//! Every request resolves the current snapshot for the configured prefix,
//! loads it through the per-instance [`cache::SnapshotCache`], and returns
//! one record: the one matching `id`, or a random one.
//!
//! ## Endpoints
//!
//! ```text
//! HTTP:
//!   GET  /health                 - Health check
//!   GET  /ready                  - Readiness check (storage probe)
//!   GET  /metrics                - Prometheus metrics
//!   GET  /                       - Random record, or ?id=<id>
//!   GET  /records                - Same as /
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use quarry_api::server::Server;
//!
//! let server = Server::builder()
//!     .http_port(8080)
//!     .key_prefix("fruit")
//!     .build();
//!
//! server.serve().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod query;
pub mod routes;
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cache::SnapshotCache;
    pub use crate::config::Config;
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::query::{QueryOutcome, RecordQuery};
    pub use crate::server::Server;
}
