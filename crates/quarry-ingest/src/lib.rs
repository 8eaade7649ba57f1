//! # quarry-ingest
//!
//! The Quarry ingestor: fetches the source table over HTTP, assigns every
//! row a fresh identifier, and publishes the result as a new immutable
//! snapshot under `<prefix>_<YYYYMMDDHHMMSS>`.
//!
//! Each invocation is one run. Any failure aborts the run before the blob
//! store is touched.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use quarry_core::MemoryBackend;
//! use quarry_ingest::{Ingestor, SnapshotPublisher, StaticSource};
//!
//! # async fn example() -> quarry_ingest::Result<()> {
//! let publisher = SnapshotPublisher::new(Arc::new(MemoryBackend::new()), "fruit")?;
//! let source = Arc::new(StaticSource::new("name\nApple\n"));
//! let report = Ingestor::new(source, publisher).run().await?;
//! println!("{}", report.message());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod ingestor;
pub mod parse;
pub mod publisher;
pub mod source;

pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use ingestor::{IngestReport, Ingestor};
pub use parse::parse_table;
pub use publisher::{SNAPSHOT_CONTENT_TYPE, SnapshotPublisher};
pub use source::{DatasetSource, HttpSource, StaticSource};
