//! Shared test utilities for Quarry integration tests.
//!
//! This crate provides:
//! - [`TracingMemoryBackend`]: In-memory storage with operation recording
//!   and failure injection
//! - [`TestContext`]: Pre-configured storage and key prefix
//! - Fixture functions for records and published snapshots
//! - Assertion helpers over recorded storage operations
//!
//! # Example
//!
//! ```rust,ignore
//! use quarry_test_utils::{TestContext, fruit_records};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let ctx = TestContext::new();
//!     let key = ctx.publish("20240101000000", fruit_records()).await;
//!     // ... run test ...
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod fixtures;
pub mod storage;

pub use assertions::*;
pub use fixtures::*;
pub use storage::*;
