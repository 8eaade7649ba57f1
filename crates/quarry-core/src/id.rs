//! Record identifiers.
//!
//! Every record receives a [`RecordId`] exactly once, when the ingestor
//! builds it from a source row. Identifiers are:
//! - **Random**: 128-bit UUID v4, no coordination with earlier snapshots
//! - **Stable**: persisted with the record, never recomputed on read
//! - **Canonical**: always rendered as lowercase hyphenated text
//!
//! # Example
//!
//! ```rust
//! use quarry_core::id::RecordId;
//!
//! let id = RecordId::generate();
//! let parsed: RecordId = id.to_string().parse().unwrap();
//! assert_eq!(id, parsed);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A unique identifier for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generates a new random record ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `candidate` is the textual form of this ID.
    ///
    /// Comparison is against the canonical lowercase hyphenated form, so
    /// an uppercase or braced spelling of the same UUID does not match.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        let mut buf = Uuid::encode_buffer();
        self.0.hyphenated().encode_lower(&mut buf) == candidate
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s).map(Self).map_err(|e| Error::InvalidId {
            message: format!("invalid record ID '{s}': {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_roundtrip() {
        let id = RecordId::generate();
        let s = id.to_string();
        let parsed: RecordId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ids_are_unique() {
        let id1 = RecordId::generate();
        let id2 = RecordId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn generated_ids_are_v4() {
        assert_eq!(RecordId::generate().as_uuid().get_version_num(), 4);
    }

    #[test]
    fn invalid_id_returns_error() {
        let result: Result<RecordId> = "not-a-uuid".parse();
        assert!(matches!(result, Err(Error::InvalidId { .. })));
    }

    #[test]
    fn matches_only_canonical_form() {
        let id: RecordId = "6f1c2b7e-9a3d-4c1e-8f2a-b5d4e3c2a1f0".parse().unwrap();
        assert!(id.matches("6f1c2b7e-9a3d-4c1e-8f2a-b5d4e3c2a1f0"));
        assert!(!id.matches("6F1C2B7E-9A3D-4C1E-8F2A-B5D4E3C2A1F0"));
        assert!(!id.matches("nonexistent"));
    }
}
