//! Snapshots and their keys.
//!
//! A snapshot is one immutable, published version of the full record
//! collection. It is stored under a [`SnapshotKey`] of the form
//! `<prefix>_<YYYYMMDDHHMMSS>` (UTC, second precision). The timestamp is
//! fixed width, so for a given prefix lexicographic key order is
//! chronological order and the maximal key is the current snapshot.
//!
//! ```text
//! data_20240101000000   <- older
//! data_20240102000000   <- current
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::Record;

/// `strftime` format of the key timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

const TIMESTAMP_WIDTH: usize = 14;

/// Checks that a prefix can be used as a snapshot key namespace.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the prefix is empty or contains `/`.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(Error::InvalidInput("key prefix must not be empty".into()));
    }
    if prefix.contains('/') {
        return Err(Error::InvalidInput(format!(
            "key prefix must not contain '/': {prefix}"
        )));
    }
    Ok(())
}

/// Key of one published snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    raw: String,
    prefix_len: usize,
    published_at: DateTime<Utc>,
}

impl SnapshotKey {
    /// Builds the key for a snapshot published at `at`.
    ///
    /// Sub-second precision is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is invalid or the year does not fit
    /// the fixed-width timestamp.
    pub fn new(prefix: &str, at: DateTime<Utc>) -> Result<Self> {
        validate_prefix(prefix)?;
        Self::parse(&format!("{prefix}_{}", at.format(TIMESTAMP_FORMAT)))
    }

    /// Parses a key of the form `<prefix>_<YYYYMMDDHHMMSS>`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidKey` if the key does not have that shape.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidKey {
            message: format!("'{raw}': {reason}"),
        };

        let (prefix, stamp) = raw
            .rsplit_once('_')
            .ok_or_else(|| invalid("missing '_' separator"))?;
        validate_prefix(prefix).map_err(|_| invalid("invalid prefix"))?;
        if stamp.len() != TIMESTAMP_WIDTH || !stamp.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("timestamp must be 14 digits"));
        }

        let published_at = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
            .map_err(|e| invalid(&e.to_string()))?
            .and_utc();

        Ok(Self {
            raw: raw.to_string(),
            prefix_len: prefix.len(),
            published_at,
        })
    }

    /// Parses a key and checks that it belongs to `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidKey` if the key is malformed or has another prefix.
    pub fn parse_with_prefix(raw: &str, prefix: &str) -> Result<Self> {
        let key = Self::parse(raw)?;
        if key.prefix() != prefix {
            return Err(Error::InvalidKey {
                message: format!("'{raw}' does not belong to prefix '{prefix}'"),
            });
        }
        Ok(key)
    }

    /// The string every key under `prefix` starts with.
    #[must_use]
    pub fn listing_prefix(prefix: &str) -> String {
        format!("{prefix}_")
    }

    /// Returns the full key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the key namespace.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.raw[..self.prefix_len]
    }

    /// Returns the publication time encoded in the key.
    #[must_use]
    pub const fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }
}

impl Ord for SnapshotKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl PartialOrd for SnapshotKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for SnapshotKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// What the query path does when a supplied identifier matches no record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissPolicy {
    /// Serve a random record, as if no identifier had been supplied.
    #[default]
    FallbackRandom,
    /// Report the identifier as not found.
    NotFound,
}

impl FromStr for MissPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback_random" => Ok(Self::FallbackRandom),
            "not_found" => Ok(Self::NotFound),
            _ => Err(Error::InvalidInput(format!(
                "miss policy must be one of: fallback_random, not_found (got {s})"
            ))),
        }
    }
}

/// Outcome of resolving a query against one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    /// The supplied identifier matched this record.
    Found(Record),
    /// No identifier was supplied; this record was chosen at random.
    Random(Record),
    /// The identifier matched nothing and the miss policy chose at random.
    FellBackToRandom(Record),
    /// The identifier matched nothing and the miss policy reports it.
    NotFound,
}

impl LookupResult {
    /// Returns the selected record, if any.
    #[must_use]
    pub const fn record(&self) -> Option<&Record> {
        match self {
            Self::Found(r) | Self::Random(r) | Self::FellBackToRandom(r) => Some(r),
            Self::NotFound => None,
        }
    }

    /// Short label used in response headers and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::Random(_) => "random",
            Self::FellBackToRandom(_) => "fallback",
            Self::NotFound => "not_found",
        }
    }
}

/// An immutable, keyed sequence of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    key: SnapshotKey,
    records: Vec<Record>,
}

impl Snapshot {
    /// Creates a snapshot from records in publication order.
    #[must_use]
    pub fn new(key: SnapshotKey, records: Vec<Record>) -> Self {
        Self { key, records }
    }

    /// Returns the snapshot key.
    #[must_use]
    pub const fn key(&self) -> &SnapshotKey {
        &self.key
    }

    /// Returns the records in publication order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the snapshot has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Encodes the records as the persisted JSON array.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if encoding fails.
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(&self.records)?))
    }

    /// Decodes a persisted JSON array stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the bytes are not a valid record array.
    pub fn decode(key: SnapshotKey, bytes: &[u8]) -> Result<Self> {
        let records: Vec<Record> = serde_json::from_slice(bytes)
            .map_err(|e| Error::serialization(format!("snapshot {key}: {e}")))?;
        Ok(Self { key, records })
    }

    /// Returns the first record whose identifier equals `id`.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id().matches(id))
    }

    /// Picks one record uniformly at random.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptySnapshot` if there is nothing to pick.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&Record> {
        self.records
            .choose(rng)
            .ok_or_else(|| Error::EmptySnapshot {
                key: self.key.to_string(),
            })
    }

    /// Resolves an optional identifier to a record.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptySnapshot` if the snapshot has no records.
    pub fn lookup<R: Rng + ?Sized>(
        &self,
        id: Option<&str>,
        policy: MissPolicy,
        rng: &mut R,
    ) -> Result<LookupResult> {
        if self.is_empty() {
            return Err(Error::EmptySnapshot {
                key: self.key.to_string(),
            });
        }

        let Some(id) = id else {
            return Ok(LookupResult::Random(self.choose(rng)?.clone()));
        };

        if let Some(record) = self.find(id) {
            return Ok(LookupResult::Found(record.clone()));
        }

        match policy {
            MissPolicy::FallbackRandom => {
                Ok(LookupResult::FellBackToRandom(self.choose(rng)?.clone()))
            }
            MissPolicy::NotFound => Ok(LookupResult::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::RecordId;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn key(raw: &str) -> SnapshotKey {
        SnapshotKey::parse(raw).unwrap()
    }

    fn fruit(name: &str, price: &str) -> Record {
        Record::new(RecordId::generate(), [("name", name), ("price", price)])
    }

    fn three_fruits() -> Snapshot {
        Snapshot::new(
            key("data_20240101000000"),
            vec![
                fruit("Apple", "1.00"),
                fruit("Banana", "0.50"),
                fruit("Cherry", "3.00"),
            ],
        )
    }

    #[test]
    fn key_formats_utc_seconds() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let k = SnapshotKey::new("data", at).unwrap();
        assert_eq!(k.as_str(), "data_20240102030405");
        assert_eq!(k.prefix(), "data");
        assert_eq!(k.published_at(), at);
    }

    #[test]
    fn key_drops_subsecond_precision() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
            + chrono::Duration::milliseconds(999);
        let k = SnapshotKey::new("data", at).unwrap();
        assert_eq!(k.as_str(), "data_20240102030405");
    }

    #[test]
    fn key_prefix_may_contain_underscore() {
        let k = key("daily_prices_20240101000000");
        assert_eq!(k.prefix(), "daily_prices");
    }

    #[test]
    fn key_rejects_malformed_input() {
        for raw in [
            "data",
            "data_2024",
            "data_2024010100000x",
            "data_202401010000000",
            "_20240101000000",
            "data_20241301000000",
            "a/b_20240101000000",
        ] {
            assert!(SnapshotKey::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn key_prefix_mismatch_rejected() {
        let err = SnapshotKey::parse_with_prefix("database_20240101000000", "data").unwrap_err();
        assert!(matches!(err, Error::InvalidKey { .. }));
    }

    #[test]
    fn key_order_is_chronological() {
        assert!(key("data_20240101000000") < key("data_20240102000000"));
        assert!(key("data_20231231235959") < key("data_20240101000000"));
    }

    #[test]
    fn miss_policy_parses() {
        assert_eq!(
            "fallback_random".parse::<MissPolicy>().unwrap(),
            MissPolicy::FallbackRandom
        );
        assert_eq!("NOT_FOUND".parse::<MissPolicy>().unwrap(), MissPolicy::NotFound);
        assert!("strict".parse::<MissPolicy>().is_err());
    }

    #[test]
    fn encode_decode_preserves_records() {
        let snapshot = three_fruits();
        let bytes = snapshot.encode().unwrap();
        let decoded = Snapshot::decode(snapshot.key().clone(), &bytes).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn decode_rejects_non_array() {
        let err = Snapshot::decode(key("data_20240101000000"), br#"{"id":"x"}"#).unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn lookup_finds_every_record_by_id() {
        let snapshot = three_fruits();
        let mut rng = StdRng::seed_from_u64(7);
        for record in snapshot.records() {
            let id = record.id().to_string();
            let result = snapshot
                .lookup(Some(&id), MissPolicy::FallbackRandom, &mut rng)
                .unwrap();
            assert_eq!(result, LookupResult::Found(record.clone()));
        }
    }

    #[test]
    fn lookup_without_id_is_random_member() {
        let snapshot = three_fruits();
        let mut rng = StdRng::seed_from_u64(11);
        let result = snapshot
            .lookup(None, MissPolicy::FallbackRandom, &mut rng)
            .unwrap();
        let LookupResult::Random(record) = result else {
            panic!("expected random result, got {result:?}");
        };
        assert!(snapshot.records().contains(&record));
    }

    #[test]
    fn lookup_unknown_id_falls_back_by_default() {
        let snapshot = three_fruits();
        let mut rng = StdRng::seed_from_u64(3);
        let result = snapshot
            .lookup(Some("nonexistent"), MissPolicy::default(), &mut rng)
            .unwrap();
        let LookupResult::FellBackToRandom(record) = result else {
            panic!("expected fallback result, got {result:?}");
        };
        assert!(snapshot.records().contains(&record));
    }

    #[test]
    fn lookup_unknown_id_reports_not_found_when_configured() {
        let snapshot = three_fruits();
        let mut rng = StdRng::seed_from_u64(3);
        let result = snapshot
            .lookup(Some("nonexistent"), MissPolicy::NotFound, &mut rng)
            .unwrap();
        assert_eq!(result, LookupResult::NotFound);
        assert!(result.record().is_none());
    }

    #[test]
    fn lookup_on_empty_snapshot_is_an_error_not_a_panic() {
        let snapshot = Snapshot::new(key("data_20240101000000"), Vec::new());
        let mut rng = StdRng::seed_from_u64(1);
        for id in [None, Some("nonexistent")] {
            let err = snapshot
                .lookup(id, MissPolicy::FallbackRandom, &mut rng)
                .unwrap_err();
            assert!(matches!(err, Error::EmptySnapshot { .. }));
        }
    }

    #[test]
    fn random_choice_reaches_every_record() {
        let snapshot = three_fruits();
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(snapshot.choose(&mut rng).unwrap().id());
        }
        assert_eq!(seen.len(), 3);
    }
}
