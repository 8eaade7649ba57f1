//! Record queries against the current snapshot.

use std::sync::Arc;

use rand::Rng;
use tracing::Instrument;

use quarry_core::observability::query_span;
use quarry_core::{LookupResult, MissPolicy, Result, SnapshotKey, SnapshotResolver};

use crate::cache::SnapshotCache;
use crate::metrics::record_lookup;

/// Result of one query: the snapshot consulted and the lookup outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    /// Key of the snapshot the query was answered from.
    pub key: SnapshotKey,
    /// What the lookup produced.
    pub result: LookupResult,
}

/// Resolves the current snapshot and looks up one record.
#[derive(Clone)]
pub struct RecordQuery {
    resolver: Arc<dyn SnapshotResolver>,
    cache: Arc<SnapshotCache>,
    prefix: String,
    policy: MissPolicy,
}

impl std::fmt::Debug for RecordQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordQuery")
            .field("prefix", &self.prefix)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RecordQuery {
    /// Creates a query over `prefix`.
    #[must_use]
    pub fn new(
        resolver: Arc<dyn SnapshotResolver>,
        cache: Arc<SnapshotCache>,
        prefix: impl Into<String>,
        policy: MissPolicy,
    ) -> Self {
        Self {
            resolver,
            cache,
            prefix: prefix.into(),
            policy,
        }
    }

    /// Answers a query with the thread-local random generator.
    ///
    /// # Errors
    ///
    /// Returns `NoSnapshotFound` when nothing is published, `EmptySnapshot`
    /// when the current snapshot has no records, or a storage error.
    pub async fn execute(&self, id: Option<&str>) -> Result<QueryOutcome> {
        let snapshot = self.current(id.is_some()).await?;
        let result = snapshot.lookup(id, self.policy, &mut rand::thread_rng())?;
        Ok(finish(snapshot.key().clone(), result))
    }

    /// Answers a query with a caller-supplied random generator.
    ///
    /// # Errors
    ///
    /// Same as [`RecordQuery::execute`].
    pub async fn execute_with_rng<R: Rng + Send>(
        &self,
        id: Option<&str>,
        rng: &mut R,
    ) -> Result<QueryOutcome> {
        let snapshot = self.current(id.is_some()).await?;
        let result = snapshot.lookup(id, self.policy, rng)?;
        Ok(finish(snapshot.key().clone(), result))
    }

    async fn current(&self, has_id: bool) -> Result<Arc<quarry_core::Snapshot>> {
        let span = query_span(&self.prefix, has_id);
        async {
            let key = self.resolver.resolve(&self.prefix).await?;
            tracing::Span::current().record("snapshot", key.as_str());
            self.cache.load(&key).await
        }
        .instrument(span)
        .await
    }
}

fn finish(key: SnapshotKey, result: LookupResult) -> QueryOutcome {
    record_lookup(result.label());
    tracing::debug!(snapshot = %key, outcome = result.label(), "lookup complete");
    QueryOutcome { key, result }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::{ListingResolver, MemoryBackend, Record, RecordId, Snapshot, StorageBackend, WritePrecondition};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    async fn query_over(records: Vec<Record>, policy: MissPolicy) -> RecordQuery {
        let backend = Arc::new(MemoryBackend::new());
        let key = SnapshotKey::parse("data_20240101000000").unwrap();
        let snapshot = Snapshot::new(key.clone(), records);
        backend
            .put(key.as_str(), snapshot.encode().unwrap(), WritePrecondition::DoesNotExist)
            .await
            .unwrap();
        let resolver = Arc::new(ListingResolver::new(backend.clone()));
        let cache = Arc::new(SnapshotCache::new(backend));
        RecordQuery::new(resolver, cache, "data", policy)
    }

    #[tokio::test]
    async fn found_by_id() {
        let apple = Record::new(RecordId::generate(), [("name", "Apple")]);
        let pear = Record::new(RecordId::generate(), [("name", "Pear")]);
        let query = query_over(vec![apple, pear.clone()], MissPolicy::FallbackRandom).await;

        let outcome = query.execute(Some(&pear.id().to_string())).await.unwrap();
        assert_eq!(outcome.result, LookupResult::Found(pear));
        assert_eq!(outcome.key.as_str(), "data_20240101000000");
    }

    #[tokio::test]
    async fn not_found_policy_reports_miss() {
        let apple = Record::new(RecordId::generate(), [("name", "Apple")]);
        let query = query_over(vec![apple], MissPolicy::NotFound).await;

        let outcome = query.execute(Some("nope")).await.unwrap();
        assert_eq!(outcome.result, LookupResult::NotFound);
    }

    #[tokio::test]
    async fn seeded_rng_is_deterministic() {
        let records: Vec<_> = (0..10)
            .map(|i| Record::new(RecordId::generate(), [("n", i.to_string())]))
            .collect();
        let query = query_over(records, MissPolicy::FallbackRandom).await;

        let a = query
            .execute_with_rng(None, &mut StdRng::seed_from_u64(7))
            .await
            .unwrap();
        let b = query
            .execute_with_rng(None, &mut StdRng::seed_from_u64(7))
            .await
            .unwrap();
        assert_eq!(a, b);
        assert!(matches!(a.result, LookupResult::Random(_)));
    }

    #[tokio::test]
    async fn empty_store_is_no_snapshot() {
        let backend = Arc::new(MemoryBackend::new());
        let query = RecordQuery::new(
            Arc::new(ListingResolver::new(backend.clone())),
            Arc::new(SnapshotCache::new(backend)),
            "data",
            MissPolicy::FallbackRandom,
        );
        let err = query.execute(None).await.unwrap_err();
        assert!(matches!(err, quarry_core::Error::NoSnapshotFound { .. }));
    }
}
