//! One end-to-end ingestion run: fetch, parse, publish.

use std::fmt;
use std::sync::Arc;

use tracing::Instrument;

use quarry_core::SnapshotKey;
use quarry_core::observability::ingest_span;

use crate::error::Result;
use crate::parse::parse_table;
use crate::publisher::SnapshotPublisher;
use crate::source::DatasetSource;

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Key the snapshot was published under.
    pub key: SnapshotKey,
    /// Number of records in the snapshot.
    pub record_count: usize,
}

impl IngestReport {
    /// Human-readable summary of the run.
    #[must_use]
    pub fn message(&self) -> String {
        format!("ingested {} records into {}", self.record_count, self.key)
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Runs ingestion from one source into one prefix.
pub struct Ingestor {
    source: Arc<dyn DatasetSource>,
    publisher: SnapshotPublisher,
}

impl Ingestor {
    /// Creates an ingestor.
    #[must_use]
    pub fn new(source: Arc<dyn DatasetSource>, publisher: SnapshotPublisher) -> Self {
        Self { source, publisher }
    }

    /// Fetches, parses, and publishes one snapshot.
    ///
    /// Nothing is written unless fetch and parse both succeed.
    ///
    /// # Errors
    ///
    /// Returns the first fetch, parse, or publish error.
    pub async fn run(&self) -> Result<IngestReport> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = ingest_span(&run_id, self.publisher.prefix());

        async {
            tracing::info!(source = %self.source.describe(), "fetching source");
            let bytes = self.source.fetch().await.inspect_err(|e| {
                tracing::error!(error = %e, "source fetch failed");
            })?;

            let records = parse_table(&bytes).inspect_err(|e| {
                tracing::error!(error = %e, bytes = bytes.len(), "source parse failed");
            })?;
            let record_count = records.len();
            if record_count == 0 {
                tracing::warn!("source has a header but no rows; publishing empty snapshot");
            }

            let key = self.publisher.publish(records).await.inspect_err(|e| {
                tracing::error!(error = %e, "snapshot publish failed");
            })?;

            let report = IngestReport { key, record_count };
            tracing::info!(snapshot = %report.key, records = record_count, "ingestion complete");
            Ok(report)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::source::StaticSource;
    use quarry_core::{MemoryBackend, StorageBackend};

    fn ingestor(content: &'static str, backend: Arc<MemoryBackend>) -> Ingestor {
        let publisher = SnapshotPublisher::new(backend, "data").unwrap();
        Ingestor::new(Arc::new(StaticSource::new(content)), publisher)
    }

    #[tokio::test]
    async fn run_publishes_all_rows() {
        let backend = Arc::new(MemoryBackend::new());
        let report = ingestor("name\nApple\nPear\n", backend.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report.record_count, 2);
        assert!(report.key.as_str().starts_with("data_"));
        assert_eq!(
            report.message(),
            format!("ingested 2 records into {}", report.key)
        );
        assert_eq!(backend.list("data_").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn parse_failure_writes_nothing() {
        let backend = Arc::new(MemoryBackend::new());
        let err = ingestor("a,b\n1\n", backend.clone()).run().await.unwrap_err();

        assert!(matches!(err, IngestError::Parse { .. }));
        assert!(backend.list("").await.unwrap().is_empty());
    }
}
