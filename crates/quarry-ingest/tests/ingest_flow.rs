//! End-to-end ingestion runs against recording storage.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use chrono::{TimeZone, Utc};

use quarry_core::{ListingResolver, SnapshotResolver};
use quarry_ingest::{
    HttpSource, IngestError, Ingestor, SNAPSHOT_CONTENT_TYPE, SnapshotPublisher, StaticSource,
};
use quarry_test_utils::{
    FRUIT_CSV, TestContext, assert_no_writes, assert_single_create, fruit_records,
    read_snapshot,
};

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

fn ingestor(ctx: &TestContext, source: Arc<dyn quarry_ingest::DatasetSource>) -> Ingestor {
    let publisher = SnapshotPublisher::new(ctx.storage.clone(), ctx.prefix.clone()).unwrap();
    Ingestor::new(source, publisher)
}

/// One run turns every source row into one record with a unique id and
/// publishes it under a well-formed key.
#[tokio::test]
async fn run_publishes_every_row_once() {
    let ctx = TestContext::new();
    let report = ingestor(&ctx, Arc::new(StaticSource::new(FRUIT_CSV)))
        .run()
        .await
        .unwrap();

    assert_eq!(report.record_count, 3);
    let path = assert_single_create(&ctx.storage.operations());
    assert_eq!(path, report.key.as_str());
    assert_eq!(
        ctx.storage.content_type(&path).as_deref(),
        Some(SNAPSHOT_CONTENT_TYPE)
    );

    let snapshot = read_snapshot(ctx.storage.as_ref(), &report.key).await;
    let names: Vec<_> = snapshot
        .records()
        .iter()
        .map(|r| r.get("name").unwrap())
        .collect();
    assert_eq!(names, vec!["Apple", "Banana", "Pear"]);

    let ids: HashSet<_> = snapshot.records().iter().map(|r| r.id()).collect();
    assert_eq!(ids.len(), 3);
}

/// Scenario: the first run on an empty store becomes the current snapshot.
#[tokio::test]
async fn first_run_becomes_current() {
    let ctx = TestContext::new();
    let report = ingestor(&ctx, Arc::new(StaticSource::new(FRUIT_CSV)))
        .run()
        .await
        .unwrap();

    let resolver = ListingResolver::new(ctx.storage.clone());
    assert_eq!(resolver.resolve(&ctx.prefix).await.unwrap(), report.key);
}

/// A later publication supersedes an earlier one and leaves it intact.
#[tokio::test]
async fn later_publication_supersedes_without_touching_earlier() {
    let ctx = TestContext::new();
    let old = ctx.publish("20240101000000", fruit_records()).await;
    let old_bytes = ctx.storage.stored(old.as_str()).unwrap();

    let publisher = SnapshotPublisher::new(ctx.storage.clone(), ctx.prefix.clone()).unwrap();
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let new = publisher
        .publish_at(quarry_ingest::parse_table(b"name\nKiwi\n").unwrap(), at)
        .await
        .unwrap();

    assert!(new > old);
    let resolver = ListingResolver::new(ctx.storage.clone());
    assert_eq!(resolver.resolve(&ctx.prefix).await.unwrap(), new);
    assert_eq!(ctx.storage.stored(old.as_str()).unwrap(), old_bytes);
}

#[tokio::test]
async fn parse_failure_writes_nothing() {
    let ctx = TestContext::new();
    let err = ingestor(&ctx, Arc::new(StaticSource::new("a,b\n1,2\n3\n")))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Parse { .. }), "{err}");
    assert_no_writes(&ctx.storage.operations());
    assert!(ctx.storage.paths().is_empty());
}

#[tokio::test]
async fn publish_failure_leaves_store_empty() {
    let ctx = TestContext::new();
    ctx.storage.inject_write_failure(format!("{}_", ctx.prefix));

    let err = ingestor(&ctx, Arc::new(StaticSource::new(FRUIT_CSV)))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Publish { .. }), "{err}");
    assert!(ctx.storage.paths().is_empty());
}

#[tokio::test]
async fn header_only_source_publishes_empty_snapshot() {
    let ctx = TestContext::new();
    let report = ingestor(&ctx, Arc::new(StaticSource::new("name,price\n")))
        .run()
        .await
        .unwrap();

    assert_eq!(report.record_count, 0);
    assert_eq!(
        ctx.storage.stored(report.key.as_str()).unwrap().as_ref(),
        b"[]"
    );
}

#[tokio::test]
async fn http_source_feeds_a_run() {
    let base = serve(Router::new().route("/data.csv", get(|| async { FRUIT_CSV }))).await;
    let ctx = TestContext::new();
    let source = HttpSource::new(format!("{base}/data.csv"), Duration::from_secs(5)).unwrap();

    let report = ingestor(&ctx, Arc::new(source)).run().await.unwrap();
    assert_eq!(report.record_count, 3);
}

#[tokio::test]
async fn http_error_status_is_fetch_error_and_writes_nothing() {
    let base = serve(Router::new().route(
        "/data.csv",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
    ))
    .await;
    let ctx = TestContext::new();
    let source = HttpSource::new(format!("{base}/data.csv"), Duration::from_secs(5)).unwrap();

    let err = ingestor(&ctx, Arc::new(source)).run().await.unwrap_err();
    assert!(matches!(err, IngestError::SourceFetch { .. }), "{err}");
    assert!(err.to_string().contains("503"), "{err}");
    assert_no_writes(&ctx.storage.operations());
}

#[tokio::test]
async fn slow_source_times_out() {
    let base = serve(Router::new().route(
        "/data.csv",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            FRUIT_CSV
        }),
    ))
    .await;
    let ctx = TestContext::new();
    let source = HttpSource::new(format!("{base}/data.csv"), Duration::from_millis(200)).unwrap();

    let err = ingestor(&ctx, Arc::new(source)).run().await.unwrap_err();
    assert!(matches!(err, IngestError::SourceFetch { .. }), "{err}");
    assert!(ctx.storage.paths().is_empty());
}
