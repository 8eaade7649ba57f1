//! Custom assertion helpers for integration tests.

use crate::storage::StorageOp;

/// Counts `get` operations in a recorded trace.
#[must_use]
pub fn count_gets(ops: &[StorageOp]) -> usize {
    ops.iter()
        .filter(|op| matches!(op, StorageOp::Get { .. }))
        .count()
}

/// Asserts that no write was attempted.
///
/// # Panics
///
/// Panics if the trace contains a put.
pub fn assert_no_writes(ops: &[StorageOp]) {
    let writes: Vec<_> = ops
        .iter()
        .filter(|op| matches!(op, StorageOp::Put { .. }))
        .collect();
    assert!(writes.is_empty(), "Expected no writes, but saw {writes:?}");
}

/// Asserts that exactly one object was written, with a create-only
/// precondition, and returns its path.
///
/// # Panics
///
/// Panics if the trace does not contain exactly one create-only put.
pub fn assert_single_create(ops: &[StorageOp]) -> String {
    let puts: Vec<_> = ops
        .iter()
        .filter_map(|op| match op {
            StorageOp::Put {
                path, precondition, ..
            } => Some((path.clone(), precondition.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(puts.len(), 1, "Expected exactly one put, saw {puts:?}");

    let (path, precondition) = puts.into_iter().next().expect("one put");
    assert_eq!(
        precondition,
        quarry_core::WritePrecondition::DoesNotExist,
        "Expected a create-only write for {path}"
    );
    path
}
