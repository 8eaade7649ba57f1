//! Basic usage example demonstrating core Quarry concepts.
//!
//! Run with: `cargo run --example basic_usage`

use chrono::Utc;
use quarry_core::error::Result;
use quarry_core::prelude::*;

fn main() -> Result<()> {
    // Build a snapshot key for "now"
    let key = SnapshotKey::new("fruit", Utc::now())?;
    println!("Snapshot key: {key}");

    // Records carry a generated identifier
    let apple = Record::new(RecordId::generate(), [("name", "Apple"), ("price", "1.00")]);
    println!("Apple ID: {}", apple.id());

    let snapshot = Snapshot::new(key, vec![apple]);
    let encoded = snapshot.encode()?;
    println!("Persisted form: {}", String::from_utf8_lossy(&encoded));

    let result = snapshot.lookup(None, MissPolicy::default(), &mut rand::thread_rng())?;
    println!("Random pick ({}): {:?}", result.label(), result.record());

    Ok(())
}
