//! Example demonstrating indexing with tracing instrumentation.
//!
//! Run with: cargo run -p lookalike-core --example index_tracing -- <DATASET_DIR>

use std::path::PathBuf;

use lookalike_core::{Indexer, MatchConfig, MatchResponse, Matcher, SharedStore};
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    // Initialize tracing subscriber with debug level
    fmt()
        .with_env_filter(EnvFilter::new("lookalike_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let Some(dataset) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: index_tracing <DATASET_DIR>");
        return;
    };

    println!("=== Lookalike Indexing Demo ===\n");

    let indexer = Indexer::default();
    let report = match indexer.build(&dataset) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Failed to index {}: {}", dataset.display(), e);
            return;
        }
    };

    println!("\nHashed {} images, skipped {}\n", report.hashed(), report.skipped.len());
    for skipped in &report.skipped {
        println!("  skipped {}: {}", skipped.path.display(), skipped.reason);
    }

    // Decode once, then query every entry against the store it belongs to
    let shared = SharedStore::new(&report.store, indexer.hasher().bit_len());
    let snapshot = shared.snapshot();
    let matcher = Matcher::new(MatchConfig::default()).expect("default config is valid");
    for entry in &snapshot.entries {
        let (identifier, query) = (&entry.identifier, &entry.hash);
        let (_, outcome) = matcher.match_snapshot(query, &snapshot);
        let response = MatchResponse::new(&outcome, None);
        println!(
            "{identifier}: {}",
            serde_json::to_string(&response).unwrap_or_default()
        );
    }
}
