#![no_main]

//! Fuzz target for HashStore::from_json_slice() and ranking
//!
//! Arbitrary store contents must never panic while parsing or matching;
//! malformed entries are skipped.
//!
//! Run with: cargo +nightly fuzz run fuzz_load_store

use libfuzzer_sys::fuzz_target;
use lookalike_core::{classify, rank, HashStore, PerceptualHash, DEFAULT_TOP_K};

fuzz_target!(|data: &[u8]| {
    let Ok(store) = HashStore::from_json_slice(data) else {
        return;
    };

    let query = PerceptualHash::from_bytes(vec![0u8; 8]);
    let result = rank(&query, &store, DEFAULT_TOP_K);
    assert!(result.ranked.len() <= DEFAULT_TOP_K);
    assert_eq!(result.compared + result.skipped.len(), store.len());
    let _ = classify(&result, 0);
});
