#![no_main]

//! Fuzz target for PerceptualHash::from_hex()
//!
//! Any accepted string must re-encode to its lowercase form.
//!
//! Run with: cargo +nightly fuzz run fuzz_from_hex

use libfuzzer_sys::fuzz_target;
use lookalike_core::PerceptualHash;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(hash) = PerceptualHash::from_hex(text) {
        assert_eq!(hash.to_hex(), text.to_ascii_lowercase());
        assert_eq!(hash.bit_len(), 64);
    }
});
