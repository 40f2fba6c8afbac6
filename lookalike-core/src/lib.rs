//! Lookalike Core - perceptual image matching against a reference set
//!
//! This crate decides whether a submitted image is the same picture (up to
//! resizing and recompression) as one of a fixed set of dataset images, by
//! comparing 64-bit DCT perceptual hashes instead of pixels.
//!
//! # Components
//!
//! - [`phash`]: hash computation and the canonical hex form
//! - [`store`]: the persisted identifier to hash mapping
//! - [`matcher`]: ranking by Hamming distance and threshold classification
//! - [`indexer`]: building a store from a dataset directory
//!
//! # Example
//!
//! ```no_run
//! use lookalike_core::{
//!     HashStore, Indexer, MatchConfig, Matcher, PerceptualHasher, SharedStore,
//! };
//! use std::path::Path;
//!
//! # fn example() -> lookalike_core::Result<()> {
//! // Offline: index the dataset and persist the hashes
//! let report = Indexer::default().build(Path::new("dataset"))?;
//! report.store.save(Path::new("hashes.json"))?;
//!
//! // Query time: decode the store once, then match uploads against it
//! let hasher = PerceptualHasher::default();
//! let shared = SharedStore::new(&HashStore::load(Path::new("hashes.json"))?, hasher.bit_len());
//! let query = hasher.hash_path(Path::new("upload.jpg"))?;
//! let matcher = Matcher::new(MatchConfig::default())?;
//! let (_ranked, outcome) = matcher.match_snapshot(&query, &shared.snapshot());
//! println!("matched: {}", outcome.is_match());
//! # Ok(())
//! # }
//! ```

pub mod error;
#[cfg(feature = "perceptual-hash")]
pub mod indexer;
pub mod matcher;
pub mod phash;
pub mod store;

// Re-export main types for convenience
pub use error::{LookalikeError, Result};
pub use matcher::{
    classify, rank, rank_snapshot, Classification, MatchConfig, MatchResponse, MatchResult,
    Matcher, RankedEntry, DEFAULT_THRESHOLD, DEFAULT_TOP_K,
};
pub use phash::{hamming_distance, HasherConfig, PerceptualHash, DEFAULT_HASH_BITS};
pub use store::{DatasetEntry, HashStore, SharedStore, SkippedEntry, StoreSnapshot};

// Image decoding and dataset indexing exports
#[cfg(feature = "perceptual-hash")]
pub use indexer::{
    is_image_file, relative_identifier, resolve_identifier, IndexReport, Indexer, SkippedFile,
    IMAGE_EXTENSIONS,
};
#[cfg(feature = "perceptual-hash")]
pub use phash::PerceptualHasher;
