//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lookalike_core::{resolve_identifier, HashStore, PerceptualHasher};
use tracing::debug;

use crate::config::Config;

/// Load a hash store, failing when the file does not exist.
///
/// The core loader treats a missing file as an empty store, which is right
/// for the indexer but hides a typo in `--store` at query time.
pub fn load_store(path: &Path) -> Result<HashStore> {
    if !path.is_file() {
        return Err(std::io::Error::from(std::io::ErrorKind::NotFound))
            .with_context(|| format!("Failed to read hash store: {}", path.display()));
    }

    let store = HashStore::load(path)
        .with_context(|| format!("Failed to load hash store: {}", path.display()))?;
    debug!(path = %path.display(), entries = store.len(), "Loaded hash store");

    Ok(store)
}

/// Build the hasher described by the environment configuration.
pub fn build_hasher(config: &Config) -> Result<PerceptualHasher> {
    PerceptualHasher::new(config.hasher_config()).context("Invalid hasher configuration")
}

/// Dataset file for a store identifier, if it still exists on disk.
pub fn dataset_file(dataset: &Path, identifier: &str) -> Option<PathBuf> {
    resolve_identifier(dataset, identifier).filter(|path| path.is_file())
}

/// Render a distance as `n/bits` for human output.
pub fn format_distance(distance: u32, bit_len: usize) -> String {
    format!("{}/{}", distance, bit_len)
}
