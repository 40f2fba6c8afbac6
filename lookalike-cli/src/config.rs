//! CLI configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.
//! Command-line flags override whatever is loaded here. A set but unparsable
//! numeric variable is a configuration error, never a silent default.

use std::path::PathBuf;
use std::str::FromStr;

use lookalike_core::phash::DEFAULT_MAX_DIMENSION;
use lookalike_core::{
    HasherConfig, LookalikeError, MatchConfig, Result, DEFAULT_THRESHOLD, DEFAULT_TOP_K,
};

/// Configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Dataset root directory (default: dataset)
    pub dataset_dir: PathBuf,
    /// Persisted hash store (default: hashes.json)
    pub hash_file: PathBuf,
    /// Maximum Hamming distance counted as a match (default: 0)
    pub match_distance: u32,
    /// Ranked entries kept for inspection (default: 5)
    pub top_k: usize,
    /// Largest accepted image width or height in pixels (default: 16384)
    pub max_image_dimension: u32,
    /// Text attached to a positive match (default: none)
    pub diagnostic: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("dataset"),
            hash_file: PathBuf::from("hashes.json"),
            match_distance: DEFAULT_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            max_image_dimension: DEFAULT_MAX_DIMENSION,
            diagnostic: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    ///
    /// Empty values count as unset. Numeric values that do not parse, and a
    /// zero `LOOKALIKE_TOP_K` or `LOOKALIKE_MAX_IMAGE_DIMENSION`, are
    /// rejected with [`LookalikeError::InvalidConfig`] naming the variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let dataset_dir = lookup("LOOKALIKE_DATASET_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.dataset_dir);

        let hash_file = lookup("LOOKALIKE_HASH_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.hash_file);

        let match_distance = parse_number(&lookup, "LOOKALIKE_MATCH_DISTANCE")?
            .unwrap_or(defaults.match_distance);

        let top_k = parse_positive(&lookup, "LOOKALIKE_TOP_K")?.unwrap_or(defaults.top_k);

        let max_image_dimension = parse_positive(&lookup, "LOOKALIKE_MAX_IMAGE_DIMENSION")?
            .unwrap_or(defaults.max_image_dimension);

        let diagnostic = lookup("LOOKALIKE_DIAGNOSTIC").filter(|v| !v.trim().is_empty());

        Ok(Self {
            dataset_dir,
            hash_file,
            match_distance,
            top_k,
            max_image_dimension,
            diagnostic,
        })
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            threshold: self.match_distance,
            top_k: self.top_k,
        }
    }

    pub fn hasher_config(&self) -> HasherConfig {
        HasherConfig {
            max_dimension: self.max_image_dimension,
            ..HasherConfig::default()
        }
    }
}

fn parse_number<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map(Some).map_err(|_| {
            LookalikeError::InvalidConfig(format!(
                "{key} must be a non-negative integer, got {raw:?}"
            ))
        }),
        _ => Ok(None),
    }
}

fn parse_positive<T: FromStr + Default + PartialEq>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match parse_number(lookup, key)? {
        Some(value) if value == T::default() => Err(LookalikeError::InvalidConfig(format!(
            "{key} must be at least 1, got 0"
        ))),
        parsed => Ok(parsed),
    }
}
