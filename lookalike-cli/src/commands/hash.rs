//! Hash command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::warn;

use crate::config::Config;
use crate::exit_codes::{ExitCode, DATA_ERROR};
use crate::utils::build_hasher;

/// Execute the hash command.
///
/// Prints `<hex>  <path>` per image. With several inputs a file that cannot
/// be hashed is reported and the rest are still processed; a single input
/// fails with its own error.
pub fn execute(config: &Config, images: Vec<PathBuf>, quiet: bool) -> Result<ExitCode> {
    let hasher = build_hasher(config)?;

    if let [path] = images.as_slice() {
        let hash = hasher
            .hash_path(path)
            .with_context(|| format!("Failed to hash image: {}", path.display()))?;
        println!("{}  {}", hash, path.display());
        return Ok(ExitCode::success());
    }

    let mut failed = 0usize;
    for path in &images {
        match hasher.hash_path(path) {
            Ok(hash) => println!("{}  {}", hash, path.display()),
            Err(e) => {
                failed += 1;
                warn!(path = %path.display(), error = %e, "Hash failed");
                if !quiet {
                    eprintln!(
                        "{} {} {}",
                        "Skipped:".yellow().bold(),
                        path.display(),
                        format!("({})", e).dimmed()
                    );
                }
            }
        }
    }

    if failed == 0 {
        Ok(ExitCode::success())
    } else {
        Ok(ExitCode::error(
            DATA_ERROR,
            format!("Failed to hash {} of {} images", failed, images.len()),
        ))
    }
}
