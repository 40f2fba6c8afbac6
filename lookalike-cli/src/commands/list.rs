//! List command implementation.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::exit_codes::ExitCode;
use crate::utils::load_store;

/// Execute the list command.
///
/// Prints `<hex>  <identifier>` for every decodable entry, in identifier
/// order. Malformed entries are listed separately and do not fail the command.
pub fn execute(config: &Config, store: Option<PathBuf>, quiet: bool) -> Result<ExitCode> {
    let store_path = store.unwrap_or_else(|| config.hash_file.clone());
    let store = load_store(&store_path)?;
    let snapshot = store.get_all(config.hasher_config().bit_len());

    for entry in &snapshot.entries {
        println!("{}  {}", entry.hash, entry.identifier);
    }

    if !quiet {
        for skipped in &snapshot.skipped {
            eprintln!(
                "{} {} {}",
                "Malformed:".red().bold(),
                skipped.identifier,
                format!("({})", skipped.reason).dimmed()
            );
        }
        eprintln!(
            "{} {} entr{} in {}",
            "Total:".dimmed(),
            snapshot.entries.len(),
            if snapshot.entries.len() == 1 { "y" } else { "ies" },
            store_path.display()
        );
    }

    Ok(ExitCode::success())
}
