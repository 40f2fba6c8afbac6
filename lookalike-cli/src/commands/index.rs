//! Index command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use lookalike_core::{Indexer, SkippedFile};
use tracing::{info, warn};

use crate::config::Config;
use crate::exit_codes::ExitCode;
use crate::utils::build_hasher;

/// Execute the index command.
pub fn execute(
    config: &Config,
    dataset: Option<PathBuf>,
    output: Option<PathBuf>,
    dry_run: bool,
    quiet: bool,
) -> Result<ExitCode> {
    let dataset = dataset.unwrap_or_else(|| config.dataset_dir.clone());
    let output = output.unwrap_or_else(|| config.hash_file.clone());
    let indexer = Indexer::new(build_hasher(config)?);

    if dry_run {
        let (images, skipped) = indexer
            .discover(&dataset)
            .with_context(|| format!("Failed to read dataset: {}", dataset.display()))?;

        if !quiet {
            println!(
                "{} {} image(s) under {}",
                "[DRY RUN]".yellow().bold(),
                images.len(),
                dataset.display()
            );
            for image in &images {
                println!("   {}", image.display());
            }
            print_skipped(&skipped);
            println!("   {} {}", "Would write:".dimmed(), output.display());
        }
        return Ok(ExitCode::success());
    }

    let report = indexer
        .build(&dataset)
        .with_context(|| format!("Failed to read dataset: {}", dataset.display()))?;

    if report.store.is_empty() {
        warn!(dataset = %dataset.display(), "No images were hashed");
    }

    report
        .store
        .save(&output)
        .with_context(|| format!("Failed to write hash store: {}", output.display()))?;

    info!(
        path = %output.display(),
        entries = report.hashed(),
        skipped = report.skipped.len(),
        "Wrote hash store"
    );

    if !quiet {
        println!(
            "{} {} image(s) from {}",
            "Indexed".green().bold(),
            report.hashed(),
            dataset.display()
        );
        print_skipped(&report.skipped);
        println!("   {} {}", "Hash store:".dimmed(), output.display());
    }

    Ok(ExitCode::success())
}

fn print_skipped(skipped: &[SkippedFile]) {
    if skipped.is_empty() {
        return;
    }
    println!(
        "{} {} file(s)",
        "Skipped".yellow().bold(),
        skipped.len()
    );
    for file in skipped {
        println!(
            "   {} {}",
            file.path.display(),
            format!("({})", file.reason).dimmed()
        );
    }
}
