//! Match command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use lookalike_core::{
    Classification, MatchConfig, MatchResponse, MatchResult, Matcher, PerceptualHash, RankedEntry,
};
use tracing::{debug, info};

use crate::config::Config;
use crate::exit_codes::ExitCode;
use crate::utils::{build_hasher, dataset_file, format_distance, load_store};

/// Arguments of the match command; `None` falls back to [`Config`].
pub struct MatchArgs {
    pub image: PathBuf,
    pub store: Option<PathBuf>,
    pub threshold: Option<u32>,
    pub top_k: Option<usize>,
    pub json: bool,
    pub diagnostic: Option<String>,
    pub dataset: Option<PathBuf>,
}

/// Execute the match command.
///
/// Returns success when the image matched and [`ExitCode::not_relevant`]
/// otherwise; both are normal outcomes.
pub fn execute(config: &Config, args: MatchArgs, quiet: bool) -> Result<ExitCode> {
    let store_path = args.store.unwrap_or_else(|| config.hash_file.clone());
    let dataset = args.dataset.unwrap_or_else(|| config.dataset_dir.clone());
    let diagnostic = args.diagnostic.or_else(|| config.diagnostic.clone());

    let defaults = config.match_config();
    let match_config = MatchConfig {
        threshold: args.threshold.unwrap_or(defaults.threshold),
        top_k: args.top_k.unwrap_or(defaults.top_k),
    };
    let matcher = Matcher::new(match_config).context("Invalid match configuration")?;

    let store = load_store(&store_path)?;

    let hasher = build_hasher(config)?;
    let query = hasher
        .hash_path(&args.image)
        .with_context(|| format!("Failed to hash image: {}", args.image.display()))?;
    debug!(path = %args.image.display(), hash = %query, "Hashed query image");

    let (result, outcome) = matcher.match_hash(&query, &store);

    info!(
        matched = outcome.is_match(),
        compared = result.compared,
        skipped = result.skipped.len(),
        threshold = match_config.threshold,
        "Matched query"
    );

    let response = MatchResponse::new(&outcome, diagnostic);

    if args.json {
        let json = serde_json::to_string_pretty(&response)
            .context("Failed to serialize match response")?;
        println!("{}", json);
    } else if !quiet {
        print_report(&query, &result, &outcome, &response, &dataset);
    }

    Ok(if outcome.is_match() {
        ExitCode::success()
    } else {
        ExitCode::not_relevant()
    })
}

fn print_report(
    query: &PerceptualHash,
    result: &MatchResult,
    outcome: &Classification,
    response: &MatchResponse,
    dataset: &Path,
) {
    let bits = query.bit_len();

    println!();
    match outcome {
        Classification::Matched(matches) => {
            println!("{}", "╔════════════════════════════════════════╗".green());
            println!(
                "{}",
                "║                MATCH                   ║".green().bold()
            );
            println!("{}", "╚════════════════════════════════════════╝".green());
            println!();
            println!("   {} {}", "Query hash:".dimmed(), query);
            for entry in matches {
                print_entry("Matched:", entry, bits, dataset);
            }
            if let MatchResponse::Matched {
                diagnostic: Some(text),
                ..
            } = response
            {
                println!("   {} {}", "Diagnostic:".dimmed(), text);
            }
        }
        Classification::NotRelevant(nearest) => {
            println!("{}", "╔════════════════════════════════════════╗".yellow());
            println!(
                "{}",
                "║             NOT RELEVANT               ║".yellow().bold()
            );
            println!("{}", "╚════════════════════════════════════════╝".yellow());
            println!();
            println!("   {} {}", "Query hash:".dimmed(), query);
            match nearest {
                Some(entry) => print_entry("Nearest:", entry, bits, dataset),
                None => println!("   {} {}", "Nearest:".dimmed(), "store is empty".yellow()),
            }
        }
    }

    if result.ranked.len() > 1 {
        println!(
            "   {} {} of {} entries",
            "Ranked:".dimmed(),
            result.ranked.len(),
            result.compared
        );
        for entry in &result.ranked {
            println!(
                "     {:>7}  {}",
                format_distance(entry.distance, bits),
                entry.identifier
            );
        }
    }

    if !result.skipped.is_empty() {
        println!(
            "   {} {} malformed store entr{}",
            "Skipped:".dimmed(),
            result.skipped.len(),
            if result.skipped.len() == 1 { "y" } else { "ies" }
        );
    }
}

fn print_entry(label: &str, entry: &RankedEntry, bits: usize, dataset: &Path) {
    println!(
        "   {} {} {}",
        label.dimmed(),
        entry.identifier,
        format!("(distance {})", format_distance(entry.distance, bits)).dimmed()
    );
    if let Some(path) = dataset_file(dataset, &entry.identifier) {
        println!("   {} {}", "File:".dimmed(), path.display());
    }
}
