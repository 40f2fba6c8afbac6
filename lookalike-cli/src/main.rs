//! Lookalike CLI - perceptual image matching against a reference set.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod exit_codes;
mod utils;

use config::Config;
use exit_codes::ExitCode;

#[derive(Parser)]
#[command(name = "lookalike")]
#[command(author, version, about = "Perceptual image matching against a reference set", long_about = None)]
#[command(after_help = exit_codes::HELP)]
struct Cli {
    /// Suppress human-readable output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash every image in the dataset directory and write the hash store
    Index {
        /// Dataset root directory [env: LOOKALIKE_DATASET_DIR]
        #[arg(short, long, value_name = "DIR")]
        dataset: Option<PathBuf>,

        /// Hash store to write [env: LOOKALIKE_HASH_FILE]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// List the images that would be hashed without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Match an image against the hash store
    Match {
        /// Image to look up
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Hash store to read [env: LOOKALIKE_HASH_FILE]
        #[arg(short, long, value_name = "FILE")]
        store: Option<PathBuf>,

        /// Maximum Hamming distance counted as a match [env: LOOKALIKE_MATCH_DISTANCE]
        #[arg(short, long, value_name = "BITS")]
        threshold: Option<u32>,

        /// Number of nearest entries to rank [env: LOOKALIKE_TOP_K]
        #[arg(short = 'k', long, value_name = "N")]
        top_k: Option<usize>,

        /// Print the match response as JSON
        #[arg(long)]
        json: bool,

        /// Text attached to a positive match [env: LOOKALIKE_DIAGNOSTIC]
        #[arg(long, value_name = "TEXT")]
        diagnostic: Option<String>,

        /// Dataset root used to show matched file paths [env: LOOKALIKE_DATASET_DIR]
        #[arg(short, long, value_name = "DIR")]
        dataset: Option<PathBuf>,
    },

    /// Print the perceptual hash of one or more images
    Hash {
        /// Images to hash
        #[arg(value_name = "IMAGE", required = true)]
        images: Vec<PathBuf>,
    },

    /// List the entries of a hash store
    List {
        /// Hash store to read [env: LOOKALIKE_HASH_FILE]
        #[arg(short, long, value_name = "FILE")]
        store: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    // clap's own exit status for bad arguments collides with NOT_RELEVANT
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.verbose);

    let exit = run(cli.command, cli.quiet).unwrap_or_else(|e| ExitCode::from_anyhow(&e));
    if let Some(message) = &exit.message {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}

fn run(command: Commands, quiet: bool) -> anyhow::Result<ExitCode> {
    let config = Config::from_env()?;

    match command {
        Commands::Index {
            dataset,
            output,
            dry_run,
        } => commands::index::execute(&config, dataset, output, dry_run, quiet),
        Commands::Match {
            image,
            store,
            threshold,
            top_k,
            json,
            diagnostic,
            dataset,
        } => commands::matching::execute(
            &config,
            commands::matching::MatchArgs {
                image,
                store,
                threshold,
                top_k,
                json,
                diagnostic,
                dataset,
            },
            quiet,
        ),
        Commands::Hash { images } => commands::hash::execute(&config, images, quiet),
        Commands::List { store } => commands::list::execute(&config, store, quiet),
    }
}
