//! FaceFinder CLI - Face embedding extraction for face matching and search.
//!
//! FaceFinder takes cropped face images as input and outputs one embedding
//! vector per face. Embeddings of the same person lie close together, so
//! they can be compared directly or indexed for search.
//!
//! # Usage
//!
//! ```bash
//! # Embed a single face crop
//! facefinder embed face.jpg
//!
//! # Embed a directory, eight faces per backend invocation
//! facefinder embed ./faces/ --batch-size 8 --format jsonl --output faces.jsonl
//!
//! # Compare two faces
//! facefinder compare alice.jpg bob.jpg
//!
//! # Group embedded faces into persons
//! facefinder group faces.jsonl
//!
//! # Inspect the configured model
//! facefinder info
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// FaceFinder - Face embedding extraction for face matching and search.
#[derive(Parser, Debug)]
#[command(name = "facefinder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "FACEFINDER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract face embeddings from images
    Embed(cli::embed::EmbedArgs),

    /// Compare two faces and decide whether they show the same person
    Compare(cli::compare::CompareArgs),

    /// Group face embeddings into persons
    Group(cli::group::GroupArgs),

    /// Show the configured model, its options and labels
    Info(cli::info::InfoArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let loaded = match &cli.config {
        Some(path) => facefinder_core::Config::load_from(path),
        None => facefinder_core::Config::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `facefinder config path`."
            );
            facefinder_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("FaceFinder v{}", facefinder_core::VERSION);

    match cli.command {
        Commands::Embed(args) => cli::embed::execute(args, config),
        Commands::Compare(args) => cli::compare::execute(args, config),
        Commands::Group(args) => cli::group::execute(args, config),
        Commands::Info(args) => cli::info::execute(args, config),
        Commands::Config(args) => cli::config::execute(args, cli.config.as_deref()),
    }
}
