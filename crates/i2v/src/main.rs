//! i2v CLI - Tag estimation and feature extraction for illustrations.
//!
//! Runs an illustration2vec model over image files and writes one JSON
//! record per image: ranked tags, plausible tags, probabilities of requested
//! tags, or real-valued / binary feature vectors.
//!
//! # Usage
//!
//! ```bash
//! # Top 10 tags per segment
//! i2v tags illust.png
//!
//! # Tags above the F1 threshold for a whole directory
//! i2v plausible ./illusts/ --rule f1 --output results.jsonl --format jsonl
//!
//! # Probability of specific tags
//! i2v specific illust.png --tag 1girl --tag safe
//!
//! # 4096-bit binary features
//! i2v feature ./illusts/ --binary
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// i2v - Tag estimation and feature extraction for illustrations.
#[derive(Parser, Debug)]
#[command(name = "i2v")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "I2V_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Rank the most probable tags of every segment
    Tags(cli::tags::TagsArgs),

    /// Keep the tags whose probability clears a threshold rule
    Plausible(cli::tags::PlausibleArgs),

    /// Report the probability of named tags
    Specific(cli::tags::SpecificArgs),

    /// Extract real-valued or binary feature vectors
    Feature(cli::feature::FeatureArgs),

    /// List the inference backends compiled into this build
    Backends,

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match &cli.config {
        Some(path) => i2v_core::Config::load_from(path)?,
        None => match i2v_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `i2v config path`."
                );
                i2v_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("i2v v{}", i2v_core::VERSION);

    match cli.command {
        Commands::Tags(args) => cli::tags::execute_tags(args, &config),
        Commands::Plausible(args) => cli::tags::execute_plausible(args, &config),
        Commands::Specific(args) => cli::tags::execute_specific(args, &config),
        Commands::Feature(args) => cli::feature::execute(args, &config),
        Commands::Backends => cli::backends::execute(&config),
        Commands::Config(args) => cli::config::execute(args, cli.config.as_deref()),
    }
}
