//! # cpn CLI entry point
//!
//! Parses command-line arguments, sets up logging, loads the run
//! configuration, and dispatches to the subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cpn_cli::codes::{run_codes, CodesArgs};
use cpn_cli::normalize::{run_normalize, NormalizeArgs};
use cpn_cli::resolve::{run_resolve, ResolveArgs};
use cpn_cli::{current_dir, load_config};

/// Climate policy normalizer.
///
/// Maps records from several climate policy databases onto one validated
/// model and writes each policy to its own YAML file, grouped by country.
#[derive(Parser, Debug)]
#[command(name = "cpn", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file (default: ./cpn.yaml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize feeds into one YAML file per policy.
    Normalize(NormalizeArgs),

    /// Validate and print the enabled code lists.
    Codes(CodesArgs),

    /// Resolve jurisdiction names to ISO 3166-1 alpha-3 codes.
    Resolve(ResolveArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "cpn starting");

    let result = load_config(cli.config.as_deref(), &current_dir()).and_then(|config| {
        match &cli.command {
            Commands::Normalize(args) => run_normalize(args, config),
            Commands::Codes(args) => run_codes(args, &config),
            Commands::Resolve(args) => run_resolve(args, &config),
        }
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
