//! Relest CLI - fit, inspect, and query selectivity models.
//!
//! Relations come in as JSON, fitted models go out as JSON. The library is
//! for embedding in an optimizer; the CLI is for trying models out and
//! looking inside them.

mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Relest selectivity model tool.
///
/// Fits attribute networks on relations stored as JSON, prints the learned
/// trees, and estimates the selectivity of equality conditions.
#[derive(Parser)]
#[command(name = "relest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Suppress progress and info messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Output format options.
#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table format (default for TTY)
    #[default]
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Null treatment during structure learning.
#[derive(Clone, Copy, ValueEnum, Default)]
enum NullPolicyArg {
    /// Substitute "MISSING" / -1
    #[default]
    Sentinel,
    /// Keep nulls as their own category
    Marker,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Fit a schema model on relations
    Fit {
        /// JSON file holding an array of relations
        relations: PathBuf,

        /// Where to write the fitted model
        #[arg(short, long)]
        output: PathBuf,

        /// Most-common-value buckets per histogram
        #[arg(short, long, default_value_t = 30)]
        m: usize,

        /// Range buckets per histogram
        #[arg(short, long, default_value_t = 30)]
        n: usize,

        /// Row cap for structure learning
        #[arg(long, default_value_t = 30_000)]
        max_rows: usize,

        /// Seed for row sampling
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Null treatment during structure learning
        #[arg(long, value_enum, default_value_t = NullPolicyArg::Sentinel)]
        null_policy: NullPolicyArg,

        /// Fit relations one at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Show the trees of a fitted model
    Show {
        /// Path to the model
        model: PathBuf,

        /// Only show this relation
        #[arg(short, long)]
        relation: Option<String>,
    },

    /// Estimate the selectivity of equality conditions
    Estimate {
        /// Path to the model
        model: PathBuf,

        /// Relations taking part in the query
        #[arg(short, long = "relation", required = true)]
        relations: Vec<String>,

        /// Conditions as attribute=value; values are read as JSON when
        /// possible (42, 1.5, null, true) and as text otherwise
        #[arg(short = 'w', long = "where")]
        conditions: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else if !cli.quiet {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    let result = match cli.command {
        Commands::Fit {
            relations,
            output,
            m,
            n,
            max_rows,
            seed,
            null_policy,
            sequential,
        } => {
            let args = commands::fit::FitArgs {
                m,
                n,
                max_rows,
                seed,
                null_policy: match null_policy {
                    NullPolicyArg::Sentinel => relest_engine::NullPolicy::Sentinel,
                    NullPolicyArg::Marker => relest_engine::NullPolicy::Marker,
                },
                sequential,
            };
            commands::fit::run(&relations, &output, &args, cli.format, cli.quiet)
        }
        Commands::Show { model, relation } => {
            commands::show::run(&model, relation.as_deref(), cli.format, cli.quiet)
        }
        Commands::Estimate {
            model,
            relations,
            conditions,
        } => commands::estimate::run(&model, &relations, &conditions, cli.format, cli.quiet),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
