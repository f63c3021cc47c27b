//! CLI argument parsing and command definitions.
//!
//! Global flags (config path, verbosity) plus one subcommand per snapshot
//! operation.

use clap::{Parser, Subcommand};
use loradex_retrieval::SimilarityMetric;
use std::path::PathBuf;

// ============================================================================
// CLI argument types
// ============================================================================

/// Top-level CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "loradex", author, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "LORADEX_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summarise a snapshot: record count, dimensions, metric ranges.
    Stats {
        /// Snapshot file (.parquet).
        snapshot: PathBuf,
    },

    /// Print one record as JSON.
    Show {
        /// Snapshot file (.parquet).
        snapshot: PathBuf,

        /// Value to look up (the record key unless --column is given).
        key: String,

        /// Look up by this column instead of the key column.
        #[arg(long)]
        column: Option<String>,
    },

    /// Rank a snapshot against a literal representation vector.
    Query(QueryArgs),

    /// Copy a snapshot file.
    Copy {
        /// Source snapshot.
        src: PathBuf,

        /// Destination path.
        dest: PathBuf,

        /// Overwrite an existing destination.
        #[arg(short, long)]
        force: bool,
    },

    /// Configuration operations.
    Config(ConfigCommand),

    /// Print version information.
    Version,
}

/// Arguments of `loradex query`.
#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// Snapshot file (.parquet).
    pub snapshot: PathBuf,

    /// Representation vector, comma separated (e.g. "1,0,0").
    #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
    pub vector: Vec<f32>,

    /// Query text recorded with the request.
    #[arg(long, default_value = "vector")]
    pub query: String,

    /// Maximum number of results.
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Drop records with a larger strength.
    #[arg(long)]
    pub max_strength: Option<f64>,

    /// Drop records with a smaller consistency.
    #[arg(long)]
    pub min_consistency: Option<f64>,

    /// Similarity metric: cosine or dot.
    #[arg(short, long)]
    pub metric: Option<SimilarityMetric>,

    /// Compute device override.
    #[arg(long)]
    pub device: Option<String>,
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    /// Config subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigAction,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Print the effective configuration as TOML.
    Show,
}

// ============================================================================
// Tests
// ============================================================================
