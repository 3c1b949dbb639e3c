//! Command-line arguments

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "reimburse")]
#[command(about = "Estimate a trip reimbursement from historical cases")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "REIMBURSE_CONFIG", default_value = "reimburse.toml", global = true)]
    pub config: PathBuf,

    /// Training corpus (overrides config file)
    #[arg(long, env = "REIMBURSE_CORPUS", global = true)]
    pub corpus: Option<PathBuf>,

    /// Engine preset used when the config file has no [engine] section
    #[arg(long, default_value = "conservative", global = true)]
    pub variant: String,

    /// Log engine internals at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Trip duration in days
    #[arg(requires_all = ["miles", "receipts"])]
    pub days: Option<u32>,

    /// Miles traveled
    #[arg(allow_negative_numbers = true)]
    pub miles: Option<f64>,

    /// Total receipts amount
    #[arg(allow_negative_numbers = true)]
    pub receipts: Option<f64>,
}

impl Cli {
    /// The positional trip, when all three values were given.
    pub fn trip(&self) -> Option<TripArgs> {
        Some(TripArgs {
            days: self.days?,
            miles: self.miles?,
            receipts: self.receipts?,
        })
    }
}

/// A trip to estimate
#[derive(Debug, Clone, Copy, Args)]
pub struct TripArgs {
    /// Trip duration in days
    pub days: u32,

    /// Miles traveled
    #[arg(allow_negative_numbers = true)]
    pub miles: f64,

    /// Total receipts amount
    #[arg(allow_negative_numbers = true)]
    pub receipts: f64,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Estimate and show the ensemble breakdown
    Explain(TripArgs),

    /// Score the engine against labelled cases
    Eval {
        /// Labelled cases (defaults to the training corpus)
        #[arg(long)]
        cases: Option<PathBuf>,

        /// Number of worst cases to list
        #[arg(long, default_value = "10")]
        worst: usize,
    },

    /// Describe the loaded corpus and configuration
    Info,
}
