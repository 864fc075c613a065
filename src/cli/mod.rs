//! CLI command implementations

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

pub mod collect;
pub mod error;
pub mod roster;
pub mod verify;

pub use collect::CollectArgs;
pub use error::CliError;
pub use roster::RosterArgs;
pub use verify::VerifyArgs;

/// Top-level CLI
#[derive(Parser, Debug)]
#[command(name = "gamelog-collector")]
#[command(about = "Resumable bulk collector for NBA player game logs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Root directory for the roster, checkpoints and aggregate
    #[arg(long, global = true, default_value = "data")]
    pub output_dir: PathBuf,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect game logs for every selected player and season
    Collect(CollectArgs),

    /// Load or fetch the reference roster and summarize it
    Roster(RosterArgs),

    /// Check that every checkpoint and journal on disk is readable
    Verify(VerifyArgs),
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}. Valid options: json, human")),
        }
    }
}
