//! # Attestor CLI Module
//!
//! This module implements the CLI interface for attestor.
//!
//! ## Available Commands
//!
//! - `analyze` - Run a full analysis over evidence files and seal the report
//! - `verify` - Verify a stored report's seal and evidence hashes
//! - `report` - Inspect stored reports
//! - `audit` - Print a run's audit trail

mod commands;

use attestor_core::AttestorError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Attestor - Forensic Evidence Pipeline
///
/// Eight independent analysis modules, consensus synthesis, and a
/// three-gate cryptographic sealing protocol over every run.
#[derive(Parser, Debug)]
#[command(name = "attestor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner and progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the report database
    #[arg(short = 'D', long, global = true, default_value = "attestor.db")]
    pub database: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a full analysis over evidence files and seal the report
    Analyze {
        /// Evidence files (repeatable)
        #[arg(short, long = "file", required = true)]
        files: Vec<PathBuf>,

        /// Report identifier; derived from the current time when omitted
        #[arg(short, long)]
        id: Option<String>,

        /// Pipeline configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the sealed report as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sealing location latitude
        #[arg(long, requires = "lon")]
        lat: Option<f64>,

        /// Sealing location longitude
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
    },

    /// Verify a stored report's seal and the evidence files it covers
    Verify {
        /// Report identifier
        id: String,
    },

    /// Inspect stored reports
    Report {
        /// Report identifier
        id: Option<String>,

        /// List all stored report ids
        #[arg(short, long, conflicts_with = "id")]
        list: bool,
    },

    /// Print a run's audit trail
    Audit {
        /// Report identifier
        id: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), AttestorError> {
    let json_mode = cli.json_mode;
    let quiet = cli.quiet;

    match cli.command {
        Some(Commands::Analyze {
            files,
            id,
            config,
            output,
            lat,
            lon,
        }) => {
            cmd_analyze(
                &cli.database,
                json_mode,
                quiet,
                &files,
                id,
                config.as_deref(),
                output.as_deref(),
                lat.zip(lon),
            )
            .await
        }
        Some(Commands::Verify { id }) => cmd_verify(&cli.database, json_mode, &id),
        Some(Commands::Report { id, list }) => {
            if list || id.is_none() {
                cmd_report_list(&cli.database, json_mode)
            } else {
                cmd_report_show(&cli.database, json_mode, id.as_deref().unwrap_or_default())
            }
        }
        Some(Commands::Audit { id }) => cmd_audit(&cli.database, json_mode, &id),
        None => {
            // No subcommand - list stored reports by default
            cmd_report_list(&cli.database, json_mode)
        }
    }
}
