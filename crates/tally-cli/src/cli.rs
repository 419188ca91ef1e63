//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Turn bank statement text into classified transactions
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Import bank statement text as income, outcome and transfer records", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for real statements)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Statement format config (defaults to the data dir override, then built-in)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import statement text (as extracted from a PDF)
    Import {
        /// Account holder the transactions belong to
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
        holder: i64,

        /// Text file to import; stdin when omitted or "-"
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Show how the text would be classified without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show import history
    Imports {
        #[command(subcommand)]
        action: Option<ImportsAction>,

        /// Only imports for this account holder
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
        holder: Option<i64>,

        /// Number of sessions to show
        #[arg(short, long, default_value = "20", value_parser = clap::value_parser!(i64).range(1..))]
        limit: i64,
    },

    /// Print the effective statement format
    Config,
}

#[derive(Subcommand)]
pub enum ImportsAction {
    /// Show one import session with its failures and transactions
    Show {
        /// Import session ID
        id: i64,
    },
}
