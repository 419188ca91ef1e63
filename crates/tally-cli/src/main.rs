//! Tally CLI - Bank statement text importer
//!
//! Usage:
//!   tally init                              Initialize database
//!   tally import --holder 1 --file s.txt    Import statement text
//!   tally imports                           Show import history
//!   tally config                            Show the statement format

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tally_core::AccountHolderId;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt, cli.config.as_deref()),
        Commands::Import {
            holder,
            file,
            dry_run,
            json,
        } => {
            let format = commands::load_format(cli.config.as_deref())?;
            let input = commands::read_statement(file.as_deref())?;
            let holder = AccountHolderId(holder);

            if dry_run {
                commands::cmd_preview(&format, &input, holder, json)
            } else {
                let db = commands::open_db(&cli.db, cli.no_encrypt)?;
                commands::cmd_import(&db, &format, &input, holder, json).map(|_| ())
            }
        }
        Commands::Imports {
            action,
            holder,
            limit,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_imports_list(&db, holder.map(AccountHolderId), limit),
                Some(ImportsAction::Show { id }) => commands::cmd_imports_show(&db, id),
            }
        }
        Commands::Config => {
            let format = commands::load_format(cli.config.as_deref())?;
            commands::cmd_config(&format)
        }
    }
}
