//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_format` - Shared utility to load the statement format
//! - `cmd_init` - Initialize the database
//! - `cmd_config` - Print the effective statement format

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::config::{default_config_path, StatementFormat};
use tally_core::db::{Database, DB_KEY_ENV};

/// Imports still `processing` after this many minutes are treated as interrupted
const STUCK_IMPORT_MINUTES: i64 = 60;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Load the statement format from --config, the data dir override, or built-in defaults
pub fn load_format(config: Option<&Path>) -> Result<StatementFormat> {
    StatementFormat::load(config).context("Failed to load statement format")
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool, config: Option<&Path>) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    let recovered = db
        .recover_stuck_imports(chrono::Duration::minutes(STUCK_IMPORT_MINUTES))
        .context("Failed to recover interrupted imports")?;
    if recovered > 0 {
        println!("   Marked {} interrupted import(s) as failed", recovered);
    }

    if db.is_encrypted() {
        println!("   🔒 Encryption: ENABLED ({})", DB_KEY_ENV);
    } else {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    }

    let format = load_format(config)?;
    println!("   Statement format: {}", format.source());
    if let Some(path) = default_config_path() {
        if !path.exists() {
            println!("   💡 Tip: Override the format at {}", path.display());
        }
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Preview a statement: tally import --holder 1 --file statement.txt --dry-run");
    println!("  2. Import it:           tally import --holder 1 --file statement.txt");

    Ok(())
}

pub fn cmd_config(format: &StatementFormat) -> Result<()> {
    println!();
    println!("⚙️  Statement Format");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Source:           {}", format.source());
    println!("   Transfer marker:  {}", format.transfer_marker);
    println!("   Line prefix:      {}", format.line_prefix.as_str());
    println!("   Line pattern:     {}", format.line_pattern.as_str());
    println!(
        "   Date:             DD{sep}MM{sep}YY, YY < {} → 20YY, else 19YY",
        format.date.century_pivot,
        sep = format.date.separator
    );

    let grouping: Vec<String> = format
        .amount
        .grouping_separators
        .iter()
        .map(|c| format!("{:?}", c))
        .collect();
    println!("   Grouping:         {}", grouping.join(", "));
    match format.amount.decimal_mark {
        Some(mark) => println!(
            "   Decimal mark:     {:?} followed by {} digits",
            mark, format.amount.decimal_places
        ),
        None => println!("   Decimal mark:     (none, amounts are whole numbers)"),
    }

    Ok(())
}
