//! Import history command implementations

use anyhow::{bail, Result};
use tally_core::{db::Database, models::AccountHolderId};

use super::truncate;

pub fn cmd_imports_list(db: &Database, holder: Option<AccountHolderId>, limit: i64) -> Result<()> {
    let sessions = db.list_import_sessions(holder, limit, 0)?;

    if sessions.is_empty() {
        println!("No imports found. Import statement text with:");
        println!("  tally import --holder 1 --file statement.txt");
        return Ok(());
    }

    let total = db.count_import_sessions(holder)?;

    println!();
    println!("📜 Import History ({} of {})", sessions.len(), total);
    println!(
        "   {:>5}  {:<19}  {:>6}  {:<20}  {:>8}  {:>6}  {:>7}  Status",
        "ID", "Created", "Holder", "Source", "Imported", "Failed", "Skipped"
    );
    println!("   {}", "─".repeat(96));

    for session in sessions {
        println!(
            "   {:>5}  {:<19}  {:>6}  {:<20}  {:>8}  {:>6}  {:>7}  {}",
            session.id,
            session.created_at.format("%Y-%m-%d %H:%M:%S"),
            session.account_holder_id,
            truncate(session.source_name.as_deref().unwrap_or("-"), 20),
            session.imported_count,
            session.failed_count,
            session.skipped_count,
            session.status
        );
    }

    Ok(())
}

pub fn cmd_imports_show(db: &Database, id: i64) -> Result<()> {
    let Some(session) = db.get_import_session(id)? else {
        bail!("Import session not found: {}", id);
    };

    println!();
    println!("📜 Import #{}", session.id);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Created:          {}", session.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("   Account holder:   {}", session.account_holder_id);
    println!(
        "   Source:           {} ({} bytes)",
        session.source_name.as_deref().unwrap_or("-"),
        session.text_bytes
    );
    println!("   SHA-256:          {}", session.text_sha256);
    println!("   Transfer marker:  {}", session.transfer_marker);
    println!("   Status:           {}", session.status);
    if let Some(error) = &session.error {
        println!("   Error:            {}", error);
    }
    println!(
        "   Records:          {} found, {} imported, {} failed, {} skipped",
        session.candidate_count, session.imported_count, session.failed_count, session.skipped_count
    );
    if let Some(ms) = session.duration_ms {
        println!("   Duration:         {} ms", ms);
    }

    let failures = db.get_import_failures(id)?;
    if !failures.is_empty() {
        println!();
        println!("❌ Failed to store:");
        for failure in &failures {
            println!("   line {:>4}  {}", failure.line_number, failure.reason);
        }
    }

    let transactions = db.get_import_session_transactions(id)?;
    if !transactions.is_empty() {
        println!();
        println!("💳 Transactions");
        for tx in &transactions {
            println!(
                "   {:>4}  {}  {:>12.2}  {:<8}  {}",
                tx.source_line.unwrap_or_default(),
                tx.date,
                tx.amount,
                tx.category.as_str(),
                truncate(&tx.description, 40)
            );
        }
    }

    Ok(())
}
