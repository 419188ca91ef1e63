//! Statement import command implementations

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{
    config::StatementFormat,
    db::Database,
    import::{preview, StatementImporter},
    models::{AccountHolderId, ImportReport, SkippedLine},
};

use super::truncate;

/// Statement text plus where it came from
pub struct StatementInput {
    pub text: String,
    /// File name, or "-" for stdin
    pub source_name: String,
}

/// Read statement text from a file, or stdin when `file` is `None` or "-"
///
/// Invalid UTF-8 (common in PDF text dumps) is replaced rather than rejected.
pub fn read_statement(file: Option<&Path>) -> Result<StatementInput> {
    match file {
        Some(path) if path != Path::new("-") => {
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
            tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(StatementInput {
                text: String::from_utf8_lossy(&bytes).into_owned(),
                source_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
            })
        }
        _ => {
            let mut bytes = Vec::new();
            std::io::stdin()
                .read_to_end(&mut bytes)
                .context("Failed to read statement text from stdin")?;
            tracing::debug!("Read {} bytes from stdin", bytes.len());
            Ok(StatementInput {
                text: String::from_utf8_lossy(&bytes).into_owned(),
                source_name: "-".to_string(),
            })
        }
    }
}

pub fn cmd_import(
    db: &Database,
    format: &StatementFormat,
    input: &StatementInput,
    holder: AccountHolderId,
    json: bool,
) -> Result<ImportReport> {
    if !json {
        println!(
            "📥 Importing {} for account holder {}...",
            input.source_name, holder
        );
    }

    let report = StatementImporter::new(db, format).import_text(
        &input.text,
        holder,
        Some(&input.source_name),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report);
    }

    println!("✅ Import complete!");
    if let Some(session_id) = report.session_id {
        println!("   Session: #{}", session_id);
    }
    println!("   Imported: {}", report.imported_count);
    println!("   Failed: {}", report.failures.len());
    println!("   Skipped (unreadable): {}", report.skipped.len());
    println!("   Other lines ignored: {}", report.non_transaction_lines);

    if !report.failures.is_empty() {
        println!();
        println!("❌ Failed to store:");
        for failure in &report.failures {
            println!("   line {:>4}  {}", failure.line_number, failure.reason);
        }
    }

    print_skipped(&report.skipped);

    Ok(report)
}

pub fn cmd_preview(
    format: &StatementFormat,
    input: &StatementInput,
    holder: AccountHolderId,
    json: bool,
) -> Result<()> {
    let preview = preview(format, &input.text, holder);

    if json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }

    println!(
        "🔍 Dry run of {}: {} transactions (nothing written)",
        input.source_name,
        preview.transactions.len()
    );
    println!();

    if !preview.transactions.is_empty() {
        println!(
            "   {:>4}  {:<10}  {:>12}  {:<8}  Description",
            "Line", "Date", "Amount", "Category"
        );
        println!("   {}", "─".repeat(70));
        for tx in &preview.transactions {
            println!(
                "   {:>4}  {:<10}  {:>12.2}  {:<8}  {}",
                tx.source_line,
                tx.date,
                tx.amount,
                tx.category.as_str(),
                truncate(&tx.description, 40)
            );
        }
    }

    print_skipped(&preview.skipped);
    println!();
    println!("   Other lines ignored: {}", preview.non_transaction_lines);

    Ok(())
}

fn print_skipped(skipped: &[SkippedLine]) {
    if skipped.is_empty() {
        return;
    }

    println!();
    println!("⚠️  Skipped lines:");
    for line in skipped {
        println!(
            "   line {:>4}  {:<22} {}",
            line.line_number,
            line.reason.as_str(),
            truncate(line.text.trim(), 50)
        );
    }
}
