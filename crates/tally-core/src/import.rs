//! Statement text import
//!
//! Wires extraction and materialization together and records each run as an
//! import session. Per-line problems never fail an import: unreadable lines
//! come back as [`SkippedLine`] diagnostics and failed inserts as
//! [`ImportFailure`]s.

use std::time::Instant;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::StatementFormat;
use crate::error::Result;
use crate::extract::LineOutcome;
use crate::materialize::{MaterializeOutcome, Materializer, TransactionStore};
use crate::models::{
    AccountHolderId, ImportFailure, ImportReport, ImportSessionResults, NewImportSession,
    NewTransaction, SkipReason, SkippedLine,
};

/// Storage for import session bookkeeping
pub trait ImportHistory {
    fn create_import_session(&self, session: &NewImportSession) -> Result<i64>;
    fn finish_import_session(&self, session_id: i64, results: &ImportSessionResults) -> Result<()>;
    fn mark_import_failed(&self, session_id: i64, error: &str) -> Result<()>;
    fn record_import_failures(&self, session_id: i64, failures: &[ImportFailure]) -> Result<()>;
}

/// Classified transactions of a dry run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Preview {
    pub transactions: Vec<NewTransaction>,
    pub skipped: Vec<SkippedLine>,
    pub non_transaction_lines: usize,
}

/// Hex SHA-256 of the statement text
pub fn text_fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Extract and classify without persisting anything
pub fn preview(format: &StatementFormat, text: &str, account_holder_id: AccountHolderId) -> Preview {
    let mut preview = Preview::default();
    for line in format.scan(text) {
        match line.outcome {
            LineOutcome::Candidate(candidate) => preview.transactions.push(
                NewTransaction::from_candidate(candidate, account_holder_id, &format.transfer_marker),
            ),
            LineOutcome::Skipped(SkipReason::NonTransactionLine) => {
                preview.non_transaction_lines += 1
            }
            LineOutcome::Skipped(reason) => preview.skipped.push(SkippedLine {
                line_number: line.line_number,
                reason,
                text: line.text.to_string(),
            }),
        }
    }
    preview
}

/// Imports statement text into a store
pub struct StatementImporter<'a, S: TransactionStore + ImportHistory + ?Sized> {
    store: &'a S,
    format: &'a StatementFormat,
}

impl<'a, S: TransactionStore + ImportHistory + ?Sized> StatementImporter<'a, S> {
    pub fn new(store: &'a S, format: &'a StatementFormat) -> Self {
        Self { store, format }
    }

    /// Dry run, see [`preview`]
    pub fn preview(&self, text: &str, account_holder_id: AccountHolderId) -> Preview {
        preview(self.format, text, account_holder_id)
    }

    /// Import every transaction line of `text` for one account holder
    ///
    /// Records are persisted one by one in line order, a failed
    /// insert is reported in `failures` and the import carries on. When the
    /// import session cannot be opened the records are still imported and
    /// `session_id` is `None`.
    pub fn import_text(
        &self,
        text: &str,
        account_holder_id: AccountHolderId,
        source_name: Option<&str>,
    ) -> ImportReport {
        let started = Instant::now();

        let session_id = match self.store.create_import_session(&NewImportSession {
            account_holder_id,
            source_name: source_name.map(str::to_string),
            text_bytes: text.len() as i64,
            text_sha256: text_fingerprint(text),
            transfer_marker: self.format.transfer_marker.clone(),
        }) {
            Ok(id) => {
                info!(
                    "Import session {} started for account holder {} ({} bytes)",
                    id,
                    account_holder_id,
                    text.len()
                );
                Some(id)
            }
            Err(e) => {
                warn!(
                    "Could not open import session for account holder {}, importing without history: {}",
                    account_holder_id, e
                );
                None
            }
        };

        let mut materializer = Materializer::new(self.store, &self.format.transfer_marker);
        if let Some(id) = session_id {
            materializer = materializer.with_session(id);
        }
        let mut outcome = MaterializeOutcome::default();
        let mut report = ImportReport {
            session_id,
            ..Default::default()
        };

        for line in self.format.scan(text) {
            match line.outcome {
                LineOutcome::Candidate(candidate) => {
                    materializer.persist(candidate, account_holder_id, &mut outcome)
                }
                LineOutcome::Skipped(SkipReason::NonTransactionLine) => {
                    report.non_transaction_lines += 1
                }
                LineOutcome::Skipped(reason) => {
                    debug!("Line {}: skipped ({})", line.line_number, reason);
                    report.skipped.push(SkippedLine {
                        line_number: line.line_number,
                        reason,
                        text: line.text.to_string(),
                    });
                }
            }
        }

        let candidate_count = outcome.attempted();
        report.imported_count = outcome.imported_count();
        report.failures = outcome.failures;

        if let Some(id) = session_id {
            self.close_session(id, &report, candidate_count, started);
        }

        info!(
            "Import finished: {} imported, {} failed, {} skipped, {} non-transaction lines",
            report.imported_count,
            report.failures.len(),
            report.skipped.len(),
            report.non_transaction_lines
        );

        report
    }

    /// Bookkeeping errors are logged only; the records are already stored
    fn close_session(
        &self,
        session_id: i64,
        report: &ImportReport,
        candidate_count: usize,
        started: Instant,
    ) {
        if let Err(e) = self.store.record_import_failures(session_id, &report.failures) {
            warn!("Import session {}: failed to record failures: {}", session_id, e);
        }

        let results = ImportSessionResults {
            candidate_count: candidate_count as i64,
            imported_count: report.imported_count as i64,
            failed_count: report.failures.len() as i64,
            skipped_count: report.skipped.len() as i64,
            duration_ms: started.elapsed().as_millis() as i64,
        };
        if let Err(e) = self.store.finish_import_session(session_id, &results) {
            warn!("Import session {}: failed to close session: {}", session_id, e);
            return;
        }

        if candidate_count > 0 && report.imported_count == 0 {
            let error = format!("All {} records failed to store", candidate_count);
            if let Err(e) = self.store.mark_import_failed(session_id, &error) {
                warn!("Import session {}: failed to mark as failed: {}", session_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{Category, ImportStatus};
    use crate::test_utils::{FlakyStore, SAMPLE_STATEMENT};

    fn format() -> StatementFormat {
        StatementFormat::builtin().unwrap()
    }

    #[test]
    fn test_import_sample_statement() {
        let db = Database::in_memory().unwrap();
        let format = format();
        let importer = StatementImporter::new(&db, &format);

        let report = importer
            .import_text(SAMPLE_STATEMENT, AccountHolderId(42), Some("march.txt"));

        assert_eq!(report.imported_count, 3);
        assert!(report.failures.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].reason, SkipReason::MalformedLine);
        assert_eq!(report.skipped[1].reason, SkipReason::InvalidDate);
        assert!(report.non_transaction_lines > 0);

        let session_id = report.session_id.unwrap();
        let stored = db.get_import_session_transactions(session_id).unwrap();
        assert_eq!(
            stored.iter().map(|t| t.category).collect::<Vec<_>>(),
            vec![Category::Income, Category::Outcome, Category::Transfer]
        );
        assert_eq!(stored[0].amount, 1250.0);
        assert_eq!(stored[1].amount, -45.9);
        assert_eq!(stored[2].description, "To savings account");
        assert!(stored.iter().all(|t| t.account_holder_id == AccountHolderId(42)));

        let session = db.get_import_session(session_id).unwrap().unwrap();
        assert_eq!(session.status, ImportStatus::Completed);
        assert_eq!(session.source_name.as_deref(), Some("march.txt"));
        assert_eq!(session.candidate_count, 3);
        assert_eq!(session.imported_count, 3);
        assert_eq!(session.failed_count, 0);
        assert_eq!(session.skipped_count, 2);
        assert_eq!(session.text_sha256, text_fingerprint(SAMPLE_STATEMENT));
        assert_eq!(session.transfer_marker, "Transfers");
    }

    #[test]
    fn test_import_partial_failure() {
        let store = FlakyStore::failing_on(&[2]);
        let format = format();
        let text = "05.03.24  1 250,00 Salary Monthly payroll\n\
                    05.03.24  -45,90 Groceries Supermarket XY\n\
                    05.03.24  100,00 Transfers To savings account";

        let report = StatementImporter::new(&store, &format)
            .import_text(text, AccountHolderId(1), None);

        assert_eq!(report.imported_count, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].line_number, 2);
        assert_eq!(store.calls(), 3);

        let sessions = store.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].text_bytes, text.len() as i64);
        assert_eq!(sessions[0].source_name, None);

        let results = store.session_results().unwrap();
        assert_eq!(results.imported_count, 2);
        assert_eq!(results.failed_count, 1);
        assert_eq!(store.recorded_failures(), report.failures);
        assert!(!store.marked_failed());
    }

    #[test]
    fn test_import_all_inserts_fail_marks_session_failed() {
        let store = FlakyStore::failing_on(&[1]);
        let format = format();

        let report = StatementImporter::new(&store, &format)
            .import_text("05.03.24  -1,00 Fee Monthly fee", AccountHolderId(1), None);

        assert_eq!(report.imported_count, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(store.marked_failed());
    }

    #[test]
    fn test_import_without_history_still_stores_records() {
        let store = FlakyStore::without_history();
        let format = format();

        let report = StatementImporter::new(&store, &format).import_text(
            "05.03.24  1 250,00 Salary Monthly payroll\n05.03.24  -45,90 Groceries Supermarket XY",
            AccountHolderId(4),
            Some("march.txt"),
        );

        assert_eq!(report.session_id, None);
        assert_eq!(report.imported_count, 2);
        assert!(report.failures.is_empty());
        assert_eq!(store.calls(), 2);
        assert!(store.stored().iter().all(|t| t.import_session_id.is_none()));
        assert!(store.sessions().is_empty());
        assert!(store.session_results().is_none());
    }

    #[test]
    fn test_import_empty_text() {
        let db = Database::in_memory().unwrap();
        let format = format();

        let report = StatementImporter::new(&db, &format)
            .import_text("", AccountHolderId(1), None);

        assert_eq!(report.imported_count, 0);
        assert!(report.failures.is_empty());
        assert!(report.skipped.is_empty());
        assert_eq!(report.non_transaction_lines, 0);

        let session = db.get_import_session(report.session_id.unwrap()).unwrap().unwrap();
        assert_eq!(session.status, ImportStatus::Completed);
    }

    #[test]
    fn test_reimport_creates_duplicates() {
        let db = Database::in_memory().unwrap();
        let format = format();
        let importer = StatementImporter::new(&db, &format);

        let first = importer.import_text(SAMPLE_STATEMENT, AccountHolderId(5), None);
        let second = importer.import_text(SAMPLE_STATEMENT, AccountHolderId(5), None);

        assert_eq!(first.imported_count, second.imported_count);
        assert_ne!(first.session_id, second.session_id);
        assert_eq!(db.count_transactions(Some(AccountHolderId(5))).unwrap(), 6);
    }

    #[test]
    fn test_preview_does_not_persist() {
        let db = Database::in_memory().unwrap();
        let format = format();

        let preview = StatementImporter::new(&db, &format).preview(SAMPLE_STATEMENT, AccountHolderId(3));

        assert_eq!(preview.transactions.len(), 3);
        assert_eq!(preview.skipped.len(), 2);
        assert!(preview.transactions.iter().all(|t| t.import_session_id.is_none()));
        assert_eq!(db.count_transactions(None).unwrap(), 0);
        assert_eq!(db.count_import_sessions(None).unwrap(), 0);
    }

    #[test]
    fn test_text_fingerprint() {
        assert_eq!(
            text_fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(text_fingerprint("a"), text_fingerprint("b"));
    }
}
