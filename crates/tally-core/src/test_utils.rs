//! Test utilities for tally-core
//!
//! Sample statement text and an in-memory store that can be told to fail
//! specific inserts.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::config::StatementFormat;
use crate::error::{Error, Result};
use crate::import::ImportHistory;
use crate::materialize::TransactionStore;
use crate::models::{
    CandidateRecord, ImportFailure, ImportSessionResults, NewImportSession, NewTransaction,
};

/// Statement text as it comes out of a PDF: header, 3 transactions, noise
pub const SAMPLE_STATEMENT: &str = "\
Example Bank AG
Statement for account ending 1234
Date      Amount     Type       Details

05.03.24  1 250,00 Salary Monthly payroll
05.03.24  Opening balance carried forward
06.03.24  -45,90 Groceries Supermarket XY
31.02.24  -9,99 Streaming Monthly plan
07.03.24  100,00 Transfers To savings account

Page 1 of 1
";

/// The three readable records of [`SAMPLE_STATEMENT`]
pub fn sample_candidates() -> Vec<CandidateRecord> {
    StatementFormat::builtin()
        .expect("built-in format")
        .extract(SAMPLE_STATEMENT)
        .collect()
}

/// In-memory store whose inserts fail on chosen calls
///
/// Call numbers are 1-based: `failing_on(&[2])` fails the second insert.
#[derive(Default)]
pub struct FlakyStore {
    fail_on: Vec<usize>,
    calls: AtomicUsize,
    stored: Mutex<Vec<NewTransaction>>,
    sessions: Mutex<Vec<NewImportSession>>,
    results: Mutex<Option<ImportSessionResults>>,
    failures: Mutex<Vec<ImportFailure>>,
    failed: AtomicBool,
    history_down: bool,
}

impl FlakyStore {
    /// Store that never fails
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            fail_on: calls.to_vec(),
            ..Self::default()
        }
    }

    /// Store whose import sessions cannot be opened; inserts still work
    pub fn without_history() -> Self {
        Self {
            history_down: true,
            ..Self::default()
        }
    }

    /// Number of insert attempts so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Successfully stored transactions, in insert order
    pub fn stored(&self) -> Vec<NewTransaction> {
        self.stored.lock().unwrap().clone()
    }

    /// Import sessions opened so far
    pub fn sessions(&self) -> Vec<NewImportSession> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn session_results(&self) -> Option<ImportSessionResults> {
        *self.results.lock().unwrap()
    }

    pub fn recorded_failures(&self) -> Vec<ImportFailure> {
        self.failures.lock().unwrap().clone()
    }

    pub fn marked_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

impl TransactionStore for FlakyStore {
    fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(Error::Import(format!(
                "simulated storage failure on insert #{}",
                call
            )));
        }

        let mut stored = self.stored.lock().unwrap();
        stored.push(tx.clone());
        Ok(stored.len() as i64)
    }
}

impl ImportHistory for FlakyStore {
    fn create_import_session(&self, session: &NewImportSession) -> Result<i64> {
        if self.history_down {
            return Err(Error::Import("simulated import history failure".to_string()));
        }
        let mut sessions = self.sessions.lock().unwrap();
        sessions.push(session.clone());
        Ok(sessions.len() as i64)
    }

    fn finish_import_session(&self, _session_id: i64, results: &ImportSessionResults) -> Result<()> {
        *self.results.lock().unwrap() = Some(*results);
        Ok(())
    }

    fn mark_import_failed(&self, _session_id: i64, _error: &str) -> Result<()> {
        self.failed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn record_import_failures(&self, _session_id: i64, failures: &[ImportFailure]) -> Result<()> {
        self.failures.lock().unwrap().extend_from_slice(failures);
        Ok(())
    }
}
