//! Tally Core Library
//!
//! Imports bank statement text into classified transactions:
//! - Statement format config (line patterns, date and amount conventions)
//! - Line classification and field extraction
//! - Income/outcome/transfer classification and per-record persistence
//! - Import sessions with failure history
//! - Database access and migrations (SQLCipher)

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod import;
pub mod materialize;
pub mod models;

/// Sample statements and a failing store for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{default_config_path, AmountFormat, ConfigSource, DateLayout, StatementFormat};
pub use db::Database;
pub use error::{Error, Result};
pub use extract::{Candidates, LineOutcome, Scan, ScannedLine};
pub use import::{preview, text_fingerprint, ImportHistory, Preview, StatementImporter};
pub use materialize::{MaterializeOutcome, Materializer, TransactionStore};
pub use models::{
    AccountHolderId, CandidateRecord, Category, ImportFailure, ImportReport, ImportSession,
    ImportSessionResults, ImportStatus, NewImportSession, NewTransaction, SkipReason, SkippedLine,
    Transaction,
};
