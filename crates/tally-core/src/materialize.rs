//! Transaction materialization
//!
//! Classifies candidate records and persists them one by one through an
//! injected [`TransactionStore`]. A failed insert is recorded and the run
//! moves on to the next record.

use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{AccountHolderId, CandidateRecord, ImportFailure, NewTransaction};

/// Storage capability for materialized transactions
pub trait TransactionStore {
    /// Persist one transaction, returning its id
    fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64>;
}

impl<S: TransactionStore + ?Sized> TransactionStore for &S {
    fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        (**self).insert_transaction(tx)
    }
}

/// Result of materializing a batch of candidates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterializeOutcome {
    /// `(source_line, transaction_id)` of every persisted record, in input order
    pub inserted: Vec<(usize, i64)>,
    pub failures: Vec<ImportFailure>,
}

impl MaterializeOutcome {
    pub fn imported_count(&self) -> usize {
        self.inserted.len()
    }

    pub fn attempted(&self) -> usize {
        self.inserted.len() + self.failures.len()
    }
}

/// Classifies candidates and writes them to a store
pub struct Materializer<'a, S: TransactionStore + ?Sized> {
    store: &'a S,
    transfer_marker: &'a str,
    import_session_id: Option<i64>,
}

impl<'a, S: TransactionStore + ?Sized> Materializer<'a, S> {
    pub fn new(store: &'a S, transfer_marker: &'a str) -> Self {
        Self {
            store,
            transfer_marker,
            import_session_id: None,
        }
    }

    /// Tag every record with the import session that produced it
    pub fn with_session(mut self, import_session_id: i64) -> Self {
        self.import_session_id = Some(import_session_id);
        self
    }

    /// Classify a candidate without persisting it
    pub fn build(&self, candidate: CandidateRecord, account_holder_id: AccountHolderId) -> NewTransaction {
        let mut tx = NewTransaction::from_candidate(candidate, account_holder_id, self.transfer_marker);
        tx.import_session_id = self.import_session_id;
        tx
    }

    /// Classify and persist every candidate, in order
    pub fn materialize<I>(&self, candidates: I, account_holder_id: AccountHolderId) -> MaterializeOutcome
    where
        I: IntoIterator<Item = CandidateRecord>,
    {
        let mut outcome = MaterializeOutcome::default();
        for candidate in candidates {
            self.persist(candidate, account_holder_id, &mut outcome);
        }
        outcome
    }

    /// Classify and persist one candidate, recording the result in `outcome`
    pub fn persist(
        &self,
        candidate: CandidateRecord,
        account_holder_id: AccountHolderId,
        outcome: &mut MaterializeOutcome,
    ) {
        let tx = self.build(candidate, account_holder_id);
        match self.store.insert_transaction(&tx) {
            Ok(id) => {
                debug!(
                    "Line {}: {} {:.2} stored as transaction {}",
                    tx.source_line, tx.category, tx.amount, id
                );
                outcome.inserted.push((tx.source_line, id));
            }
            Err(e) => {
                warn!("Line {}: failed to store transaction: {}", tx.source_line, e);
                outcome.failures.push(ImportFailure {
                    line_number: tx.source_line,
                    reason: e.to_string(),
                });
            }
        }
    }
}
