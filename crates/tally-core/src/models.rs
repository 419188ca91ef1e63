//! Domain models for Tally

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the account holder that imported transactions belong to
///
/// Issued by the identity store; the pipeline only carries it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountHolderId(pub i64);

impl std::fmt::Display for AccountHolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Semantic classification of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Income,
    Outcome,
    Transfer,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Outcome => "outcome",
            Self::Transfer => "transfer",
        }
    }

    /// Classify a statement line
    ///
    /// The transfer marker wins over the amount sign. Zero is `Outcome`.
    pub fn classify(type_token: &str, amount: f64, transfer_marker: &str) -> Self {
        if type_token == transfer_marker {
            Self::Transfer
        } else if amount > 0.0 {
            Self::Income
        } else {
            Self::Outcome
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "outcome" => Ok(Self::Outcome),
            "transfer" => Ok(Self::Transfer),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields extracted from one statement line, before enrichment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRecord {
    /// 1-based line number in the source text
    pub line_number: usize,
    /// Date exactly as printed (e.g. "05.03.24")
    pub raw_date: String,
    pub date: NaiveDate,
    /// Amount exactly as printed, grouping separators included
    pub raw_amount: String,
    /// Signed amount after normalization
    pub amount: f64,
    /// The statement's own label for the line (transfer marker, merchant code, ...)
    pub type_token: String,
    pub details: String,
}

/// A transaction ready to be persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTransaction {
    pub account_holder_id: AccountHolderId,
    pub date: NaiveDate,
    /// Negative = money out, positive = money in
    pub amount: f64,
    pub category: Category,
    pub description: String,
    /// Line of the statement text this record came from
    pub source_line: usize,
    pub import_session_id: Option<i64>,
}

impl NewTransaction {
    /// Enrich a candidate record with its category and owner
    pub fn from_candidate(
        candidate: CandidateRecord,
        account_holder_id: AccountHolderId,
        transfer_marker: &str,
    ) -> Self {
        let category = Category::classify(&candidate.type_token, candidate.amount, transfer_marker);
        Self {
            account_holder_id,
            date: candidate.date,
            amount: candidate.amount,
            category,
            description: candidate.details,
            source_line: candidate.line_number,
            import_session_id: None,
        }
    }
}

/// A persisted transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_holder_id: AccountHolderId,
    pub date: NaiveDate,
    pub amount: f64,
    pub category: Category,
    pub description: String,
    pub import_session_id: Option<i64>,
    pub source_line: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Why a line did not produce a candidate record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Fails the cheap date-prefix test (headers, footers, blank lines)
    NonTransactionLine,
    /// Has a date prefix but does not match the full line pattern
    MalformedLine,
    /// Amount text could not be normalized into a number
    ///
    /// The line matched the full pattern but is still not emitted.
    NumericParseFailure,
    /// Date text is not a real calendar date, e.g. `31.02.24`
    ///
    /// Like [`SkipReason::NumericParseFailure`] this drops a line that matched
    /// the full pattern: a record without a date cannot be stored, so the line
    /// is reported here instead of being emitted.
    InvalidDate,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonTransactionLine => "non_transaction_line",
            Self::MalformedLine => "malformed_line",
            Self::NumericParseFailure => "numeric_parse_failure",
            Self::InvalidDate => "invalid_date",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A line that looked like a transaction but was rejected
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedLine {
    pub line_number: usize,
    pub reason: SkipReason,
    pub text: String,
}

/// A record whose persistence failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFailure {
    pub line_number: usize,
    pub reason: String,
}

/// Caller-facing result of one import
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub session_id: Option<i64>,
    pub imported_count: usize,
    pub failures: Vec<ImportFailure>,
    pub skipped: Vec<SkippedLine>,
    /// Lines failing the date-prefix test (counted only)
    pub non_transaction_lines: usize,
}

/// Import session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    #[default]
    Processing,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown import status: {}", s)),
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// History row for one import run
#[derive(Debug, Clone, Serialize)]
pub struct ImportSession {
    pub id: i64,
    pub account_holder_id: AccountHolderId,
    /// File name, or "-" for stdin
    pub source_name: Option<String>,
    pub text_bytes: i64,
    /// SHA-256 of the imported text (audit only)
    pub text_sha256: String,
    pub transfer_marker: String,
    pub candidate_count: i64,
    pub imported_count: i64,
    pub failed_count: i64,
    pub skipped_count: i64,
    pub status: ImportStatus,
    pub error: Option<String>,
    pub duration_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Data needed to open an import session
#[derive(Debug, Clone)]
pub struct NewImportSession {
    pub account_holder_id: AccountHolderId,
    pub source_name: Option<String>,
    pub text_bytes: i64,
    pub text_sha256: String,
    pub transfer_marker: String,
}

/// Final counts written when an import session closes
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportSessionResults {
    pub candidate_count: i64,
    pub imported_count: i64,
    pub failed_count: i64,
    pub skipped_count: i64,
    pub duration_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_transfer_wins_over_sign() {
        assert_eq!(
            Category::classify("Transfers", 100.0, "Transfers"),
            Category::Transfer
        );
        assert_eq!(
            Category::classify("Transfers", -100.0, "Transfers"),
            Category::Transfer
        );
    }

    #[test]
    fn test_classify_by_sign() {
        assert_eq!(Category::classify("Salary", 1250.0, "Transfers"), Category::Income);
        assert_eq!(Category::classify("Groceries", -45.9, "Transfers"), Category::Outcome);
    }

    #[test]
    fn test_classify_zero_is_outcome() {
        // Documented boundary: `> 0` is the income test, so zero falls through
        assert_eq!(Category::classify("Fee", 0.0, "Transfers"), Category::Outcome);
    }

    #[test]
    fn test_classify_marker_is_case_sensitive() {
        assert_eq!(Category::classify("transfers", 10.0, "Transfers"), Category::Income);
    }

    #[test]
    fn test_category_roundtrip_str() {
        for cat in [Category::Income, Category::Outcome, Category::Transfer] {
            assert_eq!(cat.as_str().parse::<Category>().unwrap(), cat);
        }
        assert!("refund".parse::<Category>().is_err());
    }

    #[test]
    fn test_new_transaction_from_candidate() {
        let candidate = CandidateRecord {
            line_number: 7,
            raw_date: "05.03.24".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            raw_amount: "100,00".to_string(),
            amount: 100.0,
            type_token: "Transfers".to_string(),
            details: "To savings account".to_string(),
        };

        let tx = NewTransaction::from_candidate(candidate, AccountHolderId(42), "Transfers");
        assert_eq!(tx.account_holder_id, AccountHolderId(42));
        assert_eq!(tx.category, Category::Transfer);
        assert_eq!(tx.description, "To savings account");
        assert_eq!(tx.source_line, 7);
        assert_eq!(tx.import_session_id, None);
    }
}
