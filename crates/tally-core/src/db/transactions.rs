//! Transaction operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::materialize::TransactionStore;
use crate::models::{AccountHolderId, Category, NewTransaction, Transaction};

const TRANSACTION_COLUMNS: &str = "id, account_holder_id, date, amount, category, description, \
     import_session_id, source_line, created_at";

impl Database {
    /// Insert a transaction as its own statement
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO transactions (account_holder_id, date, amount, category, description, import_session_id, source_line)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.account_holder_id.0,
                tx.date.to_string(),
                tx.amount,
                tx.category.as_str(),
                tx.description,
                tx.import_session_id,
                tx.source_line as i64,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a single transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS),
                params![id],
                Self::row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// Transactions created by one import session, in statement order
    pub fn get_import_session_transactions(&self, session_id: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE import_session_id = ? ORDER BY source_line, id",
            TRANSACTION_COLUMNS
        ))?;

        let transactions = stmt
            .query_map(params![session_id], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Count transactions, optionally for one account holder
    pub fn count_transactions(&self, holder: Option<AccountHolderId>) -> Result<i64> {
        let conn = self.conn()?;
        let count = match holder {
            Some(holder) => conn.query_row(
                "SELECT COUNT(*) FROM transactions WHERE account_holder_id = ?",
                params![holder.0],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?,
        };
        Ok(count)
    }

    fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(2)?;
        let category_str: String = row.get(4)?;
        let created_at_str: String = row.get(8)?;

        let category = category_str.parse::<Category>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?;

        Ok(Transaction {
            id: row.get(0)?,
            account_holder_id: AccountHolderId(row.get(1)?),
            date: chrono::NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
            amount: row.get(3)?,
            category,
            description: row.get(5)?,
            import_session_id: row.get(6)?,
            source_line: row.get(7)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}

impl TransactionStore for Database {
    fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        Database::insert_transaction(self, tx)
    }
}
