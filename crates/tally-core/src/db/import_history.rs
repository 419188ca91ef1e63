//! Import history operations

use chrono::Duration;
use rusqlite::{params, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::import::ImportHistory;
use crate::models::{
    AccountHolderId, ImportFailure, ImportSession, ImportSessionResults, ImportStatus,
    NewImportSession,
};

const SESSION_COLUMNS: &str = "id, account_holder_id, source_name, text_bytes, text_sha256, \
     transfer_marker, candidate_count, imported_count, failed_count, skipped_count, \
     status, error, duration_ms, created_at";

impl Database {
    /// Create a new import session in `processing` state
    pub fn create_import_session(&self, session: &NewImportSession) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO import_sessions (account_holder_id, source_name, text_bytes, text_sha256, transfer_marker, status)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                session.account_holder_id.0,
                session.source_name,
                session.text_bytes,
                session.text_sha256,
                session.transfer_marker,
                ImportStatus::Processing.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Close an import session with its final counts
    pub fn finish_import_session(
        &self,
        session_id: i64,
        results: &ImportSessionResults,
    ) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE import_sessions SET
                candidate_count = ?,
                imported_count = ?,
                failed_count = ?,
                skipped_count = ?,
                duration_ms = ?,
                status = ?
            WHERE id = ?
            "#,
            params![
                results.candidate_count,
                results.imported_count,
                results.failed_count,
                results.skipped_count,
                results.duration_ms,
                ImportStatus::Completed.as_str(),
                session_id,
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Import session {}", session_id)));
        }
        Ok(())
    }

    /// Mark import session as failed
    pub fn mark_import_failed(&self, session_id: i64, error: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE import_sessions SET status = ?, error = ? WHERE id = ?",
            params![ImportStatus::Failed.as_str(), error, session_id],
        )?;
        Ok(())
    }

    /// Mark sessions left in `processing` (e.g. by a killed process) as failed
    ///
    /// Only sessions created at least `older_than` ago are touched, so an
    /// import still running in another process is left alone. Returns the
    /// number of sessions recovered.
    pub fn recover_stuck_imports(&self, older_than: Duration) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.execute(
            "UPDATE import_sessions SET status = ?, error = ?
             WHERE status = ? AND created_at <= datetime('now', ?)",
            params![
                ImportStatus::Failed.as_str(),
                "Import was interrupted before it finished",
                ImportStatus::Processing.as_str(),
                format!("-{} seconds", older_than.num_seconds().max(0)),
            ],
        )?;
        Ok(count as i64)
    }

    /// Record the records of a session whose insert failed
    pub fn record_import_failures(&self, session_id: i64, failures: &[ImportFailure]) -> Result<()> {
        if failures.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO import_failures (import_session_id, line_number, reason) VALUES (?, ?, ?)",
            )?;
            for failure in failures {
                stmt.execute(params![session_id, failure.line_number as i64, failure.reason])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Failures recorded for a session, in line order
    pub fn get_import_failures(&self, session_id: i64) -> Result<Vec<ImportFailure>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT line_number, reason
            FROM import_failures
            WHERE import_session_id = ?
            ORDER BY line_number, id
            "#,
        )?;

        let failures = stmt
            .query_map(params![session_id], |row| {
                let line_number: i64 = row.get(0)?;
                Ok(ImportFailure {
                    line_number: line_number as usize,
                    reason: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(failures)
    }

    /// List import sessions, newest first, with optional account holder filter
    pub fn list_import_sessions(
        &self,
        holder: Option<AccountHolderId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ImportSession>> {
        let conn = self.conn()?;

        let sessions = if let Some(holder) = holder {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM import_sessions WHERE account_holder_id = ? \
                 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                SESSION_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![holder.0, limit, offset], Self::map_import_session_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM import_sessions ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                SESSION_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![limit, offset], Self::map_import_session_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        Ok(sessions)
    }

    /// Count import sessions with optional account holder filter
    pub fn count_import_sessions(&self, holder: Option<AccountHolderId>) -> Result<i64> {
        let conn = self.conn()?;

        let count: i64 = if let Some(holder) = holder {
            conn.query_row(
                "SELECT COUNT(*) FROM import_sessions WHERE account_holder_id = ?",
                params![holder.0],
                |row| row.get(0),
            )?
        } else {
            conn.query_row("SELECT COUNT(*) FROM import_sessions", [], |row| row.get(0))?
        };

        Ok(count)
    }

    /// Get a single import session by ID
    pub fn get_import_session(&self, id: i64) -> Result<Option<ImportSession>> {
        let conn = self.conn()?;

        let result = conn.query_row(
            &format!("SELECT {} FROM import_sessions WHERE id = ?", SESSION_COLUMNS),
            params![id],
            Self::map_import_session_row,
        );

        match result {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn map_import_session_row(row: &Row) -> rusqlite::Result<ImportSession> {
        let status_str: String = row.get(10)?;
        let created_at_str: String = row.get(13)?;

        Ok(ImportSession {
            id: row.get(0)?,
            account_holder_id: AccountHolderId(row.get(1)?),
            source_name: row.get(2)?,
            text_bytes: row.get(3)?,
            text_sha256: row.get(4)?,
            transfer_marker: row.get(5)?,
            candidate_count: row.get(6)?,
            imported_count: row.get(7)?,
            failed_count: row.get(8)?,
            skipped_count: row.get(9)?,
            status: status_str.parse().unwrap_or_default(),
            error: row.get(11)?,
            duration_ms: row.get(12)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}

impl ImportHistory for Database {
    fn create_import_session(&self, session: &NewImportSession) -> Result<i64> {
        Database::create_import_session(self, session)
    }

    fn finish_import_session(&self, session_id: i64, results: &ImportSessionResults) -> Result<()> {
        Database::finish_import_session(self, session_id, results)
    }

    fn mark_import_failed(&self, session_id: i64, error: &str) -> Result<()> {
        Database::mark_import_failed(self, session_id, error)
    }

    fn record_import_failures(&self, session_id: i64, failures: &[ImportFailure]) -> Result<()> {
        Database::record_import_failures(self, session_id, failures)
    }
}
