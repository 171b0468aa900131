//! Processing ledger
//!
//! Durable audit trail of which files have been transcribed. Keyed by the
//! canonical identifier (path relative to the media root). Artifact presence
//! on disk, not this table, decides whether a file is skipped.

use chrono::{DateTime, Utc};
use lrcforge_common::time;
use lrcforge_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// One row of `transcribed_files`
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub file_id: i64,
    pub identifier: String,
    pub date_transcribed: Option<DateTime<Utc>>,
    pub date_added: Option<DateTime<Utc>>,
    pub created_date: DateTime<Utc>,
    pub last_modified_date: DateTime<Utc>,
}

/// Result of [`ProcessingLedger::record`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// New entry with its `file_id`
    Inserted(i64),
    /// An entry for the identifier already existed and was left untouched
    AlreadyRecorded,
}

/// Ledger backed by the `transcribed_files` table
#[derive(Clone)]
pub struct ProcessingLedger {
    pool: SqlitePool,
}

impl ProcessingLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// True iff an entry exists for `identifier`
    pub async fn exists(&self, identifier: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM transcribed_files WHERE file_location = ?")
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Insert an entry for `identifier`
    ///
    /// A second record for the same identifier is not an error; the existing
    /// row keeps its original timestamps.
    pub async fn record(
        &self,
        identifier: &str,
        transcribed_at: DateTime<Utc>,
        added_at: DateTime<Utc>,
    ) -> Result<RecordOutcome> {
        let now = time::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO transcribed_files
                (file_location, date_transcribed, date_added, created_date, last_modified_date)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(identifier)
        .bind(transcribed_at.to_rfc3339())
        .bind(added_at.to_rfc3339())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(RecordOutcome::Inserted(done.last_insert_rowid())),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                tracing::debug!(identifier, "Ledger entry already present");
                Ok(RecordOutcome::AlreadyRecorded)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load the entry for `identifier`
    pub async fn get(&self, identifier: &str) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query(
            r#"
            SELECT file_id, file_location, date_transcribed, date_added,
                   created_date, last_modified_date
            FROM transcribed_files
            WHERE file_location = ?
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| entry_from_row(&r)).transpose()
    }

    /// All entries ordered by identifier
    pub async fn list_all(&self) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT file_id, file_location, date_transcribed, date_added,
                   created_date, last_modified_date
            FROM transcribed_files
            ORDER BY file_location
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    /// Remove the entry for `identifier`; false if there was none
    pub async fn delete(&self, identifier: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM transcribed_files WHERE file_location = ?")
            .bind(identifier)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set `date_transcribed`; false if there was no entry
    pub async fn update_transcribed_at(
        &self,
        identifier: &str,
        transcribed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE transcribed_files
            SET date_transcribed = ?, last_modified_date = ?
            WHERE file_location = ?
            "#,
        )
        .bind(transcribed_at.to_rfc3339())
        .bind(time::now().to_rfc3339())
        .bind(identifier)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn entry_from_row(row: &SqliteRow) -> Result<LedgerEntry> {
    let parse_optional = |column: &str| -> Result<Option<DateTime<Utc>>> {
        let value: Option<String> = row.try_get(column)?;
        value
            .filter(|v| !v.is_empty())
            .map(|v| time::parse_rfc3339(&v))
            .transpose()
    };

    let created: String = row.try_get("created_date")?;
    let modified: String = row.try_get("last_modified_date")?;

    Ok(LedgerEntry {
        file_id: row.try_get("file_id")?,
        identifier: row.try_get("file_location")?,
        date_transcribed: parse_optional("date_transcribed")?,
        date_added: parse_optional("date_added")?,
        created_date: time::parse_rfc3339(&created)?,
        last_modified_date: time::parse_rfc3339(&modified)?,
    })
}
