//! Persisted migration history and the run lock.
//!
//! Applied migrations and the lock share one table. The lock is a sentinel
//! row at [`LOCK_VERSION`]; the `UNIQUE` constraint on `version` turns its
//! insert into an atomic test-and-set, so a second concurrent run fails to
//! insert instead of racing past.

use crate::error::{MigrateError, MigrateResult};
use crate::migration::Migration;
use chrono::NaiveDateTime;
use salmon_db::{with_transaction, Database, DbError, Row, SqlValue};

/// Version value reserved for the lock row.
pub const LOCK_VERSION: i64 = -1;

const LOCK_DESCRIPTION: &str = "<< salmon lock >>";

/// A migration the history says has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub version: i64,
    pub description: String,
    pub checksum: String,
    pub applied_at: NaiveDateTime,
}

impl AppliedMigration {
    fn from_row(row: &Row) -> MigrateResult<Self> {
        let raw_applied_at = row.get_str(3)?;
        let applied_at = NaiveDateTime::parse_from_str(raw_applied_at, "%Y-%m-%d %H:%M:%S%.f")
            .map_err(|e| {
                DbError::Internal(format!("unreadable applied_at '{raw_applied_at}': {e}"))
            })?;
        Ok(Self {
            version: row.get_i64(0)?,
            description: row.get_str(1)?.to_string(),
            checksum: row.get_str(2)?.to_string(),
            applied_at,
        })
    }
}

/// Owner of the history table. The engine reads through it and never writes
/// to the table directly.
pub struct HistoryStore<'a, D: Database + ?Sized> {
    db: &'a D,
    table: String,
}

impl<'a, D: Database + ?Sized> HistoryStore<'a, D> {
    /// `table` must already be a validated identifier; it is spliced into SQL.
    pub fn new(db: &'a D, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the history table if it is missing. Safe to call on every run.
    pub fn ensure_schema(&self) -> MigrateResult<()> {
        let table = &self.table;
        self.db.execute_batch(&format!(
            "CREATE SEQUENCE IF NOT EXISTS {table}_id_seq;
             CREATE TABLE IF NOT EXISTS {table} (
                 id          BIGINT PRIMARY KEY DEFAULT nextval('{table}_id_seq'),
                 version     BIGINT NOT NULL UNIQUE,
                 description VARCHAR NOT NULL,
                 checksum    VARCHAR NOT NULL,
                 applied_at  TIMESTAMP NOT NULL DEFAULT current_timestamp
             );"
        ))?;
        Ok(())
    }

    /// All applied migrations, ascending by version, without the lock row.
    pub fn load_applied(&self) -> MigrateResult<Vec<AppliedMigration>> {
        let rows = self.db.query(
            &format!(
                "SELECT version, description, checksum, CAST(applied_at AS VARCHAR)
                 FROM {} WHERE version > ? ORDER BY version",
                self.table
            ),
            &[SqlValue::Integer(LOCK_VERSION)],
        )?;
        rows.iter().map(AppliedMigration::from_row).collect()
    }

    /// Whether the lock row is present.
    pub fn is_locked(&self) -> MigrateResult<bool> {
        Ok(self.version_exists(LOCK_VERSION)?)
    }

    /// Insert the lock row, failing with `LockAlreadyHeld` if it is present.
    pub fn acquire_lock(&self) -> MigrateResult<()> {
        let insert = self.db.execute(
            &format!(
                "INSERT INTO {} (version, description, checksum) VALUES (?, ?, ?)",
                self.table
            ),
            &[
                SqlValue::Integer(LOCK_VERSION),
                SqlValue::from(LOCK_DESCRIPTION),
                SqlValue::from(""),
            ],
        );
        match insert {
            Ok(_) => Ok(()),
            Err(err) => {
                // Constraint error text differs per driver; the row decides.
                if self.version_exists(LOCK_VERSION).unwrap_or(false) {
                    Err(MigrateError::LockAlreadyHeld {
                        table: self.table.clone(),
                    })
                } else {
                    Err(err.into())
                }
            }
        }
    }

    /// Delete the lock row.
    pub fn release_lock(&self) -> MigrateResult<()> {
        self.db
            .execute(
                &format!("DELETE FROM {} WHERE version = ?", self.table),
                &[SqlValue::Integer(LOCK_VERSION)],
            )
            .map_err(|source| MigrateError::LockReleaseFailed {
                table: self.table.clone(),
                source,
            })?;
        Ok(())
    }

    /// Record `migration` and execute its statements in one transaction.
    ///
    /// Returns `false` without executing anything when the version is already
    /// recorded, which covers a retried run racing a finished one. Any failure
    /// rolls back both the history row and the schema change.
    pub fn record_and_apply(&self, migration: &Migration) -> MigrateResult<bool> {
        with_transaction(self.db, |db| -> MigrateResult<bool> {
            let existing = db.query(
                &format!("SELECT 1 FROM {} WHERE version = ?", self.table),
                &[SqlValue::Integer(migration.version)],
            )?;
            if !existing.is_empty() {
                return Ok(false);
            }

            db.execute(
                &format!(
                    "INSERT INTO {} (version, description, checksum) VALUES (?, ?, ?)",
                    self.table
                ),
                &[
                    SqlValue::Integer(migration.version),
                    SqlValue::from(migration.description.as_str()),
                    SqlValue::from(migration.checksum.as_str()),
                ],
            )?;

            db.execute_batch(&migration.content)?;
            Ok(true)
        })
    }

    fn version_exists(&self, version: i64) -> Result<bool, DbError> {
        let rows = self.db.query(
            &format!("SELECT 1 FROM {} WHERE version = ?", self.table),
            &[SqlValue::Integer(version)],
        )?;
        Ok(!rows.is_empty())
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
