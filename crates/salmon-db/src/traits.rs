//! Database trait definition

use crate::error::{DbError, DbResult};

/// A parameter or column value exchanged with the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Integer(i64),
    Text(String),
    Null,
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

/// A single result row, in select-list order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row(pub Vec<SqlValue>);

impl Row {
    /// Read column `idx` as an integer.
    pub fn get_i64(&self, idx: usize) -> DbResult<i64> {
        match self.0.get(idx) {
            Some(SqlValue::Integer(v)) => Ok(*v),
            _ => Err(DbError::TypeMismatch {
                column: idx,
                expected: "integer".to_string(),
            }),
        }
    }

    /// Read column `idx` as text.
    pub fn get_str(&self, idx: usize) -> DbResult<&str> {
        match self.0.get(idx) {
            Some(SqlValue::Text(v)) => Ok(v),
            _ => Err(DbError::TypeMismatch {
                column: idx,
                expected: "text".to_string(),
            }),
        }
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Database abstraction trait for Salmon
///
/// Calls are synchronous and blocking. Parameters bind positionally to `?`
/// placeholders. A connection is expected to be driven by one migration run
/// at a time, since `begin`/`commit`/`rollback` act on the connection itself.
pub trait Database {
    /// Execute a single statement, returns affected rows
    fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize>;

    /// Execute multiple SQL statements
    fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query and collect every row
    fn query(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Row>>;

    /// Open a transaction
    fn begin(&self) -> DbResult<()>;

    /// Commit the open transaction
    fn commit(&self) -> DbResult<()>;

    /// Roll back the open transaction
    fn rollback(&self) -> DbResult<()>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// Execute `body` within a `begin` / `commit` pair, rolling back on error.
///
/// A failed commit is rolled back too and reported as a transaction error.
/// The error type only needs to absorb [`DbError`], so callers can run bodies
/// that fail with their own error enums.
pub fn with_transaction<D, F, T, E>(db: &D, body: F) -> Result<T, E>
where
    D: Database + ?Sized,
    F: FnOnce(&D) -> Result<T, E>,
    E: From<DbError>,
{
    db.begin()?;

    let result = body(db);

    match &result {
        Ok(_) => {
            if let Err(commit_err) = db.commit() {
                let _ = db.rollback();
                return Err(DbError::TransactionError(format!("COMMIT failed: {commit_err}")).into());
            }
        }
        Err(_) => {
            let _ = db.rollback();
        }
    }
    result
}
