//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{Database, Row, SqlValue};
use duckdb::types::{ToSql, ToSqlOutput, Value};
use duckdb::{params_from_iter, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Integer(v) => ToSqlOutput::Owned(Value::BigInt(*v)),
            SqlValue::Text(s) => ToSqlOutput::Owned(Value::Text(s.clone())),
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

/// Narrow a DuckDB value to the integer/text/null set the trait exposes.
fn from_duckdb_value(value: Value, column: usize) -> DbResult<SqlValue> {
    let converted = match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Integer(i64::from(b)),
        Value::TinyInt(v) => SqlValue::Integer(i64::from(v)),
        Value::SmallInt(v) => SqlValue::Integer(i64::from(v)),
        Value::Int(v) => SqlValue::Integer(i64::from(v)),
        Value::BigInt(v) => SqlValue::Integer(v),
        Value::UTinyInt(v) => SqlValue::Integer(i64::from(v)),
        Value::USmallInt(v) => SqlValue::Integer(i64::from(v)),
        Value::UInt(v) => SqlValue::Integer(i64::from(v)),
        Value::UBigInt(v) => SqlValue::Integer(i64::try_from(v).map_err(|_| {
            DbError::TypeMismatch {
                column,
                expected: "integer within i64 range".to_string(),
            }
        })?),
        Value::Text(s) => SqlValue::Text(s),
        other => {
            return Err(DbError::TypeMismatch {
                column,
                expected: format!("integer, text or null (found {other:?})"),
            })
        }
    };
    Ok(converted)
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn connection(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }
}

impl Database for DuckDbBackend {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        let conn = self.connection()?;
        conn.execute(sql, params_from_iter(params.iter()))
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.connection()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Row>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql)?;

        // DuckDB panics on `stmt.column_count()` before execution, so the
        // width is read from each row instead.
        let raw_rows: Vec<Vec<Value>> = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                let col_count = row.as_ref().column_count();
                (0..col_count)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<duckdb::Result<Vec<_>>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw_rows
            .into_iter()
            .map(|values| {
                values
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| from_duckdb_value(v, i))
                    .collect::<DbResult<Vec<_>>>()
                    .map(Row)
            })
            .collect()
    }

    fn begin(&self) -> DbResult<()> {
        let conn = self.connection()?;
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))
    }

    fn commit(&self) -> DbResult<()> {
        let conn = self.connection()?;
        conn.execute_batch("COMMIT")
            .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {e}")))
    }

    fn rollback(&self) -> DbResult<()> {
        let conn = self.connection()?;
        conn.execute_batch("ROLLBACK")
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
