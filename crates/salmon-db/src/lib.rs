//! salmon-db - Database abstraction layer for Salmon
//!
//! This crate provides the synchronous `Database` trait the migration engine
//! talks to, and a DuckDB implementation of it.

pub mod duckdb;
pub mod error;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{with_transaction, Database, Row, SqlValue};
