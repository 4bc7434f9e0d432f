//! salmon - versioned SQL migrations for a host application
//!
//! Reconciles a directory of `V<version>__<description>.sql` files against the
//! migration history recorded in the target database and applies whatever is
//! missing. Versions form a contiguous sequence starting at 0, applied
//! migrations are pinned by checksum, and a sentinel row in the history table
//! keeps two runs from applying migrations at the same time.
//!
//! ```rust,ignore
//! use salmon::{migrate, MigrateOptions};
//! use salmon_db::DuckDbBackend;
//!
//! let db = DuckDbBackend::new("app.duckdb")?;
//! let report = migrate(&db, &MigrateOptions::default().with_directory("db/migrations"))?;
//! println!("applied {:?}", report.applied);
//! ```

pub mod checksum;
pub mod config;
pub mod discovery;
pub mod error;
pub mod filesystem;
pub mod history;
pub mod migrate;
pub mod migration;

pub use checksum::compute_checksum;
pub use config::MigrateOptions;
pub use error::{MigrateError, MigrateResult};
pub use filesystem::{EmbeddedFs, MemoryFs, MigrationFs, OsFs};
pub use history::{AppliedMigration, HistoryStore, LOCK_VERSION};
pub use migrate::{migrate, unlock, MigrateReport};
pub use migration::Migration;
