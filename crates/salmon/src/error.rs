//! Error types for salmon

use salmon_db::DbError;
use thiserror::Error;

/// Migration run errors
#[derive(Error, Debug)]
pub enum MigrateError {
    /// S001: Configured migration directory is missing
    #[error("[S001] {path} directory does not exist")]
    DirectoryNotFound { path: String },

    /// S002: Migration filename does not follow `V<version>__<description>.<ext>`
    #[error("[S002] invalid filename format: {filename}")]
    InvalidFilename { filename: String },

    /// S003: Versions are not the contiguous sequence 0..N
    #[error("[S003] invalid version: expected {expected}, got {actual}")]
    InvalidVersionSequence { expected: i64, actual: i64 },

    /// S004: An applied migration's file changed since it was applied
    #[error("[S004] checksum does not match expected value: {file}")]
    ChecksumMismatch { file: String },

    /// S005: Another run holds the lock row
    #[error("[S005] migration lock is already held on {table}; if no other run is in progress, run `delete from {table} where version = -1;` and try again")]
    LockAlreadyHeld { table: String },

    /// S006: The lock row could not be deleted
    #[error("[S006] could not release migration lock on {table}: {source}")]
    LockReleaseFailed {
        table: String,
        #[source]
        source: DbError,
    },

    /// S007: Lock release failed at the end of a run; needs an operator
    #[error("{}", lock_stuck_message(.table, .source, .original.as_deref()))]
    LockStuck {
        table: String,
        #[source]
        source: DbError,
        original: Option<Box<MigrateError>>,
    },

    /// S008: Migration body is not valid UTF-8
    #[error("[S008] migration file is not valid UTF-8: {path}")]
    InvalidContent { path: String },

    /// S009: Filesystem error with path context
    #[error("[S009] Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// S010: Options file not found
    #[error("[S010] Options file not found: {path}")]
    ConfigNotFound { path: String },

    /// S011: Options file could not be parsed
    #[error("[S011] Failed to parse options: {0}")]
    ConfigParseError(#[from] serde_yaml::Error),

    /// S012: Invalid option value
    #[error("[S012] Invalid options: {message}")]
    ConfigInvalid { message: String },

    /// Database driver error, passed through unchanged
    #[error(transparent)]
    Database(#[from] DbError),
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;

fn lock_stuck_message(table: &str, source: &DbError, original: Option<&MigrateError>) -> String {
    let head = format!(
        "[S007] ATTENTION: could not release lock! please run `delete from {table} where version = -1;` and try again.\noriginal err: {source}"
    );
    match original {
        Some(original) => format!("{head}\nfrom: {original}"),
        None => head,
    }
}

impl MigrateError {
    /// True when the database was left locked and needs manual cleanup.
    pub fn is_lock_stuck(&self) -> bool {
        matches!(self, MigrateError::LockStuck { .. })
    }

    /// The failure that ended the run before the lock got stuck, if any.
    pub fn original(&self) -> Option<&MigrateError> {
        match self {
            MigrateError::LockStuck { original, .. } => original.as_deref(),
            _ => None,
        }
    }
}
