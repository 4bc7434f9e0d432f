//! Migration file model and filename parsing.
//!
//! Filenames follow `V<version>__<description>.<ext>`: a literal `V`, a
//! non-negative decimal version, a double underscore, then free text up to the
//! extension. Only the first `__` splits, so descriptions may contain
//! underscores of their own.

use crate::checksum::compute_checksum;
use crate::error::{MigrateError, MigrateResult};

const VERSION_MARKER: char = 'V';
const SEPARATOR: &str = "__";

/// A single versioned unit of schema change, rebuilt from its file on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Position in the contiguous sequence starting at 0
    pub version: i64,
    /// Label taken from the filename
    pub description: String,
    /// SHA-256 of the raw file bytes
    pub checksum: String,
    /// The statement batch to execute
    pub content: String,
    /// Path the migration was read from
    pub path: String,
}

impl Migration {
    /// Build a migration from a file path and its raw bytes.
    pub fn from_source(path: &str, bytes: Vec<u8>) -> MigrateResult<Self> {
        let (version, description) = parse_filename(path)?;
        let checksum = compute_checksum(&bytes);
        let content = String::from_utf8(bytes).map_err(|_| MigrateError::InvalidContent {
            path: path.to_string(),
        })?;
        Ok(Self {
            version,
            description,
            checksum,
            content,
            path: path.to_string(),
        })
    }

    /// The filename part of [`path`](Self::path).
    pub fn file_name(&self) -> &str {
        base_name(&self.path)
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Split a migration path into `(version, description)`.
///
/// The description runs from the separator to the last `.`; a name without
/// an extension keeps the whole remainder.
pub fn parse_filename(path: &str) -> MigrateResult<(i64, String)> {
    let basename = base_name(path);
    let invalid = || MigrateError::InvalidFilename {
        filename: basename.to_string(),
    };

    let (version_token, rest) = basename.split_once(SEPARATOR).ok_or_else(invalid)?;
    let digits = version_token
        .strip_prefix(VERSION_MARKER)
        .ok_or_else(invalid)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let version: i64 = digits.parse().map_err(|_| invalid())?;

    let description = match rest.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => rest,
    };

    Ok((version, description.to_string()))
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
