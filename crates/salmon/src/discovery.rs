//! Migration discovery, version validation, and delta computation.

use crate::error::{MigrateError, MigrateResult};
use crate::filesystem::MigrationFs;
use crate::history::AppliedMigration;
use crate::migration::Migration;
use glob::Pattern;
use std::collections::HashMap;

/// Read every `*.<extension>` file directly under `directory`.
///
/// All listed files must be well-formed migration names. The result keeps
/// the listing order; nothing downstream relies on it.
pub fn discover(
    fs: &dyn MigrationFs,
    directory: &str,
    extension: &str,
) -> MigrateResult<Vec<Migration>> {
    let exists = fs.exists(directory).map_err(|e| MigrateError::Io {
        path: directory.to_string(),
        source: e,
    })?;
    if !exists {
        return Err(MigrateError::DirectoryNotFound {
            path: directory.to_string(),
        });
    }

    let dir = directory.trim_end_matches('/');
    let pattern = format!("{}/*.{}", Pattern::escape(dir), Pattern::escape(extension));
    let paths = fs.list(&pattern).map_err(|e| MigrateError::Io {
        path: pattern.clone(),
        source: e,
    })?;

    let mut migrations = Vec::with_capacity(paths.len());
    for path in paths {
        // Reject the name before paying for the read.
        crate::migration::parse_filename(&path)?;
        let bytes = fs.read_all(&path).map_err(|e| MigrateError::Io {
            path: path.clone(),
            source: e,
        })?;
        migrations.push(Migration::from_source(&path, bytes)?);
    }
    Ok(migrations)
}

/// Require the versions to be exactly `0..N` once sorted.
///
/// Gaps, duplicates, and a non-zero start all fail at the first index whose
/// version differs from the index.
pub fn validate_versions(versions: &[i64]) -> MigrateResult<()> {
    let mut sorted = versions.to_vec();
    sorted.sort_unstable();
    for (expected, &actual) in (0_i64..).zip(sorted.iter()) {
        if actual != expected {
            return Err(MigrateError::InvalidVersionSequence { expected, actual });
        }
    }
    Ok(())
}

/// Migrations with no history record, ascending by version.
///
/// A recorded version whose checksum differs from the file fails the whole
/// computation.
pub fn compute_pending(
    discovered: Vec<Migration>,
    applied: &[AppliedMigration],
) -> MigrateResult<Vec<Migration>> {
    let by_version: HashMap<i64, &AppliedMigration> =
        applied.iter().map(|a| (a.version, a)).collect();

    let mut pending = Vec::new();
    for migration in discovered {
        match by_version.get(&migration.version) {
            Some(record) if record.checksum != migration.checksum => {
                return Err(MigrateError::ChecksumMismatch {
                    file: migration.path,
                });
            }
            Some(_) => {}
            None => pending.push(migration),
        }
    }

    pending.sort_by_key(|m| m.version);
    Ok(pending)
}

/// Recorded versions that no longer have a file.
pub fn orphaned_versions(discovered: &[Migration], applied: &[AppliedMigration]) -> Vec<i64> {
    applied
        .iter()
        .map(|a| a.version)
        .filter(|v| !discovered.iter().any(|m| m.version == *v))
        .collect()
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod tests;
