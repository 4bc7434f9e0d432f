//! Migration run protocol.
//!
//! A run ensures the history table exists, takes the lock, reconciles the
//! migration files against the history, applies whatever is pending in
//! version order, and releases the lock. Once the lock is held it is released
//! on both the success and the failure path; if that release fails the run
//! ends with [`MigrateError::LockStuck`], carrying the earlier failure when
//! there was one.

use crate::config::MigrateOptions;
use crate::discovery::{compute_pending, discover, orphaned_versions, validate_versions};
use crate::error::{MigrateError, MigrateResult};
use crate::history::HistoryStore;
use salmon_db::Database;

/// What a successful run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrateReport {
    /// Versions applied by this run, in application order
    pub applied: Vec<i64>,
    /// Migrations that were already recorded and left alone
    pub up_to_date: usize,
}

impl MigrateReport {
    /// True when the run found nothing to apply.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Bring the database up to date with the migration files.
///
/// Blocks until every pending migration is applied or the first failure.
/// Each migration commits on its own, so after an error the migrations
/// before the failing one stay applied; calling `migrate` again resumes.
pub fn migrate<D: Database + ?Sized>(
    db: &D,
    options: &MigrateOptions,
) -> MigrateResult<MigrateReport> {
    options.validate()?;
    let store = HistoryStore::new(db, options.table_name.as_str());

    store.ensure_schema()?;
    log::debug!(
        "History table {} ready on {}",
        store.table(),
        db.db_type()
    );

    store.acquire_lock()?;
    log::debug!("Acquired migration lock on {}", store.table());

    let outcome = reconcile_and_apply(&store, options);

    match store.release_lock() {
        Ok(()) => {
            log::debug!("Released migration lock on {}", store.table());
            outcome
        }
        Err(MigrateError::LockReleaseFailed { table, source }) => {
            log::error!(
                "Could not release migration lock on {table}; delete the row with version = -1 manually"
            );
            Err(MigrateError::LockStuck {
                table,
                source,
                original: outcome.err().map(Box::new),
            })
        }
        Err(other) => Err(other),
    }
}

/// Delete a lock row left behind by a crashed or stuck run.
///
/// Only for operators who know no other run is in progress. Returns whether a
/// lock row was present.
pub fn unlock<D: Database + ?Sized>(db: &D, options: &MigrateOptions) -> MigrateResult<bool> {
    options.validate()?;
    let store = HistoryStore::new(db, options.table_name.as_str());
    store.ensure_schema()?;

    let was_locked = store.is_locked()?;
    if was_locked {
        log::warn!("Removing migration lock on {}", store.table());
        store.release_lock()?;
    }
    Ok(was_locked)
}

fn reconcile_and_apply<D: Database + ?Sized>(
    store: &HistoryStore<'_, D>,
    options: &MigrateOptions,
) -> MigrateResult<MigrateReport> {
    let applied = store.load_applied()?;

    let fs = options.filesystem();
    let discovered = discover(fs.as_ref(), &options.directory, &options.extension)?;
    let versions: Vec<i64> = discovered.iter().map(|m| m.version).collect();
    validate_versions(&versions)?;
    log::debug!(
        "Found {} migration file(s) in {}, {} recorded",
        discovered.len(),
        options.directory,
        applied.len()
    );

    for version in orphaned_versions(&discovered, &applied) {
        log::warn!(
            "Migration v{version} is recorded in {} but has no file in {}",
            store.table(),
            options.directory
        );
    }

    let total = discovered.len();
    let pending = compute_pending(discovered, &applied)?;
    let mut report = MigrateReport {
        applied: Vec::with_capacity(pending.len()),
        up_to_date: total - pending.len(),
    };

    if pending.is_empty() {
        log::debug!("Schema is up to date");
        return Ok(report);
    }

    for migration in &pending {
        if store.record_and_apply(migration)? {
            if options.verbose {
                log::info!("Applied {}", migration.file_name());
            } else {
                log::debug!("Applied {}", migration.file_name());
            }
            report.applied.push(migration.version);
        } else {
            log::debug!(
                "Skipping {}: already recorded",
                migration.file_name()
            );
            report.up_to_date += 1;
        }
    }
    Ok(report)
}
