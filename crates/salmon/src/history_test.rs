//! Tests for the history table, lock row, and per-migration transactions.

use super::*;
use salmon_db::DuckDbBackend;

// ── Helpers ────────────────────────────────────────────────────────────

const TABLE: &str = "salmon_schema_history";

fn setup() -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    HistoryStore::new(&db, TABLE).ensure_schema().unwrap();
    db
}

fn count(db: &DuckDbBackend, sql: &str) -> i64 {
    db.query(sql, &[]).unwrap()[0].get_i64(0).unwrap()
}

fn migration(version: i64, content: &str) -> Migration {
    Migration::from_source(
        &format!("migrations/V{version}__step_{version}.sql"),
        content.as_bytes().to_vec(),
    )
    .unwrap()
}

// ── Schema ─────────────────────────────────────────────────────────────

#[test]
fn ensure_schema_is_idempotent() {
    let db = setup();
    let store = HistoryStore::new(&db, TABLE);
    store.ensure_schema().unwrap();
    store.ensure_schema().unwrap();
    assert_eq!(
        count(
            &db,
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'salmon_schema_history'"
        ),
        1
    );
}

#[test]
fn ensure_schema_in_named_schema() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE SCHEMA meta").unwrap();
    let store = HistoryStore::new(&db, "meta.history");
    store.ensure_schema().unwrap();
    store.acquire_lock().unwrap();
    assert!(store.is_locked().unwrap());
}

#[test]
fn empty_history_loads_nothing() {
    let db = setup();
    assert!(HistoryStore::new(&db, TABLE).load_applied().unwrap().is_empty());
}

// ── Lock ───────────────────────────────────────────────────────────────

#[test]
fn acquire_and_release_lock() {
    let db = setup();
    let store = HistoryStore::new(&db, TABLE);
    assert!(!store.is_locked().unwrap());

    store.acquire_lock().unwrap();
    assert!(store.is_locked().unwrap());

    store.release_lock().unwrap();
    assert!(!store.is_locked().unwrap());

    store.acquire_lock().unwrap();
    assert!(store.is_locked().unwrap());
}

#[test]
fn second_acquire_fails_with_lock_already_held() {
    let db = setup();
    let store = HistoryStore::new(&db, TABLE);
    store.acquire_lock().unwrap();

    let err = store.acquire_lock().unwrap_err();
    assert!(matches!(err, MigrateError::LockAlreadyHeld { ref table } if table == TABLE));
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM salmon_schema_history WHERE version = -1"),
        1
    );
}

#[test]
fn acquire_without_table_is_database_error() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = HistoryStore::new(&db, TABLE).acquire_lock().unwrap_err();
    assert!(matches!(err, MigrateError::Database(_)));
}

#[test]
fn release_without_table_fails() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = HistoryStore::new(&db, TABLE).release_lock().unwrap_err();
    assert!(matches!(err, MigrateError::LockReleaseFailed { .. }));
}

#[test]
fn lock_row_excluded_from_applied() {
    let db = setup();
    let store = HistoryStore::new(&db, TABLE);
    store.acquire_lock().unwrap();
    store
        .record_and_apply(&migration(0, "CREATE TABLE t (a INT);"))
        .unwrap();

    let applied = store.load_applied().unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].version, 0);
}

// ── record_and_apply ───────────────────────────────────────────────────

#[test]
fn record_and_apply_commits_both() {
    let db = setup();
    let store = HistoryStore::new(&db, TABLE);
    let m = migration(0, "CREATE TABLE t (a INT);");

    assert!(store.record_and_apply(&m).unwrap());

    let applied = store.load_applied().unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].version, 0);
    assert_eq!(applied[0].description, "step_0");
    assert_eq!(applied[0].checksum, m.checksum);
    assert_eq!(
        count(
            &db,
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 't'"
        ),
        1
    );
}

#[test]
fn record_and_apply_skips_recorded_version() {
    let db = setup();
    let store = HistoryStore::new(&db, TABLE);
    store
        .record_and_apply(&migration(0, "CREATE TABLE t (a INT);"))
        .unwrap();

    // Same version again: must not re-run the DDL (which would fail).
    let applied = store
        .record_and_apply(&migration(0, "CREATE TABLE t (a INT);"))
        .unwrap();
    assert!(!applied);
    assert_eq!(store.load_applied().unwrap().len(), 1);
}

#[test]
fn record_and_apply_rolls_back_on_bad_sql() {
    let db = setup();
    let store = HistoryStore::new(&db, TABLE);
    store
        .record_and_apply(&migration(0, "CREATE TABLE t (a INT);"))
        .unwrap();

    let err = store
        .record_and_apply(&migration(
            1,
            "CREATE TABLE u (a INT); ALTER TABLE t ADD COLUMN",
        ))
        .unwrap_err();
    assert!(matches!(err, MigrateError::Database(_)));

    let versions: Vec<i64> = store
        .load_applied()
        .unwrap()
        .iter()
        .map(|m| m.version)
        .collect();
    assert_eq!(versions, vec![0]);
    assert_eq!(
        count(
            &db,
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'u'"
        ),
        0
    );
}

#[test]
fn applied_at_is_populated() {
    let db = setup();
    let store = HistoryStore::new(&db, TABLE);
    let before = chrono::Utc::now().naive_utc() - chrono::Duration::days(1);
    store
        .record_and_apply(&migration(0, "SELECT 1;"))
        .unwrap();

    let applied = store.load_applied().unwrap();
    assert!(applied[0].applied_at > before);
}

#[test]
fn applied_sorted_by_version() {
    let db = setup();
    let store = HistoryStore::new(&db, TABLE);
    for version in [2, 0, 1] {
        store
            .record_and_apply(&migration(version, "SELECT 1;"))
            .unwrap();
    }
    let versions: Vec<i64> = store
        .load_applied()
        .unwrap()
        .iter()
        .map(|m| m.version)
        .collect();
    assert_eq!(versions, vec![0, 1, 2]);
}
