use super::*;
use crate::filesystem::MemoryFs;
use std::io::Write;

#[test]
fn test_defaults() {
    let options = MigrateOptions::default();
    assert_eq!(options.table_name, "salmon_schema_history");
    assert_eq!(options.directory, "migrations");
    assert_eq!(options.extension, "sql");
    assert!(!options.verbose);
    assert!(options.filesystem.is_none());
    options.validate().unwrap();
}

#[test]
fn test_empty_yaml_uses_defaults() {
    let options = MigrateOptions::from_yaml_str("{}").unwrap();
    assert_eq!(options.table_name, "salmon_schema_history");
    assert_eq!(options.directory, "migrations");
}

#[test]
fn test_yaml_overrides() {
    let options = MigrateOptions::from_yaml_str(
        r#"
table_name: app.schema_history
directory: db/migrations
extension: pgsql
verbose: true
"#,
    )
    .unwrap();
    assert_eq!(options.table_name, "app.schema_history");
    assert_eq!(options.directory, "db/migrations");
    assert_eq!(options.extension, "pgsql");
    assert!(options.verbose);
}

#[test]
fn test_yaml_unknown_field_rejected() {
    let err = MigrateOptions::from_yaml_str("dir: migrations").unwrap_err();
    assert!(matches!(err, MigrateError::ConfigParseError(_)));
}

#[test]
fn test_invalid_table_name_rejected() {
    for name in ["", "1history", "history; drop table x", "a.b.c", "my-table"] {
        let err = MigrateOptions::default()
            .with_table_name(name)
            .validate()
            .unwrap_err();
        assert!(
            matches!(err, MigrateError::ConfigInvalid { .. }),
            "expected ConfigInvalid for {name:?}"
        );
    }
}

#[test]
fn test_invalid_extension_rejected() {
    for ext in ["", ".sql", "s*l"] {
        let err = MigrateOptions::default()
            .with_extension(ext)
            .validate()
            .unwrap_err();
        assert!(matches!(err, MigrateError::ConfigInvalid { .. }));
    }
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("salmon.yml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "directory: schema").unwrap();

    let options = MigrateOptions::load(&path).unwrap();
    assert_eq!(options.directory, "schema");
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = MigrateOptions::load(&dir.path().join("missing.yml")).unwrap_err();
    assert!(matches!(err, MigrateError::ConfigNotFound { .. }));
}

#[test]
fn test_with_filesystem_overrides_os() {
    let fs = MemoryFs::new().with_file("migrations/V0__init.sql", "select 1;");
    let options = MigrateOptions::default().with_filesystem(fs);
    assert!(options.filesystem().exists("migrations").unwrap());
}
