//! ConfigTableLoader tests

use std::sync::Arc;

use hostkit_config::{
    ConfigTableLoader, ConfigurationBuilder, LoadError, SqlTableConfigurationSource,
};
use pretty_assertions::assert_eq;
use tests::db::TestConfigDatabase;
use tests::TrackingConnector;

#[test]
fn test_unique_keys_load_every_row() {
    let rows = [
        ("IndexFormat", "billing-{0:yyyy.MM}"),
        ("Smtp:Host", "mail.internal"),
        ("Smtp:Port", "2525"),
        ("FeatureFlags:Beta", "true"),
    ];
    let db = TestConfigDatabase::with_rows(&rows);

    let data = ConfigTableLoader::sqlite(db.connection_string())
        .load()
        .expect("load should succeed");

    assert_eq!(data.len(), rows.len());
    for (key, value) in rows {
        assert_eq!(data.get(key), Some(value), "key {}", key);
    }
}

#[test]
fn test_empty_table_yields_empty_mapping() {
    let db = TestConfigDatabase::new();

    let data = ConfigTableLoader::sqlite(db.connection_string())
        .load()
        .unwrap();

    assert!(data.is_empty());
}

#[test]
fn test_lookup_ignores_key_case() {
    let db = TestConfigDatabase::with_rows(&[("IndexFormat", "logs-{0:yyyy}")]);

    let data = ConfigTableLoader::sqlite(db.connection_string())
        .load()
        .unwrap();

    assert_eq!(data.get("indexformat"), Some("logs-{0:yyyy}"));
    assert_eq!(data.iter().next(), Some(("IndexFormat", "logs-{0:yyyy}")));
}

#[test]
fn test_null_value_reads_as_empty_string() {
    let db = TestConfigDatabase::new();
    db.execute("INSERT INTO tblConfig (\"Key\", value) VALUES ('Optional', NULL)")
        .unwrap();

    let data = ConfigTableLoader::sqlite(db.connection_string())
        .load()
        .unwrap();

    assert_eq!(data.get("Optional"), Some(""));
}

#[test]
fn test_duplicate_key_fails_without_partial_snapshot() {
    let db = TestConfigDatabase::with_rows(&[("A", "1"), ("B", "2"), ("A", "3")]);

    let err = ConfigTableLoader::sqlite(db.connection_string())
        .load()
        .unwrap_err();
    assert!(matches!(err, LoadError::DuplicateKey { ref key } if key == "A"));

    let mut builder = ConfigurationBuilder::new();
    builder.add(SqlTableConfigurationSource::new(db.connection_string()));
    assert!(builder.build().is_err());
}

#[test]
fn test_duplicate_key_differing_only_in_case_fails() {
    let db = TestConfigDatabase::with_rows(&[("Region", "eu"), ("REGION", "us")]);

    let err = ConfigTableLoader::sqlite(db.connection_string())
        .load()
        .unwrap_err();

    assert!(matches!(err, LoadError::DuplicateKey { .. }));
}

#[test]
fn test_missing_database_is_connect_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.db");

    let err = ConfigTableLoader::sqlite(format!("Data Source={}", path.display()))
        .load()
        .unwrap_err();

    assert!(matches!(err, LoadError::Connect { .. }));
    assert!(!path.exists(), "read-only open must not create the file");
}

#[test]
fn test_missing_table_is_query_error() {
    let db = TestConfigDatabase::without_table();

    let err = ConfigTableLoader::sqlite(db.connection_string())
        .load()
        .unwrap_err();

    assert!(matches!(err, LoadError::Query { .. }));
}

#[test]
fn test_invalid_connection_string() {
    let err = ConfigTableLoader::sqlite("Data Source=x.db;Mode=Sideways")
        .load()
        .unwrap_err();

    assert!(matches!(err, LoadError::InvalidConnectionString(_)));
}

#[test]
fn test_file_uri_connection_string() {
    let db = TestConfigDatabase::with_rows(&[("Key1", "v1")]);
    let uri = format!("file:{}?mode=ro", db.db_path().display());

    let data = ConfigTableLoader::sqlite(uri).load().unwrap();

    assert_eq!(data.get("Key1"), Some("v1"));
}

// ============================================================================
// Connection lifecycle
// ============================================================================

#[test]
fn test_connection_released_once_on_success() {
    let connector = TrackingConnector::new(&[("A", "1"), ("B", "2")]);
    let loader = ConfigTableLoader::new(Arc::new(connector.clone()));

    let data = loader.load().unwrap();

    assert_eq!(data.len(), 2);
    assert_eq!(connector.opened(), 1);
    assert_eq!(connector.closed(), 1);
}

#[test]
fn test_connection_released_once_on_duplicate_key() {
    let connector = TrackingConnector::new(&[("A", "1"), ("a", "2")]);
    let loader = ConfigTableLoader::new(Arc::new(connector.clone()));

    assert!(loader.load().is_err());
    assert_eq!(connector.opened(), 1);
    assert_eq!(connector.closed(), 1);
}

#[test]
fn test_connection_released_once_on_read_failure() {
    let connector = TrackingConnector::new(&[("A", "1"), ("B", "2")]).failing_after(1);
    let loader = ConfigTableLoader::new(Arc::new(connector.clone()));

    let err = loader.load().unwrap_err();

    assert!(matches!(err, LoadError::Connection(_)));
    assert_eq!(connector.opened(), 1);
    assert_eq!(connector.closed(), 1);
}

#[test]
fn test_connect_failure_opens_nothing() {
    let connector = TrackingConnector::refusing();
    let loader = ConfigTableLoader::new(Arc::new(connector.clone()));

    assert!(loader.load().is_err());
    assert_eq!(connector.opened(), 0);
    assert_eq!(connector.closed(), 0);
}

#[test]
fn test_each_load_uses_a_fresh_connection() {
    let connector = TrackingConnector::new(&[("A", "1")]);
    let loader = ConfigTableLoader::new(Arc::new(connector.clone()));

    loader.load().unwrap();
    loader.load().unwrap();

    assert_eq!(connector.opened(), 2);
    assert_eq!(connector.closed(), 2);
}
