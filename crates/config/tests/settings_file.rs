use std::fs;

use tempfile::TempDir;
use viewgrid_config::{CacheSettings, ConfigError};

#[test]
fn test_load_commented_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        r#"{
    // narrower columns
    "grid.defaultColumnWidth": 64,
    "url.spreadsheetSegment": "sheets"
}"#,
    )
    .unwrap();

    let settings = CacheSettings::load_from(&path).unwrap();
    assert_eq!(settings.default_column_width, 64.0);
    assert_eq!(settings.spreadsheet_segment, "sheets");
    assert_eq!(settings.default_row_height, 30.0);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = CacheSettings::load_from(&dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_malformed_file_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, "{ not json").unwrap();

    let err = CacheSettings::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("settings.json"));
}

#[test]
fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("settings.json");

    let mut settings = CacheSettings::default();
    settings.wildcard_segment = "all".to_string();
    settings.save_to(&path).unwrap();

    assert_eq!(CacheSettings::load_from(&path).unwrap(), settings);
}

#[test]
fn test_write_default_file_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("viewgrid").join("settings.json");

    assert!(CacheSettings::write_default_file(&path).unwrap());
    assert!(!CacheSettings::write_default_file(&path).unwrap());
    assert_eq!(CacheSettings::load_from(&path).unwrap(), CacheSettings::default());
}
