//! Tests for the merge database
//!
//! These tests verify:
//! - Database creation and durability pragmas
//! - Table layout (columns + UNIQUE constraint)
//! - Upsert change counting
//! - Paged scans and counting
//! - SQLite version precondition

use csvblend::config::Durability;
use csvblend::storage::{ensure_supported_version, MergeDatabase, MERGE_TABLE};
use csvblend::BlendError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const COLUMNS: [&str; 3] = ["first_name", "last_name", "score"];
const INDEX: [&str; 2] = ["first_name", "last_name"];

fn values() -> Vec<Vec<String>> {
    [
        ("Yú", "花", "£3.87"),
        ("Marlène", "贡", "€4.27"),
        ("Hélène", "於", "¥9.50"),
        ("Hélène", "於", "¥9.50"),
        ("Gaëlle", "俞", "¥7.17"),
        ("Sòng", "禄", "$6.17"),
        ("Hélène", "於", "¥9.50"),
        ("Nuó", "辛", "$0.73"),
        ("Faîtes", "闵", "€0.06"),
        ("Yáo", "贺", "£5.18"),
    ]
    .iter()
    .map(|(a, b, c)| vec![a.to_string(), b.to_string(), c.to_string()])
    .collect()
}

fn distinct_values() -> Vec<Vec<String>> {
    let mut seen = Vec::new();
    for value in values() {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

const VALUES: [&str; 1] = ["score"];

fn open_memory(index: &[&str], values: &[&str]) -> MergeDatabase {
    MergeDatabase::open(None, Durability::Off, &COLUMNS, index, values).unwrap()
}

fn scan_all(database: &MergeDatabase) -> Vec<Vec<String>> {
    database
        .scan_page(i64::MIN, usize::MAX)
        .unwrap()
        .into_iter()
        .map(|(_, values)| values)
        .collect()
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.db");
    assert!(!path.exists());

    let database = MergeDatabase::open(Some(path.as_path()), Durability::Off, &COLUMNS, &INDEX, &VALUES).unwrap();
    assert!(path.exists());

    let conn = database.connection();
    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .unwrap();
    let synchronous: i64 = conn
        .query_row("PRAGMA synchronous", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode, "memory");
    assert_eq!(synchronous, 0);

    database.close().unwrap();
}

#[test]
fn test_open_full_durability() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.db");

    let database = MergeDatabase::open(Some(path.as_path()), Durability::Full, &COLUMNS, &INDEX, &VALUES).unwrap();

    let conn = database.connection();
    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .unwrap();
    let synchronous: i64 = conn
        .query_row("PRAGMA synchronous", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode, "delete");
    assert_eq!(synchronous, 2);
}

#[test]
fn test_open_in_memory() {
    let database = open_memory(&INDEX, &VALUES);

    let file: String = database
        .connection()
        .query_row("PRAGMA database_list", [], |row| row.get(2))
        .unwrap();
    assert_eq!(file, "");
}

#[test]
fn test_open_creates_merge_table() {
    let database = open_memory(&INDEX, &VALUES);

    let sql: String = database
        .connection()
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [MERGE_TABLE],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(
        sql,
        "CREATE TABLE \"merge_table\" (\"first_name\" TEXT, \"last_name\" TEXT, \"score\" TEXT, UNIQUE (\"first_name\", \"last_name\"))"
    );
}

#[test]
fn test_open_existing_table_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.db");

    let first = MergeDatabase::open(Some(path.as_path()), Durability::Off, &COLUMNS, &INDEX, &VALUES).unwrap();
    first.close().unwrap();

    let second = MergeDatabase::open(Some(path.as_path()), Durability::Off, &COLUMNS, &INDEX, &VALUES);
    assert!(matches!(second, Err(BlendError::Storage(_))));
}

// =============================================================================
// Upsert Tests
// =============================================================================

#[test]
fn test_upsert_counts_inserts_only_once() {
    let mut database = open_memory(&INDEX, &VALUES);

    let affected = database.upsert(values().into_iter().map(Ok)).unwrap();

    assert_eq!(affected, 8);
    assert_eq!(database.count().unwrap(), 8);
    assert_eq!(scan_all(&database), distinct_values());
}

#[test]
fn test_upsert_all_columns_indexed() {
    let mut database = open_memory(&COLUMNS, &[]);

    let affected = database.upsert(values().into_iter().map(Ok)).unwrap();

    assert_eq!(affected, 8);
    assert_eq!(scan_all(&database), distinct_values());
}

#[test]
fn test_upsert_updates_only_when_different() {
    let mut database = open_memory(&INDEX, &VALUES);
    let record = |score: &str| -> csvblend::Result<Vec<String>> {
        Ok(vec!["a".to_string(), "b".to_string(), score.to_string()])
    };

    assert_eq!(database.upsert(vec![record("1")]).unwrap(), 1);
    assert_eq!(database.upsert(vec![record("1")]).unwrap(), 0);
    assert_eq!(database.upsert(vec![record("2"), record("2")]).unwrap(), 1);
    assert_eq!(scan_all(&database), vec![vec!["a", "b", "2"]]);
}

#[test]
fn test_upsert_propagates_record_errors() {
    let mut database = open_memory(&INDEX, &VALUES);

    let records = vec![Err(BlendError::Input("broken".into()))];
    let result = database.upsert(records);

    assert!(matches!(result, Err(BlendError::Input(_))));
}

#[test]
fn test_upsert_failed_batch_rolls_back() {
    let mut database = open_memory(&INDEX, &VALUES);
    let record = |first: &str| -> csvblend::Result<Vec<String>> {
        Ok(vec![first.to_string(), "b".to_string(), "1".to_string()])
    };
    database.upsert(vec![record("a")]).unwrap();

    let records = vec![record("c"), record("d"), Err(BlendError::Input("broken".into()))];
    assert!(database.upsert(records).is_err());

    assert_eq!(database.count().unwrap(), 1);
    assert_eq!(scan_all(&database), vec![vec!["a", "b", "1"]]);
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_scan_page_resumes_after_rowid() {
    let mut database = open_memory(&INDEX, &VALUES);
    database.upsert(values().into_iter().map(Ok)).unwrap();

    let first = database.scan_page(i64::MIN, 3).unwrap();
    assert_eq!(first.len(), 3);

    let last_rowid = first.last().unwrap().0;
    let rest = database.scan_page(last_rowid, 100).unwrap();
    assert_eq!(rest.len(), 5);
    assert!(rest.iter().all(|(rowid, _)| *rowid > last_rowid));
}

#[test]
fn test_count_empty_table() {
    let database = open_memory(&INDEX, &VALUES);
    assert_eq!(database.count().unwrap(), 0);
    assert!(database.scan_page(i64::MIN, 10).unwrap().is_empty());
}

// =============================================================================
// Version Precondition Tests
// =============================================================================

#[test]
fn test_version_too_old() {
    let err = ensure_supported_version(3_023_001).unwrap_err();
    assert_eq!(
        err.to_string(),
        "SQLite 3.24.0 (2018-06-04) or later is required (found 3.23.1)"
    );
}

#[test]
fn test_version_supported() {
    ensure_supported_version(3_024_000).unwrap();
    ensure_supported_version(3_045_001).unwrap();
    csvblend::storage::ensure_linked_version().unwrap();
}
