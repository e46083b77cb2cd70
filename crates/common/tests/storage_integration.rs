//! Integration tests for the storage module
//!
//! Pool sharing across threads, pragma persistence and error mapping.

#![cfg(feature = "platform")]

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use partspro_common::storage::{SqlitePool, SqlitePoolConfig, StorageError};
use tempfile::TempDir;

fn temp_db_path() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("storage.db");
    (temp_dir, db_path)
}

#[test]
fn concurrent_writers_through_the_pool() {
    let (_dir, path) = temp_db_path();
    let pool = Arc::new(SqlitePool::open(&path, SqlitePoolConfig::default()).unwrap());
    pool.get()
        .unwrap()
        .execute_batch("CREATE TABLE counters (worker INTEGER NOT NULL, n INTEGER NOT NULL)")
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for n in 0..25 {
                    let conn = pool.get().unwrap();
                    conn.execute(
                        "INSERT INTO counters (worker, n) VALUES (?1, ?2)",
                        rusqlite::params![worker, n],
                    )
                    .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let total: i64 = pool
        .get()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM counters", [], |row| row.get(0))
        .unwrap();
    assert_eq!(total, 100);
}

#[test]
fn data_survives_reopening_the_pool() {
    let (_dir, path) = temp_db_path();

    {
        let pool = SqlitePool::open(&path, SqlitePoolConfig::default()).unwrap();
        pool.get()
            .unwrap()
            .execute_batch("CREATE TABLE notes (body TEXT); INSERT INTO notes VALUES ('kept');")
            .unwrap();
    }

    let pool = SqlitePool::open(&path, SqlitePoolConfig::default()).unwrap();
    let body: String =
        pool.get().unwrap().query_row("SELECT body FROM notes", [], |row| row.get(0)).unwrap();
    assert_eq!(body, "kept");
}

#[test]
fn exhausted_pool_reports_timeout() {
    let (_dir, path) = temp_db_path();
    let config = SqlitePoolConfig {
        max_size: 1,
        connection_timeout: Duration::from_millis(100),
        ..SqlitePoolConfig::default()
    };
    let pool = SqlitePool::open(&path, config).unwrap();

    let _held = pool.get().unwrap();
    let err = pool.get().unwrap_err();

    assert!(err.is_retryable(), "unexpected error: {err}");
    assert!(matches!(err, StorageError::Timeout(_) | StorageError::Connection(_)));
}

#[test]
fn sqlite_errors_convert_into_storage_errors() {
    let (_dir, path) = temp_db_path();
    let pool = SqlitePool::open(&path, SqlitePoolConfig::default()).unwrap();
    let conn = pool.get().unwrap();

    let err: StorageError =
        conn.execute("INSERT INTO missing_table VALUES (1)", []).unwrap_err().into();

    assert!(matches!(err, StorageError::Rusqlite(_)));
    assert!(!err.is_retryable());
}
