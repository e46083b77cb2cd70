//! Config file to running coordinator, across a restart.

use std::sync::Arc;

use partspro_core::SyncQueue;
use partspro_domain::PartsProError;
use partspro_infra::config::load_from_file;
use partspro_infra::database::SqliteSyncQueueRepository;
use partspro_infra::{open_coordinator, HttpRemoteStore};
use serde_json::json;
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("partspro.toml");
    std::fs::write(&path, body).expect("write config");
    path
}

#[tokio::test]
async fn toml_file_drives_database_and_remote_settings() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("partspro.db");
    let config_path = write_config(
        &dir,
        &format!(
            r#"
[database]
path = "{}"
pool_size = 2

[remote]
base_url = "https://sync.example.com/"
timeout_secs = 5

[push]
enabled = false
interval_secs = 45

[pull]
enabled = false
base_interval_secs = 300
min_interval_secs = 60
max_interval_secs = 900
collections = ["products", "sales"]
"#,
            db_path.display().to_string().replace('\\', "/")
        ),
    );

    let config = load_from_file(Some(config_path)).unwrap();
    assert_eq!(config.push.interval_secs, 45);
    assert_eq!(config.pull.collections, vec!["products", "sales"]);
    assert_eq!(config.import.batch_size, 100);

    let remote = HttpRemoteStore::from_config(&config.remote).unwrap();
    assert_eq!(remote.base_url(), "https://sync.example.com");

    let doc_id = {
        let (db, coordinator) = open_coordinator(config.clone()).unwrap();
        db.health_check().unwrap();
        coordinator
            .mutation_service()
            .create("products", json!({ "name": "Air filter" }), "u1")
            .await
            .unwrap()
    };
    assert!(db_path.exists());

    // Queued work survives reopening the database.
    let (db, _coordinator) = open_coordinator(config).unwrap();
    let queue = SqliteSyncQueueRepository::new(Arc::clone(&db));
    let pending = queue.list_unsynced("u1").await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].doc_id, doc_id);
}

#[test]
fn invalid_pull_bounds_are_rejected() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(
        &dir,
        r#"
[database]
path = "partspro.db"

[pull]
base_interval_secs = 30
min_interval_secs = 60
"#,
    );

    let err = load_from_file(Some(config_path)).unwrap_err();

    assert!(matches!(err, PartsProError::Config(msg) if msg.contains("pull intervals")));
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();

    let err = load_from_file(Some(dir.path().join("absent.toml"))).unwrap_err();

    assert!(matches!(err, PartsProError::Config(msg) if msg.contains("not found")));
}
