//! Example: offline edits that sync once the network comes back
//!
//! Opens a throwaway SQLite database, signs a user in against the
//! in-memory remote, edits a product while offline and then reconnects.
//!
//! ```bash
//! PARTSPRO_LOG=debug cargo run -p partspro-infra --example offline_sync_demo
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use partspro_domain::{AuthState, Config};
use partspro_infra::observability::{init_tracing, LogFormat};
use partspro_infra::{open_coordinator, MemoryRemoteStore};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(LogFormat::from_env())?;

    let dir = tempfile::tempdir().context("create temp dir")?;
    let mut config = Config::default();
    config.database.path = dir.path().join("demo.db").display().to_string();
    config.pull.enabled = false;

    let remote = Arc::new(MemoryRemoteStore::new());
    let (_db, coordinator) = open_coordinator(config)?;
    let coordinator = coordinator.with_default_remote(remote.clone());

    coordinator.on_sync_progress(|progress| {
        println!(
            "  progress: {}/{} synced, {} failed",
            progress.synced_items, progress.total_items, progress.failed_items
        );
    });

    coordinator.connectivity().set_online(false);
    coordinator.handle_auth_change(AuthState::SignedIn { user_id: "demo-user".into() }).await?;

    println!("Offline: recording edits");
    let mutations = coordinator.mutation_service();
    let id = mutations
        .create("products", json!({ "name": "Oil filter", "stock": 12 }), "demo-user")
        .await?;
    mutations.update("products", &id, json!({ "stock": 11 }), "demo-user").await?;
    println!("  remote documents: {}", remote.count("products"));

    println!("Back online");
    coordinator.connectivity().set_online(true);
    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("  remote documents: {}", remote.count("products"));
    if let Some(doc) = remote.get("products", &id) {
        println!("  {id}: {doc}");
    }

    coordinator.handle_auth_change(AuthState::SignedOut).await?;
    Ok(())
}
