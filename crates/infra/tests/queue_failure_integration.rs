//! A queue write that fails must not leave a local change a pull can clobber.

#[path = "support.rs"]
mod support;

use std::sync::Arc;

use partspro_common::time::SystemClock;
use partspro_core::{
    LocalRecordStore, MemorySyncQueue, MutationService, PullService, RecordingActivitySink,
};
use partspro_infra::database::SqliteRecordRepository;
use partspro_infra::MemoryRemoteStore;
use serde_json::json;
use support::TestDatabase;

struct Stack {
    _db: TestDatabase,
    queue: Arc<MemorySyncQueue>,
    local: Arc<SqliteRecordRepository>,
    mutations: MutationService,
    pull: PullService,
}

fn stack(remote: Arc<MemoryRemoteStore>) -> Stack {
    let db = TestDatabase::new();
    let queue = Arc::new(MemorySyncQueue::new());
    let local = Arc::new(SqliteRecordRepository::new(Arc::clone(&db.manager)));
    let mutations = MutationService::new(
        local.clone(),
        queue.clone(),
        Arc::new(RecordingActivitySink::new()),
        Arc::new(SystemClock),
    );
    let pull = PullService::new(
        remote,
        local.clone(),
        queue.clone(),
        Arc::new(SystemClock),
        vec!["products".to_string()],
    );
    Stack { _db: db, queue, local, mutations, pull }
}

#[tokio::test]
async fn pull_after_failed_enqueue_matches_the_remote() {
    let remote = Arc::new(MemoryRemoteStore::new());
    remote.seed("products", "p-1", json!({ "name": "Belt", "stock": 4, "userId": "u1" }));
    let stack = stack(remote.clone());
    assert_eq!(stack.pull.pull_once("u1").await.merged, 1);

    stack.queue.set_fail_enqueue(true);
    assert!(stack.mutations.update("products", "p-1", json!({ "stock": 0 }), "u1").await.is_err());
    assert!(stack.mutations.create("products", json!({ "name": "Hose" }), "u1").await.is_err());
    assert!(stack.mutations.delete("products", "p-1", "u1").await.is_err());

    // the local store still mirrors the remote, so the pull has nothing to undo
    let records = stack.local.list_records("products", "u1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data["stock"], 4);

    let report = stack.pull.pull_once("u1").await;
    assert_eq!(report.removed, 0);
    assert_eq!(report.failed, 0);
    assert_eq!(stack.local.list_records("products", "u1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn queued_edit_survives_pull_once_the_queue_recovers() {
    let remote = Arc::new(MemoryRemoteStore::new());
    remote.seed("products", "p-1", json!({ "name": "Belt", "stock": 4, "userId": "u1" }));
    let stack = stack(remote);
    stack.pull.pull_once("u1").await;

    stack.queue.set_fail_enqueue(true);
    assert!(stack.mutations.update("products", "p-1", json!({ "stock": 1 }), "u1").await.is_err());
    stack.queue.set_fail_enqueue(false);
    stack.mutations.update("products", "p-1", json!({ "stock": 0 }), "u1").await.unwrap();

    let report = stack.pull.pull_once("u1").await;

    assert_eq!(report.skipped_pending, 1);
    let record = stack.local.get_record("products", "p-1").await.unwrap().unwrap();
    assert_eq!(record.data["stock"], 0);
    assert_eq!(stack.queue.len(), 1);
}
