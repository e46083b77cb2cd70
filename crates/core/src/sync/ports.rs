//! Port interfaces for sync operations

use async_trait::async_trait;
use partspro_domain::{
    ActivityEvent, LocalRecord, MergeStats, QueryFilter, RemoteRecord, RemoteStoreError, Result,
    SyncQueueItem,
};
use serde_json::Value;

/// Result of a remote store call.
pub type RemoteResult<T> = std::result::Result<T, RemoteStoreError>;

/// Durable per-user queue of pending mutations
#[async_trait]
pub trait SyncQueue: Send + Sync {
    /// Persist a new item
    async fn enqueue(&self, item: &SyncQueueItem) -> Result<()>;

    /// Unsynced items of one user, oldest `timestamp` first; ties keep
    /// insertion order
    async fn list_unsynced(&self, user_id: &str) -> Result<Vec<SyncQueueItem>>;

    /// Flag an item as delivered. Calling it twice is the same as once.
    async fn mark_synced(&self, item_id: &str) -> Result<()>;

    /// Delete an item. Missing items are not an error.
    async fn remove(&self, item_id: &str) -> Result<()>;

    /// Bump `attempts` and store the failure message
    async fn record_failure(&self, item_id: &str, error: &str) -> Result<()>;
}

/// Remote document store (opaque collaborator)
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create the document `client_id`, or overwrite it if it already
    /// exists. Returns the stored document id.
    async fn insert(&self, collection: &str, client_id: &str, payload: &Value)
        -> RemoteResult<String>;

    /// Merge `payload` into an existing document
    async fn partial_update(&self, collection: &str, doc_id: &str, payload: &Value)
        -> RemoteResult<()>;

    /// Delete a document
    async fn remove(&self, collection: &str, doc_id: &str) -> RemoteResult<()>;

    /// All documents of a collection matching `filter`
    async fn query_all(
        &self,
        collection: &str,
        filter: Option<&QueryFilter>,
    ) -> RemoteResult<Vec<RemoteRecord>>;
}

/// On-device cache of domain documents
#[async_trait]
pub trait LocalRecordStore: Send + Sync {
    /// Insert or replace one record
    async fn upsert_record(&self, record: &LocalRecord) -> Result<()>;

    /// Delete one record; missing records are ignored
    async fn delete_record(&self, collection: &str, doc_id: &str) -> Result<()>;

    async fn get_record(&self, collection: &str, doc_id: &str) -> Result<Option<LocalRecord>>;

    /// Records of one user in a collection
    async fn list_records(&self, collection: &str, user_id: &str) -> Result<Vec<LocalRecord>>;

    /// Insert or replace many records atomically. Returns how many were
    /// written.
    async fn insert_batch(&self, records: &[LocalRecord]) -> Result<usize>;

    /// Reconcile a collection with the remote snapshot.
    ///
    /// Remote records are upserted and local records missing from the
    /// snapshot are deleted, except for documents in `skip_doc_ids`, which
    /// are left untouched.
    async fn merge_remote(
        &self,
        collection: &str,
        user_id: &str,
        records: &[RemoteRecord],
        skip_doc_ids: &[String],
        merged_at: i64,
    ) -> Result<MergeStats>;
}

/// Online/offline detection
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Receives user activity for the pull cadence
pub trait ActivitySink: Send + Sync {
    fn record(&self, event: ActivityEvent);
}
