//! Locally cached documents

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document held in the local durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRecord {
    pub collection: String,
    pub doc_id: String,
    pub user_id: String,
    pub data: Value,
    /// Milliseconds since the epoch of the last local write or merge.
    pub updated_at: i64,
}

impl LocalRecord {
    pub fn new(
        collection: impl Into<String>,
        doc_id: impl Into<String>,
        user_id: impl Into<String>,
        data: Value,
        updated_at: i64,
    ) -> Self {
        Self {
            collection: collection.into(),
            doc_id: doc_id.into(),
            user_id: user_id.into(),
            data,
            updated_at,
        }
    }
}

/// Counts from merging a remote snapshot into the local store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Remote records written locally
    pub merged: usize,
    /// Local records deleted because the remote no longer has them
    pub removed: usize,
    /// Documents left alone because a local mutation is still queued
    pub skipped: usize,
}
