//! Sync queue types

use serde::{Deserialize, Serialize};
use serde_json::Value;
#[cfg(feature = "ts-gen")]
use ts_rs::TS;
use uuid::Uuid;

/// Kind of mutation carried by a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

crate::impl_domain_status_conversions!(SyncAction {
    Create => "create",
    Update => "update",
    Delete => "delete",
});

/// One pending mutation waiting to be pushed to the remote store.
///
/// `timestamp` (milliseconds since the epoch) orders items within a user's
/// queue. `attempts` only grows until the item is synced and removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueItem {
    pub id: String,
    pub collection_name: String,
    pub doc_id: String,
    pub action: SyncAction,
    pub data: Value,
    pub timestamp: i64,
    pub synced: bool,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub user_id: String,
}

impl SyncQueueItem {
    /// Build a fresh, unsynced item with a time-ordered id.
    pub fn pending(
        collection_name: impl Into<String>,
        doc_id: impl Into<String>,
        action: SyncAction,
        data: Value,
        user_id: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            collection_name: collection_name.into(),
            doc_id: doc_id.into(),
            action,
            data,
            timestamp,
            synced: false,
            attempts: 0,
            last_error: None,
            user_id: user_id.into(),
        }
    }
}

/// Stable identifier generated on the client for a new document.
///
/// The remote adapter upserts creates by this id, so resending a create
/// after a crash targets the same document.
pub fn new_client_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn pending_items_start_unsynced() {
        let item = SyncQueueItem::pending(
            "products",
            "p-1",
            SyncAction::Update,
            json!({ "stock": 4 }),
            "user-1",
            1_700_000_000_000,
        );

        assert!(!item.synced);
        assert_eq!(item.attempts, 0);
        assert!(item.last_error.is_none());
        assert!(!item.id.is_empty());
    }

    #[test]
    fn ids_are_unique() {
        let a = SyncQueueItem::pending("c", "d", SyncAction::Delete, Value::Null, "u", 1);
        let b = SyncQueueItem::pending("c", "d", SyncAction::Delete, Value::Null, "u", 1);
        assert_ne!(a.id, b.id);
        assert_ne!(new_client_id(), new_client_id());
    }

    #[test]
    fn action_round_trips_through_strings() {
        assert_eq!("CREATE".parse::<SyncAction>(), Ok(SyncAction::Create));
        assert_eq!(SyncAction::Delete.to_string(), "delete");
        assert!("archive".parse::<SyncAction>().is_err());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let item =
            SyncQueueItem::pending("sales", "s-9", SyncAction::Create, json!({}), "user-2", 5);
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["collectionName"], "sales");
        assert_eq!(json["docId"], "s-9");
        assert_eq!(json["action"], "create");
        assert_eq!(json["userId"], "user-2");
    }
}
