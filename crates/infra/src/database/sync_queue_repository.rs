//! SQLite-backed implementation of the sync queue port.

use std::sync::Arc;

use async_trait::async_trait;
use partspro_common::storage::SqliteConnection;
use partspro_core::SyncQueue;
use partspro_domain::{PartsProError, Result as DomainResult, SyncAction, SyncQueueItem};
use rusqlite::{params, Row};
use serde_json::Value;
use tokio::task;
use tracing::warn;

use super::manager::{map_join_error, map_sql_error, DbManager};

/// Durable sync queue stored in the `sync_queue` table.
pub struct SqliteSyncQueueRepository {
    db: Arc<DbManager>,
}

impl SqliteSyncQueueRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn insert_item(conn: &SqliteConnection, item: &SyncQueueItem) -> DomainResult<()> {
        let data_json = serde_json::to_string(&item.data).map_err(|err| {
            PartsProError::InvalidInput(format!("queue payload is not serialisable: {err}"))
        })?;

        conn.execute(
            QUEUE_INSERT_SQL,
            params![
                item.id,
                item.collection_name,
                item.doc_id,
                item.action.as_str(),
                data_json,
                item.timestamp,
                bool_to_int(item.synced),
                item.attempts,
                item.last_error,
                item.user_id,
            ],
        )
        .map(|_| ())
        .map_err(map_sql_error)
    }

    fn fetch_unsynced(conn: &SqliteConnection, user_id: &str) -> DomainResult<Vec<SyncQueueItem>> {
        let mut stmt = conn.prepare(QUEUE_UNSYNCED_SQL).map_err(map_sql_error)?;
        let rows = stmt.query_map(params![user_id], map_queue_row).map_err(map_sql_error)?;
        collect_items(rows)
    }

    /// Every row of a user, synced or not. Used by diagnostics and tests.
    pub async fn list_all(&self, user_id: &str) -> DomainResult<Vec<SyncQueueItem>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<SyncQueueItem>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(QUEUE_ALL_SQL).map_err(map_sql_error)?;
            let rows = stmt.query_map(params![user_id], map_queue_row).map_err(map_sql_error)?;
            collect_items(rows)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn execute(&self, sql: &'static str, id: &str, extra: Option<String>) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            match extra {
                Some(value) => conn.execute(sql, params![id, value]),
                None => conn.execute(sql, params![id]),
            }
            .map(|_| ())
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl SyncQueue for SqliteSyncQueueRepository {
    async fn enqueue(&self, item: &SyncQueueItem) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let to_insert = item.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            Self::insert_item(&conn, &to_insert)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_unsynced(&self, user_id: &str) -> DomainResult<Vec<SyncQueueItem>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<SyncQueueItem>> {
            let conn = db.get_connection()?;
            Self::fetch_unsynced(&conn, &user_id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_synced(&self, item_id: &str) -> DomainResult<()> {
        self.execute(QUEUE_MARK_SYNCED_SQL, item_id, None).await
    }

    async fn remove(&self, item_id: &str) -> DomainResult<()> {
        self.execute(QUEUE_DELETE_SQL, item_id, None).await
    }

    async fn record_failure(&self, item_id: &str, error: &str) -> DomainResult<()> {
        self.execute(QUEUE_RECORD_FAILURE_SQL, item_id, Some(error.to_string())).await
    }
}

const QUEUE_INSERT_SQL: &str = "INSERT INTO sync_queue (
        id, collection_name, doc_id, action, data_json, timestamp, synced, attempts, last_error, user_id
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

const QUEUE_UNSYNCED_SQL: &str = "SELECT
        id, collection_name, doc_id, action, data_json, timestamp, synced, attempts, last_error, user_id
    FROM sync_queue
    WHERE user_id = ?1 AND synced = 0
    ORDER BY timestamp ASC, seq ASC";

const QUEUE_ALL_SQL: &str = "SELECT
        id, collection_name, doc_id, action, data_json, timestamp, synced, attempts, last_error, user_id
    FROM sync_queue
    WHERE user_id = ?1
    ORDER BY timestamp ASC, seq ASC";

const QUEUE_MARK_SYNCED_SQL: &str = "UPDATE sync_queue SET synced = 1 WHERE id = ?1";

const QUEUE_DELETE_SQL: &str = "DELETE FROM sync_queue WHERE id = ?1";

const QUEUE_RECORD_FAILURE_SQL: &str =
    "UPDATE sync_queue SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1";

/// Rows with an unknown action map to `None` and are left in the table.
fn map_queue_row(row: &Row<'_>) -> rusqlite::Result<Option<SyncQueueItem>> {
    let id: String = row.get(0)?;
    let action_raw: String = row.get(3)?;
    let data_raw: String = row.get(4)?;

    let action = match action_raw.parse::<SyncAction>() {
        Ok(action) => action,
        Err(err) => {
            warn!(
                item_id = %id,
                action = %action_raw,
                error = %err,
                "skipping sync queue row with unknown action"
            );
            return Ok(None);
        }
    };
    let data = parse_data(&id, &data_raw);

    Ok(Some(SyncQueueItem {
        id,
        collection_name: row.get(1)?,
        doc_id: row.get(2)?,
        action,
        data,
        timestamp: row.get(5)?,
        synced: int_to_bool(row.get(6)?),
        attempts: row.get(7)?,
        last_error: row.get(8)?,
        user_id: row.get(9)?,
    }))
}

fn collect_items<I>(rows: I) -> DomainResult<Vec<SyncQueueItem>>
where
    I: Iterator<Item = rusqlite::Result<Option<SyncQueueItem>>>,
{
    let mut items = Vec::new();
    for row in rows {
        if let Some(item) = row.map_err(map_sql_error)? {
            items.push(item);
        }
    }
    Ok(items)
}

fn parse_data(id: &str, raw: &str) -> Value {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(
                item_id = %id,
                error = %err,
                "invalid payload stored in sync queue, sending null"
            );
            Value::Null
        }
    }
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

fn int_to_bool(value: i64) -> bool {
    value != 0
}
