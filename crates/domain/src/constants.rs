//! Application constants
//!
//! Defaults for the sync subsystem. Runtime values come from
//! [`crate::config::Config`]; these are what it falls back to.

// Push worker
pub const DEFAULT_PUSH_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_ITEM_DELAY_MS: u64 = 50;
pub const DEFAULT_MAX_PASS_SECS: u64 = 300;

// Pull service (adaptive cadence)
pub const DEFAULT_PULL_BASE_INTERVAL_SECS: u64 = 15 * 60;
pub const DEFAULT_PULL_MIN_INTERVAL_SECS: u64 = 5 * 60;
pub const DEFAULT_PULL_MAX_INTERVAL_SECS: u64 = 60 * 60;

// Bulk import
pub const DEFAULT_IMPORT_BATCH_SIZE: usize = 100;

// Local store
pub const DEFAULT_DB_FILE: &str = "partspro.db";
pub const DEFAULT_DB_POOL_SIZE: u32 = 8;

// Remote store
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

/// Record sets pulled from the remote store when none are configured.
pub const DEFAULT_PULL_COLLECTIONS: &[&str] =
    &["products", "purchases", "sales", "invoices", "suppliers", "customers"];

/// Longest failure message stored on a queue item.
pub const MAX_QUEUE_ERROR_LEN: usize = 512;
