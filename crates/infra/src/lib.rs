//! # PartsPro Infrastructure
//!
//! Infrastructure implementations of core sync ports.
//!
//! This crate contains:
//! - SQLite sync queue and record cache
//! - HTTP and in-memory remote document store adapters
//! - Connectivity monitor and background schedulers
//! - The sync coordinator used by the application shell
//! - Configuration loading and logging bootstrap
//!
//! ## Architecture
//! - Implements traits defined in `partspro-core`
//! - Depends on `partspro-common`, `partspro-domain` and `partspro-core`
//! - Contains all "impure" code (I/O, timers, network)

pub mod config;
pub mod connectivity;
pub mod database;
pub mod errors;
pub mod http;
pub mod observability;
pub mod remote;
pub mod scheduling;
pub mod sync;

// Re-export commonly used items
pub use connectivity::ConnectivityMonitor;
pub use database::{DbManager, SqliteRecordRepository, SqliteSyncQueueRepository};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use remote::{HttpRemoteStore, MemoryRemoteStore};
pub use scheduling::{
    ActivityReporter, PullScheduler, PullSchedulerConfig, PushScheduler, PushSchedulerConfig,
    SchedulerError, SchedulerResult, SyncHandle,
};
pub use sync::{open_coordinator, SyncCoordinator};
