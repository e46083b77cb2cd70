//! Storage primitives for the local SQLite database
//!
//! Connection pooling, per-connection pragmas and storage errors. Schema
//! and repositories live in the infrastructure crate.

pub mod config;
pub mod error;
pub mod pool;
pub mod pragmas;

pub use config::SqlitePoolConfig;
pub use error::{StorageError, StorageResult};
pub use pool::{SqliteConnection, SqlitePool};
pub use pragmas::apply_connection_pragmas;
