//! Local durable store (SQLite)

pub mod manager;
pub mod record_repository;
pub mod sync_queue_repository;

pub use manager::*;
pub use record_repository::*;
pub use sync_queue_repository::*;
