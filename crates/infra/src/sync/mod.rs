//! Sync orchestration for the application shell
//!
//! [`SyncCoordinator`] owns the push and pull schedulers for a session and
//! exposes progress, manual sync and auth-driven activation.

pub mod coordinator;

pub use coordinator::{open_coordinator, SyncCoordinator};
