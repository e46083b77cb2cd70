//! # PartsPro Domain
//!
//! Business domain types for the PartsPro offline sync subsystem.
//!
//! This crate contains:
//! - Sync queue, progress and remote document types
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other PartsPro crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
