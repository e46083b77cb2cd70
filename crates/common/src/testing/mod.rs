//! Testing utilities
//!
//! - **[`temp`]**: throwaway SQLite database files
//!
//! Clock doubles live in [`crate::time`].

pub mod temp;

pub use temp::TempDatabase;
