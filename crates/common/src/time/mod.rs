//! Time abstractions.
//!
//! - **[`clock`]**: real and mock clocks for deterministic scheduling tests

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
