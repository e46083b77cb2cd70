//! Bulk data import

pub mod service;

pub use service::ImportService;
