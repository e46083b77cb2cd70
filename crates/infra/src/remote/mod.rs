//! Remote document store adapters

pub mod http_store;
pub mod memory;

pub use http_store::HttpRemoteStore;
pub use memory::MemoryRemoteStore;
