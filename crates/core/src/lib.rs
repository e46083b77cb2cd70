//! # PartsPro Core
//!
//! Pure sync logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for the queue, local store and remote store
//! - The push worker, pull service and progress reporter
//! - Mutation and bulk import services
//!
//! ## Architecture Principles
//! - Depends only on `partspro-common` and `partspro-domain`
//! - No database or HTTP code
//! - All external dependencies via traits
//! - Time comes from an injected `Clock`

pub mod import;
pub mod sync;

pub use import::ImportService;
pub use sync::memory::{MemoryRecordStore, MemorySyncQueue, RecordingActivitySink};
pub use sync::ports::{
    ActivitySink, ConnectivityProbe, LocalRecordStore, RemoteResult, RemoteStore, SyncQueue,
};
pub use sync::{
    MutationService, ProgressCallback, ProgressReporter, PullCadence, PullReport, PullService,
    PullSettings, PushSettings, PushWorker, QueueManager, SubscriptionId,
};
