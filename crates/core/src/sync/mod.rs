//! Offline-first sync: queue, push, pull and progress

pub mod memory;
pub mod mutation;
pub mod ports;
pub mod progress;
pub mod pull;
pub mod push;
pub mod queue;

pub use mutation::MutationService;
pub use ports::*;
pub use progress::{ProgressCallback, ProgressReporter, SubscriptionId};
pub use pull::{PullCadence, PullReport, PullService, PullSettings};
pub use push::{PushSettings, PushWorker};
pub use queue::QueueManager;
