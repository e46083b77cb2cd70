//! Background schedulers for the push worker and the pull service
//!
//! Both schedulers follow the same lifecycle:
//! - `start()` spawns one task and returns a [`SyncHandle`]
//! - `stop()` cancels it and awaits the join handle with a timeout
//! - dropping a running scheduler cancels its task

pub mod error;
pub mod handle;
pub mod pull_scheduler;
pub mod push_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use handle::SyncHandle;
pub use pull_scheduler::{ActivityReporter, PullScheduler, PullSchedulerConfig};
pub use push_scheduler::{PushScheduler, PushSchedulerConfig};
