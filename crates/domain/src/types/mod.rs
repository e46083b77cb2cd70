//! Domain types and models

pub mod activity;
pub mod import;
pub mod progress;
pub mod records;
pub mod remote;
pub mod sync;

pub use activity::{ActivityEvent, AuthState, MutationKind};
pub use import::{ImportProgress, ImportReport, ImportStage, Product};
pub use progress::{PassOutcome, PassState, PassStop, SyncProgress};
pub use records::{LocalRecord, MergeStats};
pub use remote::{QueryFilter, RemoteRecord};
pub use sync::{new_client_id, SyncAction, SyncQueueItem};
