//! Periodic push passes.
//!
//! One pass runs as soon as the scheduler starts, then one per `interval`.
//! Passes are skipped while offline, and going back online triggers a pass
//! right away.

use std::sync::Arc;
use std::time::Duration;

use partspro_core::{ConnectivityProbe, PushWorker};
use partspro_domain::constants::DEFAULT_PUSH_INTERVAL_SECS;
use partspro_domain::{PassOutcome, PassStop};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};
use super::handle::SyncHandle;
use crate::connectivity::ConnectivityMonitor;

/// Configuration for the push scheduler
#[derive(Debug, Clone)]
pub struct PushSchedulerConfig {
    /// Time between passes
    pub interval: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for PushSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_PUSH_INTERVAL_SECS),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Loop inputs moved into the spawned task
struct PushLoopContext {
    worker: Arc<PushWorker>,
    connectivity: ConnectivityMonitor,
    user_id: String,
    interval: Duration,
}

/// Drives a [`PushWorker`] for one user.
pub struct PushScheduler {
    worker: Arc<PushWorker>,
    connectivity: ConnectivityMonitor,
    user_id: String,
    config: PushSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl PushScheduler {
    pub fn new(
        worker: Arc<PushWorker>,
        connectivity: ConnectivityMonitor,
        user_id: impl Into<String>,
        config: PushSchedulerConfig,
    ) -> Self {
        Self {
            worker,
            connectivity,
            user_id: user_id.into(),
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: None,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Start background passes.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::AlreadyRunning`] if the loop is active and
    /// [`SchedulerError::InvalidInterval`] for a zero interval.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub fn start(&mut self) -> SchedulerResult<SyncHandle> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }
        validate_interval(self.config.interval)?;

        info!(interval_secs = self.config.interval.as_secs(), "Starting push scheduler");

        // Fresh token so the scheduler can be restarted after stop
        self.cancellation_token = CancellationToken::new();

        let context = PushLoopContext {
            worker: Arc::clone(&self.worker),
            connectivity: self.connectivity.clone(),
            user_id: self.user_id.clone(),
            interval: self.config.interval,
        };
        let cancel = self.cancellation_token.clone();

        self.task_handle = Some(tokio::spawn(async move {
            Self::push_loop(context, cancel).await;
        }));

        Ok(SyncHandle::new(self.cancellation_token.clone()))
    }

    /// Cancel the loop and wait for it to exit.
    ///
    /// An in-flight pass finishes before the task ends, so `join_timeout`
    /// should cover the pass ceiling if callers need a clean stop.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotRunning`] if never started or already stopped,
    /// [`SchedulerError::Timeout`] if the task outlives `join_timeout`.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let Some(handle) = self.task_handle.take() else {
            return Err(SchedulerError::NotRunning);
        };

        info!("Stopping push scheduler");
        self.cancellation_token.cancel();

        let join_timeout = self.config.join_timeout;
        match tokio::time::timeout(join_timeout, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(SchedulerError::TaskJoinFailed(err.to_string())),
            Err(_) => return Err(SchedulerError::Timeout { seconds: join_timeout.as_secs() }),
        }

        info!("Push scheduler stopped");
        Ok(())
    }

    /// True while the background task is alive.
    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    async fn push_loop(context: PushLoopContext, cancel: CancellationToken) {
        let PushLoopContext { worker, connectivity, user_id, interval } = context;

        let mut online_rx = connectivity.subscribe();
        let mut was_online = *online_rx.borrow_and_update();

        // First tick completes immediately
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Push loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    if connectivity.is_online() {
                        Self::run_pass(&worker, &user_id).await;
                    } else {
                        debug!("Offline, skipping scheduled push pass");
                    }
                }
                changed = online_rx.changed() => {
                    if changed.is_err() {
                        warn!("Connectivity channel closed, stopping push loop");
                        break;
                    }
                    let online = *online_rx.borrow_and_update();
                    if online && !was_online {
                        info!("Back online, triggering push pass");
                        Self::run_pass(&worker, &user_id).await;
                    }
                    was_online = online;
                }
            }
        }
    }

    async fn run_pass(worker: &PushWorker, user_id: &str) -> PassOutcome {
        let outcome = worker.run_pass(user_id).await;
        match outcome.stop {
            PassStop::QuotaExceeded | PassStop::QueueUnavailable | PassStop::DeadlineReached => {
                warn!(
                    stop = outcome.stop.as_str(),
                    success = outcome.success,
                    failed = outcome.failed,
                    "Push pass ended early"
                );
            }
            _ => debug!(
                stop = outcome.stop.as_str(),
                success = outcome.success,
                failed = outcome.failed,
                "Push pass finished"
            ),
        }
        outcome
    }
}

/// Reject intervals `tokio::time::interval` cannot tick on.
pub(crate) fn validate_interval(interval: Duration) -> SchedulerResult<()> {
    if interval.is_zero() {
        return Err(SchedulerError::InvalidInterval("push interval must be positive".into()));
    }
    Ok(())
}

/// Ensure the loop is cancelled when the scheduler is dropped
impl Drop for PushScheduler {
    fn drop(&mut self) {
        if self.task_handle.is_some() && !self.cancellation_token.is_cancelled() {
            warn!("PushScheduler dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}
