//! Adaptive pull loop.
//!
//! Sleeps until the [`PullCadence`] says a pull is due, pulls, and adapts.
//! User activity arrives through an [`ActivityReporter`]; data mutations can
//! bring the next pull forward.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use partspro_core::{ActivitySink, ConnectivityProbe, PullCadence, PullService, PullSettings};
use partspro_domain::ActivityEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use super::error::{SchedulerError, SchedulerResult};
use super::handle::SyncHandle;
use crate::connectivity::ConnectivityMonitor;

const ACTIVITY_CHANNEL_CAPACITY: usize = 256;

/// Configuration for the pull scheduler
#[derive(Debug, Clone)]
pub struct PullSchedulerConfig {
    pub settings: PullSettings,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for PullSchedulerConfig {
    fn default() -> Self {
        Self { settings: PullSettings::default(), join_timeout: Duration::from_secs(5) }
    }
}

/// [`ActivitySink`] feeding the running pull loop.
///
/// Cheap to clone. Events reported while no loop is attached are dropped,
/// as are events that arrive faster than the loop drains them.
#[derive(Debug, Clone, Default)]
pub struct ActivityReporter {
    sender: Arc<Mutex<Option<mpsc::Sender<ActivityEvent>>>>,
}

impl ActivityReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attached(&self) -> bool {
        self.sender.lock().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    fn attach(&self) -> mpsc::Receiver<ActivityEvent> {
        let (tx, rx) = mpsc::channel(ACTIVITY_CHANNEL_CAPACITY);
        *self.sender.lock() = Some(tx);
        rx
    }

    fn detach(&self) {
        self.sender.lock().take();
    }
}

impl ActivitySink for ActivityReporter {
    fn record(&self, event: ActivityEvent) {
        let guard = self.sender.lock();
        let Some(tx) = guard.as_ref() else {
            trace!(?event, "No pull loop attached, dropping activity");
            return;
        };
        if let Err(err) = tx.try_send(event) {
            trace!(?event, error = %err, "Activity not delivered");
        }
    }
}

struct PullLoopContext {
    service: Arc<PullService>,
    connectivity: ConnectivityMonitor,
    user_id: String,
    settings: PullSettings,
    activity_rx: mpsc::Receiver<ActivityEvent>,
}

/// Runs [`PullService::pull_once`] on an adaptive schedule for one user.
pub struct PullScheduler {
    service: Arc<PullService>,
    connectivity: ConnectivityMonitor,
    reporter: ActivityReporter,
    user_id: String,
    config: PullSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl PullScheduler {
    pub fn new(
        service: Arc<PullService>,
        connectivity: ConnectivityMonitor,
        reporter: ActivityReporter,
        user_id: impl Into<String>,
        config: PullSchedulerConfig,
    ) -> Self {
        Self {
            service,
            connectivity,
            reporter,
            user_id: user_id.into(),
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: None,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Start the pull loop. The first pull fires one base interval from now.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::AlreadyRunning`] if the loop is active.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub fn start(&mut self) -> SchedulerResult<SyncHandle> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(
            base_secs = self.config.settings.base_interval.as_secs(),
            collections = self.service.collections().len(),
            "Starting pull scheduler"
        );

        self.cancellation_token = CancellationToken::new();

        let context = PullLoopContext {
            service: Arc::clone(&self.service),
            connectivity: self.connectivity.clone(),
            user_id: self.user_id.clone(),
            settings: self.config.settings.clone(),
            activity_rx: self.reporter.attach(),
        };
        let cancel = self.cancellation_token.clone();

        self.task_handle = Some(tokio::spawn(async move {
            Self::pull_loop(context, cancel).await;
        }));

        Ok(SyncHandle::new(self.cancellation_token.clone()))
    }

    /// Cancel the loop and wait for it to exit.
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

        info!("Stopping pull scheduler");
        self.cancellation_token.cancel();
        self.reporter.detach();

        let join_timeout = self.config.join_timeout;
        match tokio::time::timeout(join_timeout, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(SchedulerError::TaskJoinFailed(err.to_string())),
            Err(_) => return Err(SchedulerError::Timeout { seconds: join_timeout.as_secs() }),
        }

        info!("Pull scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    async fn pull_loop(context: PullLoopContext, cancel: CancellationToken) {
        let PullLoopContext { service, connectivity, user_id, settings, mut activity_rx } =
            context;
        let mut cadence = PullCadence::new(&settings, now());

        loop {
            let deadline = Instant::from_std(cadence.next_fire());
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Pull loop cancelled");
                    break;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    if !connectivity.is_online() {
                        debug!("Offline, skipping scheduled pull");
                        cadence.postpone(now());
                        continue;
                    }

                    let report = service.pull_once(&user_id).await;
                    if report.quota_exceeded || report.failed > 0 {
                        warn!(
                            failed = report.failed,
                            quota_exceeded = report.quota_exceeded,
                            "Pull finished with failures"
                        );
                    }
                    cadence.pull_completed(now());
                    debug!(next_in_secs = cadence.interval().as_secs(), "Pull rescheduled");
                }
                event = activity_rx.recv() => {
                    let Some(event) = event else {
                        debug!("Activity channel closed, stopping pull loop");
                        break;
                    };
                    if cadence.record_activity(event, now()) {
                        debug!(?event, "Activity brought the next pull forward");
                    }
                }
            }
        }
    }
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

impl Drop for PullScheduler {
    fn drop(&mut self) {
        if self.task_handle.is_some() && !self.cancellation_token.is_cancelled() {
            warn!("PullScheduler dropped while running; cancelling");
            self.cancellation_token.cancel();
            self.reporter.detach();
        }
    }
}
