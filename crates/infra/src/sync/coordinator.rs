//! Application-facing entry point for background sync.
//!
//! The host binds a remote store and user with [`SyncCoordinator::set_sync_context`]
//! (or through [`SyncCoordinator::handle_auth_change`]), then starts the
//! push and pull schedulers. Progress is observed through callbacks.

use std::sync::Arc;
use std::time::Duration;

use partspro_common::time::{Clock, SystemClock};
use partspro_core::{
    ActivitySink, ConnectivityProbe, ImportService, LocalRecordStore, MutationService,
    ProgressReporter, PullService, PullSettings, PushSettings, PushWorker, RemoteStore,
    SubscriptionId, SyncQueue,
};
use partspro_domain::{AuthState, Config, PassOutcome, Result, SyncProgress};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::connectivity::ConnectivityMonitor;
use crate::database::{DbManager, SqliteRecordRepository, SqliteSyncQueueRepository};
use crate::scheduling::{
    ActivityReporter, PullScheduler, PullSchedulerConfig, PushScheduler, PushSchedulerConfig,
    SchedulerError, SchedulerResult, SyncHandle,
};
use crate::scheduling::push_scheduler::validate_interval;

/// Remote and user the workers operate on.
struct SyncContext {
    user_id: String,
    remote: Arc<dyn RemoteStore>,
    worker: Arc<PushWorker>,
    pull: Arc<PullService>,
}

#[derive(Default)]
struct CoordinatorState {
    context: Option<SyncContext>,
    push: Option<PushScheduler>,
    pull: Option<PullScheduler>,
    push_interval: Option<Duration>,
}

/// Owns the sync workers for one session.
pub struct SyncCoordinator {
    queue: Arc<dyn SyncQueue>,
    local: Arc<dyn LocalRecordStore>,
    clock: Arc<dyn Clock>,
    progress: Arc<ProgressReporter>,
    connectivity: ConnectivityMonitor,
    activity: ActivityReporter,
    default_remote: Option<Arc<dyn RemoteStore>>,
    config: Config,
    state: Mutex<CoordinatorState>,
}

impl SyncCoordinator {
    pub fn new(queue: Arc<dyn SyncQueue>, local: Arc<dyn LocalRecordStore>, config: Config) -> Self {
        Self {
            queue,
            local,
            clock: Arc::new(SystemClock),
            progress: Arc::new(ProgressReporter::new()),
            connectivity: ConnectivityMonitor::default(),
            activity: ActivityReporter::new(),
            default_remote: None,
            config,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    /// Coordinator over the SQLite queue and record cache in `db`.
    pub fn with_database(db: Arc<DbManager>, config: Config) -> Self {
        Self::new(
            Arc::new(SqliteSyncQueueRepository::new(Arc::clone(&db))),
            Arc::new(SqliteRecordRepository::new(db)),
            config,
        )
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_connectivity(mut self, connectivity: ConnectivityMonitor) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Remote used when a sign-in arrives before any explicit context.
    pub fn with_default_remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.default_remote = Some(remote);
        self
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sink for user activity; feeds the pull cadence.
    pub fn activity_sink(&self) -> Arc<dyn ActivitySink> {
        Arc::new(self.activity.clone())
    }

    /// Write path that records local changes and queues them for push.
    pub fn mutation_service(&self) -> MutationService {
        MutationService::new(
            Arc::clone(&self.local),
            Arc::clone(&self.queue),
            self.activity_sink(),
            Arc::clone(&self.clock),
        )
    }

    pub fn import_service(&self) -> ImportService {
        ImportService::new(
            Arc::clone(&self.local),
            Arc::clone(&self.queue),
            self.activity_sink(),
            Arc::clone(&self.clock),
        )
        .with_batch_size(self.config.import.batch_size)
    }

    /// User id of the current context, if any.
    pub async fn current_user(&self) -> Option<String> {
        self.state.lock().await.context.as_ref().map(|ctx| ctx.user_id.clone())
    }

    /// Bind the remote store and user the workers run against.
    ///
    /// Running schedulers are restarted for the new context.
    #[instrument(skip(self, remote))]
    pub async fn set_sync_context(
        &self,
        remote: Arc<dyn RemoteStore>,
        user_id: &str,
    ) -> SchedulerResult<()> {
        if user_id.trim().is_empty() {
            return Err(SchedulerError::MissingContext("user id must not be empty".into()));
        }

        let mut state = self.state.lock().await;
        let restart_push = stop_push(&mut state.push).await;
        let restart_pull = stop_pull(&mut state.pull).await;

        state.context = Some(self.build_context(remote, user_id));
        info!("Sync context bound");

        if restart_push {
            let interval = state.push_interval.unwrap_or_else(|| self.config.push.interval());
            self.spawn_push(&mut state, interval)?;
        }
        if restart_pull {
            self.spawn_pull(&mut state)?;
        }
        Ok(())
    }

    /// Start periodic push passes; restarts the worker if it is running.
    ///
    /// `None` uses the configured interval.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::MissingContext`] before [`Self::set_sync_context`],
    /// [`SchedulerError::InvalidInterval`] for a zero interval. A running
    /// worker is left alone when the interval is rejected.
    #[instrument(skip(self))]
    pub async fn start_sync_worker(&self, interval: Option<Duration>) -> SchedulerResult<SyncHandle> {
        let interval = interval.unwrap_or_else(|| self.config.push.interval());
        validate_interval(interval)?;
        let mut state = self.state.lock().await;
        stop_push(&mut state.push).await;
        self.spawn_push(&mut state, interval)
    }

    pub async fn stop_sync_worker(&self) -> SchedulerResult<()> {
        let mut state = self.state.lock().await;
        match state.push.as_mut() {
            Some(scheduler) => scheduler.stop().await,
            None => Err(SchedulerError::NotRunning),
        }
    }

    /// Start the adaptive pull loop; restarts it if it is running.
    #[instrument(skip(self))]
    pub async fn start_pull_service(&self) -> SchedulerResult<SyncHandle> {
        let mut state = self.state.lock().await;
        stop_pull(&mut state.pull).await;
        self.spawn_pull(&mut state)
    }

    pub async fn stop_pull_service(&self) -> SchedulerResult<()> {
        let mut state = self.state.lock().await;
        match state.pull.as_mut() {
            Some(scheduler) => scheduler.stop().await,
            None => Err(SchedulerError::NotRunning),
        }
    }

    pub async fn is_sync_worker_running(&self) -> bool {
        self.state.lock().await.push.as_ref().is_some_and(PushScheduler::is_running)
    }

    pub async fn is_pull_service_running(&self) -> bool {
        self.state.lock().await.pull.as_ref().is_some_and(PullScheduler::is_running)
    }

    pub fn sync_progress(&self) -> SyncProgress {
        self.progress.snapshot()
    }

    pub fn on_sync_progress<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SyncProgress) + Send + Sync + 'static,
    {
        self.progress.subscribe(callback)
    }

    /// Returns false if the id was not registered.
    pub fn remove_sync_observer(&self, id: SubscriptionId) -> bool {
        self.progress.unsubscribe(id)
    }

    /// Force the progress back to idle with zeroed counters.
    ///
    /// Meant for recovering a stuck UI; a pass still running keeps going.
    pub fn reset_sync_state(&self) {
        warn!("Resetting sync progress state");
        self.progress.reset();
    }

    /// Run one push pass now. Returns `None` while offline.
    #[instrument(skip(self))]
    pub async fn sync_now(&self) -> SchedulerResult<Option<PassOutcome>> {
        let (worker, user_id) = {
            let state = self.state.lock().await;
            let context = state.context.as_ref().ok_or_else(missing_context)?;
            (Arc::clone(&context.worker), context.user_id.clone())
        };

        if !self.connectivity.is_online() {
            debug!("Offline, manual sync skipped");
            return Ok(None);
        }

        Ok(Some(worker.run_pass(&user_id).await))
    }

    /// React to sign-in and sign-out.
    ///
    /// Sign-in binds the user (keeping the current remote, or the default
    /// one) and starts the enabled workers. Sign-out stops both and always
    /// clears the user, even while a push pass is still draining.
    #[instrument(skip(self))]
    pub async fn handle_auth_change(&self, auth: AuthState) -> SchedulerResult<()> {
        match auth {
            AuthState::SignedIn { user_id } => {
                let remote = {
                    let state = self.state.lock().await;
                    state.context.as_ref().map(|ctx| Arc::clone(&ctx.remote))
                }
                .or_else(|| self.default_remote.clone())
                .ok_or_else(missing_context)?;

                self.set_sync_context(remote, &user_id).await?;

                if self.config.push.enabled {
                    self.start_sync_worker(None).await?;
                }
                if self.config.pull.enabled {
                    self.start_pull_service().await?;
                }
                info!(user_id = %user_id, "Background sync active");
                Ok(())
            }
            AuthState::SignedOut => {
                let mut state = self.state.lock().await;
                stop_push(&mut state.push).await;
                stop_pull(&mut state.pull).await;
                state.context = None;
                state.push_interval = None;
                info!("Background sync stopped after sign-out");
                Ok(())
            }
        }
    }

    /// Stop both schedulers if they are running.
    ///
    /// Both are always cancelled. A loop that does not exit within its join
    /// timeout is left to finish its current pass in the background.
    pub async fn shutdown(&self) -> SchedulerResult<()> {
        let mut state = self.state.lock().await;
        stop_push(&mut state.push).await;
        stop_pull(&mut state.pull).await;
        Ok(())
    }

    fn build_context(&self, remote: Arc<dyn RemoteStore>, user_id: &str) -> SyncContext {
        let worker = PushWorker::new(
            Arc::clone(&self.queue),
            Arc::clone(&remote),
            Arc::clone(&self.progress),
            Arc::clone(&self.clock),
        )
        .with_settings(PushSettings::from(&self.config.push));

        let pull = PullService::new(
            Arc::clone(&remote),
            Arc::clone(&self.local),
            Arc::clone(&self.queue),
            Arc::clone(&self.clock),
            self.config.pull.collections.clone(),
        );

        SyncContext {
            user_id: user_id.to_string(),
            remote,
            worker: Arc::new(worker),
            pull: Arc::new(pull),
        }
    }

    fn spawn_push(
        &self,
        state: &mut CoordinatorState,
        interval: Duration,
    ) -> SchedulerResult<SyncHandle> {
        let context = state.context.as_ref().ok_or_else(missing_context)?;
        let mut scheduler = PushScheduler::new(
            Arc::clone(&context.worker),
            self.connectivity.clone(),
            context.user_id.clone(),
            PushSchedulerConfig { interval, ..PushSchedulerConfig::default() },
        );
        let handle = scheduler.start()?;
        state.push = Some(scheduler);
        state.push_interval = Some(interval);
        Ok(handle)
    }

    fn spawn_pull(&self, state: &mut CoordinatorState) -> SchedulerResult<SyncHandle> {
        let context = state.context.as_ref().ok_or_else(missing_context)?;
        let mut scheduler = PullScheduler::new(
            Arc::clone(&context.pull),
            self.connectivity.clone(),
            self.activity.clone(),
            context.user_id.clone(),
            PullSchedulerConfig {
                settings: PullSettings::from(&self.config.pull),
                ..PullSchedulerConfig::default()
            },
        );
        let handle = scheduler.start()?;
        state.pull = Some(scheduler);
        Ok(handle)
    }
}

fn missing_context() -> SchedulerError {
    SchedulerError::MissingContext("call set_sync_context first".into())
}

/// Stop the push slot. Returns whether it was running.
///
/// The loop is cancelled before the join, so a timeout or join error still
/// leaves the slot stopped.
async fn stop_push(slot: &mut Option<PushScheduler>) -> bool {
    match slot.take() {
        Some(mut scheduler) if scheduler.is_running() => {
            if let Err(err) = scheduler.stop().await {
                warn!(error = %err, "Push scheduler did not exit cleanly; detached");
            }
            true
        }
        _ => false,
    }
}

async fn stop_pull(slot: &mut Option<PullScheduler>) -> bool {
    match slot.take() {
        Some(mut scheduler) if scheduler.is_running() => {
            if let Err(err) = scheduler.stop().await {
                warn!(error = %err, "Pull scheduler did not exit cleanly; detached");
            }
            true
        }
        _ => false,
    }
}

/// Open the configured database and wire a coordinator over it.
pub fn open_coordinator(config: Config) -> Result<(Arc<DbManager>, SyncCoordinator)> {
    config.validate()?;
    let db = Arc::new(DbManager::open(&config.database)?);
    let coordinator = SyncCoordinator::with_database(Arc::clone(&db), config);
    Ok((db, coordinator))
}
