//! Load orchestration.
//!
//! [`PolicyLoadManager`] converges a [`PolicyLoadTarget`] with a
//! [`ConfigStore`]:
//!
//! 1. `initialize` lists and loads everything the store holds, falling back
//!    to prior versions when the newest one will not load.
//! 2. A background task then applies change batches one at a time,
//!    resubscribing with jittered exponential backoff when the stream fails.
//! 3. `stop` cancels that task between deltas and waits for it.
//!
//! Load and unload failures never escape: each becomes a `Failure` event
//! and is consolidated into an [`AggregatedLoadError`].

use crate::error::{
    AggregatedLoadError, EntityFailure, LoadError, ManagerError, ManagerResult, StoreError, panic_message,
};
use crate::event::{EntityLoadEvent, LoadOperationResult, NonLoadingError, Stopwatch};
use crate::listener::{AggregateEntityLoadListener, EntityLoadListener, notify};
use crate::retry::RetryConfig;
use crate::store::{ConfigStore, EmptyConfigStore};
use crate::target::{NoOpLoadTarget, PolicyLoadTarget};
use futures::StreamExt;
use policy_types::{ChangeNotification, ChangeType, Entity, EntityInfo, EntityType};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Versions tried per entity: the requested one plus up to four priors.
pub const MAX_VERSION_ATTEMPTS: usize = 5;

/// Load manager configuration.
#[derive(Debug, Clone)]
pub struct LoadManagerConfig {
    /// Fail `initialize` when any entity fails to load.
    pub strict_startup: bool,
    /// Change-stream resubscription policy.
    pub retry: RetryConfig,
    /// Entity types requested from the store.
    pub entity_types: Vec<EntityType>,
}

impl Default for LoadManagerConfig {
    fn default() -> Self {
        Self {
            strict_startup: false,
            retry: RetryConfig::default(),
            entity_types: vec![EntityType::Policy],
        }
    }
}

struct Monitor {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct LifecycleState {
    initialized: bool,
    monitor: Option<Monitor>,
}

/// Drives initial load and continuous change application.
pub struct PolicyLoadManager {
    loader: Arc<Loader>,
    config: LoadManagerConfig,
    state: Mutex<LifecycleState>,
    initialized: AtomicBool,
}

impl PolicyLoadManager {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        target: Arc<dyn PolicyLoadTarget>,
        listener: Arc<dyn EntityLoadListener>,
        config: LoadManagerConfig,
    ) -> Self {
        Self {
            loader: Arc::new(Loader {
                store,
                target,
                listener,
                types: config.entity_types.clone(),
            }),
            config,
            state: Mutex::new(LifecycleState::default()),
            initialized: AtomicBool::new(false),
        }
    }

    /// A manager over an empty store and a target that holds nothing.
    pub fn unconfigured() -> Self {
        Self::new(
            Arc::new(EmptyConfigStore),
            Arc::new(NoOpLoadTarget),
            Arc::new(AggregateEntityLoadListener::default()),
            LoadManagerConfig::default(),
        )
    }

    pub fn config(&self) -> &LoadManagerConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Loads everything in the store, then starts monitoring for changes.
    ///
    /// Must run inside a tokio runtime. A listing failure, or any load
    /// failure in strict mode, leaves the manager uninitialized.
    pub async fn initialize(&self) -> ManagerResult<()> {
        let mut state = self.state.lock().await;
        if state.initialized {
            return Err(ManagerError::AlreadyInitialized);
        }

        let infos = self.loader.store.list_entity_info(&self.loader.types).await?;
        info!(count = infos.len(), "Starting initial policy load");

        let mut failures = Vec::new();
        for info in &infos {
            let results = self.loader.try_load_entity(ChangeType::Add, info, None, true).await;
            failures.extend(results.iter().filter_map(LoadOperationResult::failure));
        }

        if !failures.is_empty() {
            let aggregate = AggregatedLoadError::startup(failures);
            if self.config.strict_startup {
                error!(failures = aggregate.len(), error = %aggregate, "Strict startup failed");
                return Err(aggregate.into());
            }
            warn!(failures = aggregate.len(), error = %aggregate, "Initial load completed with failures");
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(monitor(
            Arc::clone(&self.loader),
            self.config.retry.clone(),
            cancel.clone(),
        ));
        state.monitor = Some(Monitor { cancel, handle });
        state.initialized = true;
        self.initialized.store(true, Ordering::Release);
        info!(loaded = self.loader.target.loaded_entities().len(), "Policy load manager initialized");
        Ok(())
    }

    /// Cancels change monitoring and waits for the task to finish. Loads
    /// already applied stay applied. Safe to call at any time, repeatedly.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        let Some(Monitor { cancel, handle }) = state.monitor.take() else {
            debug!("Load manager not monitoring, nothing to stop");
            return;
        };
        cancel.cancel();
        if let Err(e) = handle.await {
            if e.is_panic() {
                error!(error = %e, "Change monitor panicked");
            }
        }
        info!("Policy load manager stopped");
    }

    /// Loads `info`, falling back through its prior versions. Every
    /// attempt is published and returned in order.
    pub async fn try_load_entity(
        &self,
        change_type: ChangeType,
        info: &EntityInfo,
        is_startup: bool,
    ) -> Vec<LoadOperationResult> {
        self.loader.try_load_entity(change_type, info, None, is_startup).await
    }

    /// Applies one change batch outside the monitoring loop.
    pub async fn apply_batch(&self, batch: Vec<ChangeNotification>) -> Result<(), AggregatedLoadError> {
        match self.loader.apply_batch(batch, &CancellationToken::new()).await {
            Ok(()) | Err(BatchError::Cancelled) => Ok(()),
            Err(BatchError::Failed(aggregate)) => Err(aggregate),
        }
    }
}

impl Drop for PolicyLoadManager {
    fn drop(&mut self) {
        if let Some(monitor) = self.state.get_mut().monitor.take() {
            monitor.cancel.cancel();
        }
    }
}

enum BatchError {
    Cancelled,
    Failed(AggregatedLoadError),
}

/// State shared between the manager and its monitoring task.
struct Loader {
    store: Arc<dyn ConfigStore>,
    target: Arc<dyn PolicyLoadTarget>,
    listener: Arc<dyn EntityLoadListener>,
    types: Vec<EntityType>,
}

impl Loader {
    fn publish(&self, event: EntityLoadEvent) {
        notify(self.listener.as_ref(), &event);
    }

    fn publish_non_loading(&self, error: Option<StoreError>) {
        self.publish(NonLoadingError::new(error).into());
    }

    /// Loaded infos sorted by location prefix.
    fn known_entities(&self) -> Vec<EntityInfo> {
        let mut known = self.target.loaded_entities();
        known.sort_by(|a, b| a.location_prefix().cmp(b.location_prefix()));
        known
    }

    /// `first`, when given, is the already-fetched content of `info`.
    async fn try_load_entity(
        &self,
        change_type: ChangeType,
        info: &EntityInfo,
        mut first: Option<Entity>,
        is_startup: bool,
    ) -> Vec<LoadOperationResult> {
        let mut results = Vec::new();
        for candidate in info.version_chain().take(MAX_VERSION_ATTEMPTS) {
            let clock = Stopwatch::start();
            let fetched = match first.take() {
                Some(entity) => Ok(entity),
                None => self.store.fetch_entity(candidate).await,
            };
            let result = match fetched {
                Ok(entity) => self.load(change_type, entity, is_startup, clock),
                Err(e) => {
                    warn!(entity = %candidate, error = %e, "Failed to fetch entity");
                    LoadOperationResult::Failure {
                        change_type,
                        error: Arc::new(e.into()),
                        is_startup,
                        info: candidate.without_priors(),
                        timing: clock.finish(),
                    }
                }
            };
            let loaded = !result.is_failure();
            self.publish(result.clone().into());
            results.push(result);
            if loaded {
                break;
            }
        }
        if results.len() > 1 {
            debug!(entity = %info, attempts = results.len(), "Loaded with version fallback");
        }
        results
    }

    fn load(&self, change_type: ChangeType, entity: Entity, is_startup: bool, clock: Stopwatch) -> LoadOperationResult {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.target.load(&entity)))
            .unwrap_or_else(|payload| Err(LoadError::Panicked(panic_message(payload))));
        match outcome {
            Ok(()) => {
                info!(entity = %entity.info(), %change_type, is_startup, "Entity loaded");
                LoadOperationResult::Loaded {
                    entity: Arc::new(entity),
                    change_type,
                    is_startup,
                    timing: clock.finish(),
                }
            }
            Err(e) => {
                warn!(entity = %entity.info(), %change_type, error = %e, "Entity load failed");
                LoadOperationResult::Failure {
                    change_type,
                    error: Arc::new(e),
                    is_startup,
                    info: entity.info().without_priors(),
                    timing: clock.finish(),
                }
            }
        }
    }

    fn unload(&self, change_type: ChangeType, info: &EntityInfo, is_startup: bool) -> LoadOperationResult {
        let clock = Stopwatch::start();
        let outcome = catch_unwind(AssertUnwindSafe(|| self.target.unload(info)))
            .unwrap_or_else(|payload| Err(LoadError::Panicked(panic_message(payload))));
        let result = match outcome {
            Ok(()) => {
                info!(entity = %info, "Entity unloaded");
                LoadOperationResult::Unloaded {
                    info: info.without_priors(),
                    change_type,
                    is_startup,
                    timing: clock.finish(),
                }
            }
            Err(e) => {
                warn!(entity = %info, error = %e, "Entity unload failed");
                LoadOperationResult::Failure {
                    change_type,
                    error: Arc::new(e),
                    is_startup,
                    info: info.without_priors(),
                    timing: clock.finish(),
                }
            }
        };
        self.publish(result.clone().into());
        result
    }

    /// Applies every delta in order, then reports all failures at once.
    async fn apply_batch(&self, batch: Vec<ChangeNotification>, cancel: &CancellationToken) -> Result<(), BatchError> {
        debug!(deltas = batch.len(), "Applying change batch");
        let mut failures: Vec<EntityFailure> = Vec::new();
        for delta in batch {
            if cancel.is_cancelled() {
                return Err(BatchError::Cancelled);
            }
            let change_type = delta.change_type();
            let results = match delta {
                ChangeNotification::Add(entity) | ChangeNotification::Update(entity) => {
                    let info = entity.info().clone();
                    self.try_load_entity(change_type, &info, Some(entity), false).await
                }
                ChangeNotification::Delete(info) => vec![self.unload(change_type, &info, false)],
            };
            failures.extend(results.iter().filter_map(LoadOperationResult::failure));
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(BatchError::Failed(AggregatedLoadError::batch(failures)))
        }
    }
}

enum StreamEnd {
    Completed,
    StoreFailed(StoreError),
    BatchFailed(AggregatedLoadError),
}

/// The monitoring task: subscribe, apply batches, resubscribe on failure.
async fn monitor(loader: Arc<Loader>, retry: RetryConfig, cancel: CancellationToken) {
    let mut attempt: u32 = 0;
    loop {
        let mut batches = loader
            .store
            .stream_change_batches(loader.known_entities(), &loader.types);

        let end = loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                next = batches.next() => next,
            };
            match next {
                None => break StreamEnd::Completed,
                Some(Err(e)) => break StreamEnd::StoreFailed(e),
                Some(Ok(batch)) => match loader.apply_batch(batch, &cancel).await {
                    Ok(()) => attempt = 0,
                    Err(BatchError::Cancelled) => return,
                    Err(BatchError::Failed(aggregate)) => break StreamEnd::BatchFailed(aggregate),
                },
            }
        };
        drop(batches);

        match end {
            StreamEnd::Completed => {
                info!("Change stream completed, monitoring stopped");
                loader.publish_non_loading(None);
                return;
            }
            StreamEnd::StoreFailed(e) => {
                let retryable = e.is_retryable();
                warn!(error = %e, retryable, "Change stream failed");
                loader.publish_non_loading(Some(e));
                if !retryable {
                    error!("Non-retryable store error, monitoring stopped");
                    loader.publish_non_loading(None);
                    return;
                }
            }
            StreamEnd::BatchFailed(aggregate) => {
                warn!(failures = aggregate.len(), error = %aggregate, "Change batch applied with failures");
            }
        }

        if attempt >= retry.max_retries {
            error!(attempts = attempt, "Change stream retries exhausted, monitoring stopped");
            loader.publish_non_loading(None);
            return;
        }
        let delay = retry.delay_for_attempt(attempt);
        attempt += 1;
        debug!(?delay, attempt, "Resubscribing to change stream");
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(delay) => {}
        }
    }
}
