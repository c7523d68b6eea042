//! Dispatcher state and worker lifecycle guard.
//!
//! [`Dispatcher`] owns the two lanes and the handle of the running worker.
//! The state mutex is only held for non-suspending steps (push, pop,
//! check-and-spawn, mark-idle), so the guard's check and the worker's
//! "lanes empty, going idle" step are each atomic with respect to every
//! enqueuer. An enqueue that races with worker shutdown is therefore either
//! popped by the old worker or starts a new one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use beacon_common::{AppResult, Metrics, get_metrics};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::asset_cache::AssetCache;
use crate::jobs::{Lane, SendTask};
use crate::lanes::DispatchQueue;
use crate::messenger::Messenger;
use crate::payload::Payload;
use crate::workers::{self, WorkerConfig};

#[derive(Default)]
struct State {
    queue: DispatchQueue,
    /// True from spawn until the worker observes both lanes empty.
    active: bool,
    worker: Option<JoinHandle<()>>,
}

pub(crate) struct Shared {
    state: Mutex<State>,
    messenger: Arc<dyn Messenger>,
    assets: Arc<AssetCache>,
    config: WorkerConfig,
    metrics: Arc<Metrics>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pop the next task, or mark the worker idle when both lanes are empty.
    pub(crate) fn next_task(&self) -> Option<SendTask> {
        let mut state = self.lock();
        let task = state.queue.pop_next();
        if task.is_none() {
            state.active = false;
        }
        task
    }

    pub(crate) fn messenger(&self) -> &dyn Messenger {
        self.messenger.as_ref()
    }

    pub(crate) fn assets(&self) -> &AssetCache {
        &self.assets
    }

    pub(crate) const fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub(crate) fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Outbound dispatch entry point shared by all handlers.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Create a dispatcher reporting to the global metrics.
    #[must_use]
    pub fn new(
        messenger: Arc<dyn Messenger>,
        assets: Arc<AssetCache>,
        config: WorkerConfig,
    ) -> Self {
        Self::with_metrics(messenger, assets, config, Arc::clone(get_metrics()))
    }

    /// Create a dispatcher with a dedicated metrics collector.
    #[must_use]
    pub fn with_metrics(
        messenger: Arc<dyn Messenger>,
        assets: Arc<AssetCache>,
        config: WorkerConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                messenger,
                assets,
                config,
                metrics,
            }),
        }
    }

    /// Queue a task on its lane. Does not start the worker.
    pub fn enqueue(&self, task: SendTask) {
        self.shared.metrics.record_enqueued(task.lane() == Lane::Interactive);
        self.shared.lock().queue.enqueue(task);
    }

    /// Queue a batch under one lock. Returns the number of tasks queued.
    pub fn enqueue_batch(&self, tasks: impl IntoIterator<Item = SendTask>) -> usize {
        let mut state = self.shared.lock();
        let mut count = 0;
        for task in tasks {
            self.shared
                .metrics
                .record_enqueued(task.lane() == Lane::Interactive);
            state.queue.enqueue(task);
            count += 1;
        }
        count
    }

    /// Queue a reply on the interactive lane.
    pub fn enqueue_interactive(&self, recipient: i64, payload: Payload) {
        self.enqueue(SendTask::direct(recipient, payload));
    }

    /// Queue a broadcast copy on the bulk lane.
    pub fn enqueue_bulk(&self, recipient: i64, payload: Payload) {
        self.enqueue(SendTask::broadcast(recipient, payload));
    }

    /// Start a worker unless one is already draining. Idempotent.
    ///
    /// Returns whether a new worker was spawned. Must be called from within
    /// a Tokio runtime.
    pub fn ensure_worker_running(&self) -> bool {
        let mut state = self.shared.lock();

        if state.active {
            match &state.worker {
                Some(handle) if handle.is_finished() => {
                    warn!("Dispatch worker ended without draining, restarting");
                }
                _ => return false,
            }
        }

        if state.queue.is_empty() {
            state.active = false;
            return false;
        }

        state.active = true;
        state.worker = Some(tokio::spawn(workers::run(Arc::clone(&self.shared))));
        self.shared.metrics.record_worker_spawned();
        debug!(
            interactive = state.queue.len(Lane::Interactive),
            bulk = state.queue.len(Lane::Bulk),
            "Spawned dispatch worker"
        );
        true
    }

    /// Whether a worker is currently draining.
    #[must_use]
    pub fn is_worker_active(&self) -> bool {
        self.shared.lock().active
    }

    /// Whether `lane` holds any task.
    #[must_use]
    pub fn has_pending(&self, lane: Lane) -> bool {
        self.shared.lock().queue.has_pending(lane)
    }

    /// Number of tasks waiting in `lane`.
    #[must_use]
    pub fn pending(&self, lane: Lane) -> usize {
        self.shared.lock().queue.len(lane)
    }

    /// Cached reference of the welcome animation.
    #[must_use]
    pub fn cached_asset_reference(&self) -> Option<String> {
        self.shared.assets.reference()
    }

    /// Replace the cached reference of the welcome animation.
    pub async fn set_cached_asset_reference(&self, reference: &str) -> AppResult<()> {
        self.shared.assets.save(reference).await
    }

    /// Wait until no worker is running and both lanes are drained.
    ///
    /// A worker that dies while being awaited is replaced here, since its
    /// handle is no longer visible to [`Self::ensure_worker_running`].
    pub async fn wait_idle(&self) {
        loop {
            let handle = self.shared.lock().worker.take();
            let Some(handle) = handle else {
                return;
            };
            if let Err(e) = handle.await {
                warn!(error = %e, "Dispatch worker terminated abnormally");
                self.shared.lock().active = false;
                self.ensure_worker_running();
            }
        }
    }
}
