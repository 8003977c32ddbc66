//! Download coordinator
//!
//! Owns the set of per-URL workers for one batch job, enforces the
//! sequential-vs-parallel scheduling protocol, aggregates completion state,
//! and exposes cancellation. The worker set is fixed at construction: one
//! worker per URL, never added to or removed from afterwards.
//!
//! Sequential mode is a protocol convention, not a mutual-exclusion
//! primitive: the completion callback chains `start_next` calls, so callers
//! must not mix `start_next` and `start_all` on the same batch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::engine::ExtractionEngine;
use crate::core::format_selector::FormatSelector;
use crate::core::models::{BatchJob, CoreError, CoreResult, WorkerState};
use crate::core::progress::ProgressReporter;
use crate::core::transcoder::Transcoder;
use crate::core::worker::{self, Worker, WorkerContext};
use crate::utils::fs::is_writable_dir;

/// Invoked by each worker immediately after it finishes (success or
/// failure), with the URL and the batch-wide was-successful snapshot at
/// that moment. In sequential mode this callback drives `start_next`.
pub type CompletionCallback = Arc<dyn Fn(&str, bool) + Send + Sync>;

/// Invoked once per failed worker with the URL and the underlying cause.
/// Never invoked for cancellation-induced aborts.
pub type ErrorCallback = Arc<dyn Fn(&str, Option<&CoreError>) + Send + Sync>;

/// State shared between the coordinator and its worker tasks
pub(crate) struct BatchShared {
    pub urls: Vec<String>,
    pub states: Vec<Arc<WorkerState>>,
    completion_callback: parking_lot::RwLock<Option<CompletionCallback>>,
    error_callback: Option<ErrorCallback>,
}

impl BatchShared {
    pub(crate) fn completion_callback(&self) -> Option<CompletionCallback> {
        self.completion_callback.read().clone()
    }

    pub(crate) fn error_callback(&self) -> Option<ErrorCallback> {
        self.error_callback.clone()
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.states.iter().all(|state| state.is_done())
    }

    pub(crate) fn was_successful(&self) -> bool {
        self.states
            .iter()
            .all(|state| state.is_done() && !state.is_errored() && !state.is_killed())
    }

    /// Set every worker's cancellation flag. Running workers are woken and
    /// unwind to a terminal state on their own; workers that never started
    /// are marked terminal here so completion converges.
    pub(crate) fn kill_all(&self, except: Option<usize>) {
        for (index, state) in self.states.iter().enumerate() {
            if Some(index) == except {
                continue;
            }
            let was_started = state.is_started();
            state.request_kill();
            if !was_started {
                state.mark_killed();
            }
        }
    }
}

/// Coordinates the workers of one batch job
pub struct DownloadCoordinator {
    job: BatchJob,
    format: String,
    workers: Vec<Worker>,
    shared: Arc<BatchShared>,
    /// Index of the next not-yet-started worker in sequential mode
    cursor: AtomicUsize,
    engine: Arc<dyn ExtractionEngine>,
    transcoder: Arc<dyn Transcoder>,
}

impl DownloadCoordinator {
    /// Build the worker set for a batch job.
    ///
    /// Pre-flight checks run before any worker exists: an unwritable
    /// destination or an invalid (kind, quality) pair rejects the batch
    /// with zero side effects.
    pub fn new(
        job: BatchJob,
        engine: Arc<dyn ExtractionEngine>,
        transcoder: Arc<dyn Transcoder>,
        error_callback: Option<ErrorCallback>,
    ) -> CoreResult<Self> {
        if !is_writable_dir(&job.destination) {
            return Err(CoreError::DestinationNotWritable(job.destination.clone()));
        }

        let format = FormatSelector::select(job.kind, job.quality.to_standard())?;

        let states: Vec<Arc<WorkerState>> = job
            .urls
            .iter()
            .map(|_| Arc::new(WorkerState::new()))
            .collect();

        let workers = job
            .urls
            .iter()
            .zip(states.iter())
            .map(|(url, state)| Worker::new(url.clone(), Arc::clone(state)))
            .collect();

        let shared = Arc::new(BatchShared {
            urls: job.urls.clone(),
            states,
            completion_callback: parking_lot::RwLock::new(None),
            error_callback,
        });

        info!(
            job_id = %job.id,
            urls = job.urls.len(),
            mode = ?job.mode,
            "batch coordinator created"
        );

        Ok(Self {
            job,
            format,
            workers,
            shared,
            cursor: AtomicUsize::new(0),
            engine,
            transcoder,
        })
    }

    /// Register the single per-batch completion callback
    pub fn register_completion_callback(&self, callback: CompletionCallback) {
        *self.shared.completion_callback.write() = Some(callback);
    }

    /// Start every not-yet-started, not-killed worker. Parallel mode only;
    /// all workers launch at once with no artificial cap.
    pub fn start_all(&self) {
        info!(job_id = %self.job.id, "🚀 starting all workers");
        for index in 0..self.workers.len() {
            self.start_worker(index);
        }
    }

    /// Start the next worker per the sequential cursor.
    ///
    /// Fails with [`CoreError::NoMoreWorkers`] once the cursor has
    /// exhausted the list. A killed or already-started worker at the
    /// cursor is skipped without starting anything.
    pub fn start_next(&self) -> CoreResult<()> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        if index >= self.workers.len() {
            return Err(CoreError::NoMoreWorkers);
        }
        self.start_worker(index);
        Ok(())
    }

    fn start_worker(&self, index: usize) {
        let state = &self.shared.states[index];
        if state.is_killed() || state.is_started() {
            debug!(url = %self.shared.urls[index], "skipping worker start");
            return;
        }
        state.mark_started();

        let ctx = WorkerContext {
            index,
            shared: Arc::clone(&self.shared),
            kind: self.job.kind,
            format: self.format.clone(),
            destination: self.job.destination.clone(),
            engine: Arc::clone(&self.engine),
            transcoder: Arc::clone(&self.transcoder),
        };
        tokio::spawn(worker::run(ctx));
    }

    /// Cancel the whole batch: cooperative flags plus forced termination
    /// of the engine processes of running workers. Cancellation is
    /// asynchronous; poll `is_completed` to observe workers reaching
    /// their terminal state.
    pub fn kill_all(&self) {
        info!(job_id = %self.job.id, "🛑 killing all workers");
        self.shared.kill_all(None);
    }

    /// True iff every worker reached a terminal state
    pub fn is_completed(&self) -> bool {
        self.shared.is_completed()
    }

    /// True iff every worker is done and none errored or was killed
    pub fn was_successful(&self) -> bool {
        self.shared.was_successful()
    }

    /// Read access to the per-URL workers for progress rendering
    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn job(&self) -> &BatchJob {
        &self.job
    }

    /// The format expression this batch sends to the engine
    pub fn format_expression(&self) -> &str {
        &self.format
    }

    /// Poll-driven aggregator over this batch's worker states
    pub fn reporter(&self) -> ProgressReporter {
        ProgressReporter::new(self.shared.urls.clone(), self.shared.states.clone())
    }
}
