//! Per-URL download worker
//!
//! Each worker downloads exactly one URL end-to-end on its own tokio task:
//! it drives the extraction engine, streams percent updates into its shared
//! state record, transcodes Music downloads to mp3 before marking itself
//! done, and contains every failure locally. Cancellation is cooperative:
//! it is checked at every progress callback and at the task's await points.
//! A cancelled worker never reports through the error callback.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::coordinator::BatchShared;
use crate::core::engine::{
    DownloadRequest, EngineError, ExtractionEngine, HookAction, ProgressEvent, ProgressHook,
};
use crate::core::models::{CoreError, MediaKind, WorkerState, WorkerStatus};
use crate::core::transcoder::Transcoder;

/// Target container for Music downloads
const MUSIC_EXTENSION: &str = "mp3";

/// Read-only handle to one worker, exposed for progress rendering
pub struct Worker {
    url: String,
    state: Arc<WorkerState>,
}

impl Worker {
    pub(crate) fn new(url: String, state: Arc<WorkerState>) -> Self {
        Self { url, state }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> &Arc<WorkerState> {
        &self.state
    }

    pub fn percent(&self) -> u8 {
        self.state.percent()
    }

    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    pub fn is_errored(&self) -> bool {
        self.state.is_errored()
    }

    pub fn status(&self) -> WorkerStatus {
        self.state.status()
    }
}

/// Everything a spawned worker task needs
pub(crate) struct WorkerContext {
    pub index: usize,
    pub shared: Arc<BatchShared>,
    pub kind: MediaKind,
    pub format: String,
    pub destination: PathBuf,
    pub engine: Arc<dyn ExtractionEngine>,
    pub transcoder: Arc<dyn Transcoder>,
}

/// Worker task body. Never panics outward; every failure ends in an
/// errored-and-done state reported through the batch error callback.
pub(crate) async fn run(ctx: WorkerContext) {
    let state = Arc::clone(&ctx.shared.states[ctx.index]);
    let url = ctx.shared.urls[ctx.index].clone();

    let request = DownloadRequest {
        url: url.clone(),
        format: ctx.format.clone(),
        destination: ctx.destination.clone(),
    };

    let hook: ProgressHook = {
        let state = Arc::clone(&state);
        Arc::new(move |event| {
            // Cancellation takes effect at the next progress callback
            if state.kill_requested() {
                return HookAction::Abort;
            }
            match event {
                ProgressEvent::Downloading { percent } => state.set_percent(percent),
                ProgressEvent::Finished { path } => state.set_finished_file(path),
            }
            HookAction::Continue
        })
    };

    debug!(%url, "worker starting download");

    let outcome = tokio::select! {
        biased;
        _ = state.wait_for_kill() => None,
        result = ctx.engine.download(&request, hook) => Some(result),
    };

    match outcome {
        // Kill arrived while the engine was blocked; dropping the download
        // future terminated the engine process.
        None => {
            state.mark_killed();
            debug!(%url, "worker killed");
            return;
        }
        Some(Err(EngineError::Aborted)) => {
            state.mark_killed();
            debug!(%url, "worker aborted at progress callback");
            return;
        }
        Some(Err(err)) => {
            fail(&ctx, &state, &url, CoreError::Download(err.to_string()));
        }
        Some(Ok(())) => {
            if state.kill_requested() {
                state.mark_killed();
                return;
            }

            let mut transcode_failed = false;
            if ctx.kind == MediaKind::Music {
                if let Err(err) = transcode_finished(&ctx, &state).await {
                    fail(&ctx, &state, &url, err);
                    transcode_failed = true;
                }
            }

            if !transcode_failed {
                state.set_percent(100);
                state.mark_done();
                info!(%url, "worker finished");
            }
        }
    }

    // Completion callback with the batch-wide success snapshot as of this
    // instant. Later failures do not retroactively change it.
    let snapshot = ctx.shared.was_successful();
    let callback = ctx.shared.completion_callback();
    if let Some(callback) = callback {
        callback(&url, snapshot);
    }
}

/// Convert the Music download into its final container before completion
async fn transcode_finished(
    ctx: &WorkerContext,
    state: &Arc<WorkerState>,
) -> Result<(), CoreError> {
    let input = state
        .take_finished_file()
        .ok_or_else(|| CoreError::Download("engine did not report an output file".to_string()))?;

    let transcoder = Arc::clone(&ctx.transcoder);
    let output = tokio::task::spawn_blocking(move || transcoder.convert(&input, MUSIC_EXTENSION))
        .await
        .map_err(|err| CoreError::Download(format!("transcode task failed: {err}")))??;

    debug!(output = %output.display(), "transcode complete");
    Ok(())
}

/// Contain a failure inside this worker and apply the batch fail-fast
/// policy: report via the error callback, then kill the siblings.
fn fail(ctx: &WorkerContext, state: &Arc<WorkerState>, url: &str, err: CoreError) {
    warn!(%url, error = %err, "worker failed");
    state.record_error(err.to_string());
    state.mark_done();

    if let Some(callback) = ctx.shared.error_callback() {
        callback(url, Some(&err));
    }

    // Fail-fast policy: one failed URL kills the whole batch
    ctx.shared.kill_all(Some(ctx.index));
}
