//! Poll-driven progress aggregation
//!
//! A passive reporter the caller samples at its own interval to render
//! batch progress. It only reads the shared worker states; it never drives
//! the download.

use serde::Serialize;
use std::sync::Arc;

use crate::core::models::{WorkerState, WorkerStatus};

/// Aggregated batch outcome as an explicit tagged value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum BatchOutcome {
    /// No worker has started yet
    Idle,
    /// At least one worker is still going; percent is the batch average
    InProgress { percent: u8 },
    /// Every worker finished cleanly
    Success { count: usize },
    /// At least one worker errored; carries the first failing URL
    Failed { url: String, cause: Option<String> },
    /// The batch was cancelled
    Cancelled,
}

/// One URL's progress as sampled at a point in time
#[derive(Debug, Clone, Serialize)]
pub struct UrlProgress {
    pub url: String,
    pub percent: u8,
    pub status: WorkerStatus,
}

/// Snapshot of the whole batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchSnapshot {
    pub outcome: BatchOutcome,
    pub urls: Vec<UrlProgress>,
    pub completed: bool,
    pub successful: bool,
}

/// Passive aggregator over one batch's worker states
pub struct ProgressReporter {
    urls: Vec<String>,
    states: Vec<Arc<WorkerState>>,
}

impl ProgressReporter {
    pub(crate) fn new(urls: Vec<String>, states: Vec<Arc<WorkerState>>) -> Self {
        Self { urls, states }
    }

    /// Sample every worker once and derive the batch outcome
    pub fn snapshot(&self) -> BatchSnapshot {
        let urls: Vec<UrlProgress> = self
            .urls
            .iter()
            .zip(self.states.iter())
            .map(|(url, state)| UrlProgress {
                url: url.clone(),
                percent: state.percent(),
                status: state.status(),
            })
            .collect();

        let completed = self.states.iter().all(|s| s.is_done());
        let successful = self
            .states
            .iter()
            .all(|s| s.is_done() && !s.is_errored() && !s.is_killed());

        BatchSnapshot {
            outcome: self.derive_outcome(&urls, completed),
            urls,
            completed,
            successful,
        }
    }

    fn derive_outcome(&self, urls: &[UrlProgress], completed: bool) -> BatchOutcome {
        // An error outranks the cancellations it triggered; a cancellation
        // outranks unfinished progress.
        if let Some((index, _)) = self
            .states
            .iter()
            .enumerate()
            .find(|(_, s)| s.is_errored())
        {
            return BatchOutcome::Failed {
                url: self.urls[index].clone(),
                cause: self.states[index].error_message(),
            };
        }

        if self.states.iter().any(|s| s.is_killed()) {
            return BatchOutcome::Cancelled;
        }

        if completed {
            return BatchOutcome::Success {
                count: self.states.len(),
            };
        }

        if self.states.iter().all(|s| !s.is_started()) {
            return BatchOutcome::Idle;
        }

        let total: u32 = urls.iter().map(|u| u.percent as u32).sum();
        BatchOutcome::InProgress {
            percent: (total / urls.len().max(1) as u32) as u8,
        }
    }
}
