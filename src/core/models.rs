//! Core data models for the batch media downloader
//!
//! Defines the media kind and quality scales, the immutable batch job
//! description, the shared per-worker state record, and the library error
//! taxonomy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::core::transcoder::TranscodeError;
use crate::utils::validation::validate_url;

/// What kind of media a batch job produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    /// Video with audio, muxed into mp4
    Video,
    /// Audio only, transcoded to mp3 after download
    Music,
    /// Video stream without audio
    VideoOnly,
}

/// Quality scale for Video and VideoOnly jobs (6 tiers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    Best,
    Good,
    Normal,
    Bad,
    VeryBad,
    Worst,
}

/// Quality scale for Music jobs (3 tiers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MusicQuality {
    Best,
    Normal,
    Worst,
}

impl MusicQuality {
    /// Map a music tier onto the nearest equivalent of the 6-tier scale.
    ///
    /// The correspondence is fixed: Best→Best, Normal→Normal, Worst→Worst.
    pub fn normalize(self) -> Quality {
        match self {
            MusicQuality::Best => Quality::Best,
            MusicQuality::Normal => Quality::Normal,
            MusicQuality::Worst => Quality::Worst,
        }
    }

    /// Parse a settings/UI label into a music tier
    pub fn from_label(label: &str) -> CoreResult<Self> {
        match label.to_ascii_lowercase().as_str() {
            "best" => Ok(MusicQuality::Best),
            "normal" => Ok(MusicQuality::Normal),
            "worst" => Ok(MusicQuality::Worst),
            other => Err(CoreError::InvalidComparison(other.to_string())),
        }
    }
}

impl Quality {
    /// The music tier this video tier corresponds to, if any.
    ///
    /// Good/Bad/VeryBad have no music equivalent and return `None`.
    pub fn music_equivalent(self) -> Option<MusicQuality> {
        match self {
            Quality::Best => Some(MusicQuality::Best),
            Quality::Normal => Some(MusicQuality::Normal),
            Quality::Worst => Some(MusicQuality::Worst),
            Quality::Good | Quality::Bad | Quality::VeryBad => None,
        }
    }

    /// Compare a video tier against a music tier through the 3-point
    /// correspondence. Tiers without a music equivalent never match.
    pub fn matches_music(self, other: MusicQuality) -> bool {
        self.music_equivalent() == Some(other)
    }

    /// Parse a settings/UI label into a video tier
    pub fn from_label(label: &str) -> CoreResult<Self> {
        match label.to_ascii_lowercase().as_str() {
            "best" => Ok(Quality::Best),
            "good" => Ok(Quality::Good),
            "normal" => Ok(Quality::Normal),
            "bad" => Ok(Quality::Bad),
            "verybad" | "very_bad" => Ok(Quality::VeryBad),
            "worst" => Ok(Quality::Worst),
            other => Err(CoreError::InvalidComparison(other.to_string())),
        }
    }
}

/// A quality tier from either scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityTier {
    Video(Quality),
    Music(MusicQuality),
}

impl QualityTier {
    /// Normalize onto the 6-tier scale (music tiers via the 3-point mapping)
    pub fn to_standard(self) -> Quality {
        match self {
            QualityTier::Video(q) => q,
            QualityTier::Music(m) => m.normalize(),
        }
    }

    /// Cross-scale compatibility predicate.
    ///
    /// Same-scale tiers compare by equality; tiers from different scales
    /// compare through the 3-point correspondence. Incompatible concrete
    /// levels (e.g. Good vs any music tier) are simply not equal.
    pub fn matches(self, other: QualityTier) -> bool {
        match (self, other) {
            (QualityTier::Video(a), QualityTier::Video(b)) => a == b,
            (QualityTier::Music(a), QualityTier::Music(b)) => a == b,
            (QualityTier::Video(a), QualityTier::Music(b))
            | (QualityTier::Music(b), QualityTier::Video(a)) => a.matches_music(b),
        }
    }
}

/// Compare two quality labels coming in as raw strings (settings store, UI).
///
/// Labels are resolved against the 6-tier scale; a label that belongs to
/// neither scale fails with [`CoreError::InvalidComparison`].
pub fn labels_match(a: &str, b: &str) -> CoreResult<bool> {
    Ok(Quality::from_label(a)? == Quality::from_label(b)?)
}

/// How workers of a batch are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingMode {
    /// Exactly one worker at a time, chained through the completion callback
    Sequential,
    /// All workers launch at once
    Parallel,
}

/// One user-initiated request to download a list of URLs.
///
/// Immutable once the coordinator is constructed from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: String,
    pub urls: Vec<String>,
    pub kind: MediaKind,
    pub quality: QualityTier,
    pub destination: PathBuf,
    pub mode: SchedulingMode,
    /// Upper bound for parallel mode. Reserved for future throttling;
    /// current parallel behavior launches every worker at once.
    pub max_parallel: usize,
}

impl BatchJob {
    pub fn new(
        urls: Vec<String>,
        kind: MediaKind,
        quality: QualityTier,
        destination: impl Into<PathBuf>,
        mode: SchedulingMode,
        max_parallel: usize,
    ) -> CoreResult<Self> {
        if urls.is_empty() {
            return Err(CoreError::Config("batch job has no URLs".to_string()));
        }
        for url in &urls {
            validate_url(url)?;
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            urls,
            kind,
            quality,
            destination: destination.into(),
            mode,
            max_parallel,
        })
    }
}

/// Lifecycle position of a single worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerStatus {
    Idle,
    Running,
    Finished,
    Errored,
    Killed,
}

/// Per-URL mutable record shared across the worker/coordinator/reporter
/// boundary.
///
/// Percent and the done/errored flags are written only by the owning worker;
/// the kill flag may additionally be set by the coordinator. Everything else
/// reads.
#[derive(Debug, Default)]
pub struct WorkerState {
    percent: AtomicU8,
    started: AtomicBool,
    done: AtomicBool,
    errored: AtomicBool,
    killed: AtomicBool,
    kill_notify: Notify,
    error_message: parking_lot::Mutex<Option<String>>,
    finished_file: parking_lot::Mutex<Option<PathBuf>>,
}

impl WorkerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress percent, 0–100
    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::Acquire)
    }

    /// Monotone update; a stale lower sample never rolls progress back
    pub fn set_percent(&self, percent: u8) {
        self.percent.fetch_max(percent.min(100), Ordering::AcqRel);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub fn is_errored(&self) -> bool {
        self.errored.load(Ordering::Acquire)
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }

    /// Whether cancellation has been requested for this worker
    pub fn kill_requested(&self) -> bool {
        self.is_killed()
    }

    pub(crate) fn mark_started(&self) {
        self.started.store(true, Ordering::Release);
    }

    pub(crate) fn mark_done(&self) {
        self.done.store(true, Ordering::Release);
    }

    pub(crate) fn record_error(&self, message: String) {
        *self.error_message.lock() = Some(message);
        self.errored.store(true, Ordering::Release);
    }

    /// Set the cancellation flag and wake a worker blocked in the engine
    pub(crate) fn request_kill(&self) {
        self.killed.store(true, Ordering::Release);
        self.kill_notify.notify_waiters();
    }

    /// Terminal transition for a cancelled worker
    pub(crate) fn mark_killed(&self) {
        self.killed.store(true, Ordering::Release);
        self.done.store(true, Ordering::Release);
    }

    /// Resolve once cancellation has been requested
    pub(crate) async fn wait_for_kill(&self) {
        loop {
            let notified = self.kill_notify.notified();
            if self.is_killed() {
                return;
            }
            notified.await;
        }
    }

    pub(crate) fn set_finished_file(&self, path: PathBuf) {
        *self.finished_file.lock() = Some(path);
    }

    pub(crate) fn take_finished_file(&self) -> Option<PathBuf> {
        self.finished_file.lock().take()
    }

    /// Last recorded failure, if any
    pub fn error_message(&self) -> Option<String> {
        self.error_message.lock().clone()
    }

    /// Derived lifecycle position
    pub fn status(&self) -> WorkerStatus {
        if self.is_done() {
            if self.is_killed() {
                WorkerStatus::Killed
            } else if self.is_errored() {
                WorkerStatus::Errored
            } else {
                WorkerStatus::Finished
            }
        } else if self.is_started() {
            WorkerStatus::Running
        } else {
            WorkerStatus::Idle
        }
    }
}

/// Library error taxonomy
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid quality {quality:?} for kind {kind:?}")]
    InvalidQuality { kind: MediaKind, quality: Quality },

    #[error("cannot compare quality label: {0:?}")]
    InvalidComparison(String),

    #[error("all workers were started already")]
    NoMoreWorkers,

    #[error("download failed: {0}")]
    Download(String),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error("connection check failed: {0}")]
    Connection(String),

    #[error("destination is not writable: {0}")]
    DestinationNotWritable(PathBuf),

    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_music_quality_normalization() {
        assert_eq!(MusicQuality::Best.normalize(), Quality::Best);
        assert_eq!(MusicQuality::Normal.normalize(), Quality::Normal);
        assert_eq!(MusicQuality::Worst.normalize(), Quality::Worst);
    }

    #[test]
    fn test_normalization_round_trip_is_idempotent() {
        for music in [MusicQuality::Best, MusicQuality::Normal, MusicQuality::Worst] {
            let standard = music.normalize();
            assert_eq!(standard.music_equivalent(), Some(music));
        }
    }

    #[test]
    fn test_cross_scale_compatibility() {
        assert!(Quality::Best.matches_music(MusicQuality::Best));
        assert!(Quality::Worst.matches_music(MusicQuality::Worst));
        assert!(!Quality::Best.matches_music(MusicQuality::Normal));

        // Tiers without a music equivalent are "not equal", never an error
        for music in [MusicQuality::Best, MusicQuality::Normal, MusicQuality::Worst] {
            assert!(!Quality::Good.matches_music(music));
            assert!(!Quality::Bad.matches_music(music));
            assert!(!Quality::VeryBad.matches_music(music));
        }
    }

    #[test]
    fn test_tier_matching_across_scales() {
        let video_best = QualityTier::Video(Quality::Best);
        let music_best = QualityTier::Music(MusicQuality::Best);
        assert!(video_best.matches(music_best));
        assert!(music_best.matches(video_best));

        let good = QualityTier::Video(Quality::Good);
        assert!(!good.matches(music_best));
        assert!(good.matches(QualityTier::Video(Quality::Good)));
    }

    #[test]
    fn test_label_comparison() {
        assert!(labels_match("best", "Best").unwrap());
        assert!(!labels_match("good", "normal").unwrap());

        let err = labels_match("best", "shiny").unwrap_err();
        assert!(matches!(err, CoreError::InvalidComparison(_)));
    }

    #[test]
    fn test_batch_job_rejects_empty_url_list() {
        let result = BatchJob::new(
            vec![],
            MediaKind::Video,
            QualityTier::Video(Quality::Best),
            "/tmp",
            SchedulingMode::Parallel,
            4,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_batch_job_rejects_malformed_url() {
        let result = BatchJob::new(
            vec!["not a url".to_string()],
            MediaKind::Video,
            QualityTier::Video(Quality::Best),
            "/tmp",
            SchedulingMode::Parallel,
            4,
        );
        assert!(matches!(result, Err(CoreError::InvalidUrl { .. })));
    }

    #[test]
    fn test_worker_state_percent_is_monotone() {
        let state = WorkerState::new();
        state.set_percent(50);
        state.set_percent(30);
        assert_eq!(state.percent(), 50);
        state.set_percent(200);
        assert_eq!(state.percent(), 100);
    }

    #[test]
    fn test_worker_status_transitions() {
        let state = WorkerState::new();
        assert_eq!(state.status(), WorkerStatus::Idle);

        state.mark_started();
        assert_eq!(state.status(), WorkerStatus::Running);

        state.mark_done();
        assert_eq!(state.status(), WorkerStatus::Finished);
    }

    #[test]
    fn test_killed_status_wins_over_errored() {
        let state = WorkerState::new();
        state.mark_started();
        state.record_error("boom".to_string());
        state.mark_killed();
        assert_eq!(state.status(), WorkerStatus::Killed);
        assert!(state.is_done());
    }
}
