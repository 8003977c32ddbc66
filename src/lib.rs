//! Media Downloader Deluxe - Core Library
//!
//! Batch-downloads media URLs (video, audio-only, or video-only) at a
//! selected quality through an external extraction engine (yt-dlp) and an
//! external transcoding tool (ffmpeg). The embedding front-end constructs a
//! [`BatchJob`], hands it to a [`DownloadCoordinator`], and polls progress
//! through the coordinator's workers or a [`ProgressReporter`] snapshot.

pub mod core;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{
    coordinator::{CompletionCallback, DownloadCoordinator, ErrorCallback},
    engine::{DownloadRequest, ExtractionEngine, HookAction, ProgressEvent, YtDlpEngine},
    format_selector::FormatSelector,
    models::{
        BatchJob, CoreError, CoreResult, MediaKind, MusicQuality, Quality, QualityTier,
        SchedulingMode, WorkerState, WorkerStatus,
    },
    progress::{BatchOutcome, BatchSnapshot, ProgressReporter},
    settings::Settings,
    transcoder::{FfmpegTranscoder, TranscodeError, Transcoder},
    worker::Worker,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize the library's logging sink with default settings
pub fn init() {
    utils::logging::init_tracing();
    tracing::info!("📚 {} v{} initialized", NAME, VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!NAME.is_empty());
    }
}
