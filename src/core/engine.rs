//! Extraction engine integration
//!
//! The core drives an external media-extraction engine through the
//! [`ExtractionEngine`] trait. The production implementation spawns the
//! yt-dlp binary and streams its textual progress output back to the worker
//! as structured events. The engine child is an OS process killed on drop,
//! which is what makes forced cancellation of a blocked download possible.

use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::OnceLock;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// One URL to fetch with an already-selected format expression
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub format: String,
    pub destination: PathBuf,
}

/// Structured progress events delivered to the worker's hook.
///
/// Events for one download are strictly ordered; nothing is guaranteed
/// across different downloads.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Downloading { percent: u8 },
    Finished { path: PathBuf },
}

/// Hook verdict, checked by the engine after every event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    Continue,
    /// Cooperative cancellation: stop the download at the next safe point
    Abort,
}

/// Progress callback invoked by the engine with each event
pub type ProgressHook = Arc<dyn Fn(ProgressEvent) -> HookAction + Send + Sync>;

/// Engine-level failures
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("extraction engine reported failure: {0}")]
    DownloadFailure(String),

    /// The progress hook requested an abort. Not an error from the
    /// caller's point of view.
    #[error("download aborted by caller")]
    Aborted,

    #[error("failed to launch extraction engine: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to read engine output: {0}")]
    Io(#[from] std::io::Error),
}

/// External media-extraction engine contract.
///
/// `download` fetches a single URL end-to-end, invoking the hook for every
/// progress event. Implementations must honor [`HookAction::Abort`]
/// promptly and must remain cancel-safe: dropping the returned future
/// terminates the underlying fetch.
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    async fn download(
        &self,
        request: &DownloadRequest,
        hook: ProgressHook,
    ) -> Result<(), EngineError>;
}

/// yt-dlp subprocess engine
pub struct YtDlpEngine {
    binary: PathBuf,
}

impl YtDlpEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Resolve the engine binary from PATH
    pub fn from_path_env() -> Self {
        Self::new("yt-dlp")
    }

    fn command(&self, request: &DownloadRequest) -> Command {
        let output_template = request.destination.join("%(title)s.%(ext)s");

        let mut cmd = Command::new(&self.binary);
        cmd.arg("--newline")
            .arg("--no-warnings")
            // The caller-side retry policy is effectively infinite; a
            // persistently failing network condition blocks the worker
            // until it is killed.
            .arg("--retries")
            .arg("infinite")
            .arg("--format")
            .arg(&request.format)
            .arg("--output")
            .arg(output_template)
            .arg(&request.url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

fn percent_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[download\]\s+(\d+(?:\.\d+)?)%").expect("valid regex"))
}

fn destination_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[download\] Destination: (.+)|\[Merger\] Merging formats into \x22(.+)\x22")
            .expect("valid regex")
    })
}

/// Parse a percent-complete value out of one engine progress line
pub(crate) fn parse_percent(line: &str) -> Option<u8> {
    let captures = percent_regex().captures(line)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    Some(value.min(100.0) as u8)
}

/// Parse the output file path the engine reports for this download
pub(crate) fn parse_destination(line: &str) -> Option<PathBuf> {
    let captures = destination_regex().captures(line)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| PathBuf::from(m.as_str().trim()))
}

#[async_trait]
impl ExtractionEngine for YtDlpEngine {
    async fn download(
        &self,
        request: &DownloadRequest,
        hook: ProgressHook,
    ) -> Result<(), EngineError> {
        debug!(url = %request.url, format = %request.format, "spawning extraction engine");

        let mut child = self
            .command(request)
            .spawn()
            .map_err(EngineError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::DownloadFailure("engine stdout unavailable".into()))?;
        let mut stderr = child.stderr.take();

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(stderr) = stderr.as_mut() {
                let _ = stderr.read_to_string(&mut buf).await;
            }
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut output_path: Option<PathBuf> = None;
        let mut aborted = false;

        while let Some(line) = lines.next_line().await? {
            if let Some(path) = parse_destination(&line) {
                output_path = Some(path);
                continue;
            }
            if let Some(percent) = parse_percent(&line) {
                if hook(ProgressEvent::Downloading { percent }) == HookAction::Abort {
                    debug!(url = %request.url, "abort requested, killing engine process");
                    let _ = child.start_kill();
                    aborted = true;
                    break;
                }
            }
        }

        let status = child.wait().await?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if aborted {
            return Err(EngineError::Aborted);
        }

        if !status.success() {
            let detail = stderr_output
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("engine exited with non-zero status")
                .to_string();
            warn!(url = %request.url, %detail, "extraction engine failed");
            return Err(EngineError::DownloadFailure(detail));
        }

        if let Some(path) = output_path {
            hook(ProgressEvent::Finished { path });
        }

        Ok(())
    }
}
