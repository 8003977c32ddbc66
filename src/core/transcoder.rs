//! Post-download transcoding
//!
//! Invokes the external transcoding tool (ffmpeg) as a blocking subprocess
//! to convert a freshly downloaded file into another container, e.g.
//! extracting audio to mp3. Runs synchronously inside the calling worker;
//! callers needing responsiveness must already be off the UI thread.

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, error};

/// Exit status ffmpeg reports when it cannot write the output file
/// (0xFFFFFFF3 as seen on Windows shells).
const PERMISSION_EXIT_CODE: i32 = -13;

/// Transcode failures
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("transcoding tool has no permission to write {path}")]
    Permission { path: PathBuf },

    #[error("transcoding tool exited with code {code:?}: {detail}")]
    Conversion { code: Option<i32>, detail: String },

    #[error("failed to run transcoding tool: {0}")]
    Io(#[from] std::io::Error),
}

/// External transcoding tool contract.
///
/// `convert` blocks until the subprocess exits. On success the
/// pre-conversion source file is deleted and the new path returned.
pub trait Transcoder: Send + Sync {
    fn convert(&self, input: &Path, target_ext: &str) -> Result<PathBuf, TranscodeError>;
}

/// ffmpeg subprocess transcoder
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Resolve the tool from PATH
    pub fn from_path_env() -> Self {
        Self::new("ffmpeg")
    }

    /// Output path for a conversion: same location, new extension
    pub fn output_path_for(input: &Path, target_ext: &str) -> PathBuf {
        input.with_extension(target_ext.trim_start_matches('.'))
    }
}

impl Transcoder for FfmpegTranscoder {
    fn convert(&self, input: &Path, target_ext: &str) -> Result<PathBuf, TranscodeError> {
        let output = Self::output_path_for(input, target_ext);
        debug!(input = %input.display(), output = %output.display(), "converting");

        let result = Command::new(&self.binary)
            .arg("-i")
            .arg(input)
            .arg("-y")
            .arg(&output)
            .output()?;

        if !result.status.success() {
            let code = result.status.code();
            let stderr = String::from_utf8_lossy(&result.stderr);
            if code == Some(PERMISSION_EXIT_CODE) || stderr.contains("Permission denied") {
                error!(path = %output.display(), "transcoding tool denied write access");
                return Err(TranscodeError::Permission { path: output });
            }
            let detail = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("no diagnostic output")
                .to_string();
            error!(?code, %detail, "transcoding tool failed");
            return Err(TranscodeError::Conversion { code, detail });
        }

        // The raw download is no longer needed once the conversion landed
        std::fs::remove_file(input)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_output_path_replaces_extension() {
        let output = FfmpegTranscoder::output_path_for(Path::new("/music/song.webm"), ".mp3");
        assert_eq!(output, PathBuf::from("/music/song.mp3"));

        let output = FfmpegTranscoder::output_path_for(Path::new("/music/song.webm"), "mp3");
        assert_eq!(output, PathBuf::from("/music/song.mp3"));
    }

    #[test]
    fn test_missing_tool_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.webm");
        let mut file = std::fs::File::create(&input).unwrap();
        file.write_all(b"fake media").unwrap();

        let transcoder = FfmpegTranscoder::new(dir.path().join("no-such-ffmpeg"));
        let err = transcoder.convert(&input, ".mp3").unwrap_err();
        assert!(matches!(err, TranscodeError::Io(_)));

        // Failure must leave the source file untouched
        assert!(input.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_tool_reports_conversion_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.webm");
        std::fs::write(&input, b"fake media").unwrap();

        // A stand-in tool that always fails with a non-zero status
        let tool = dir.path().join("fake-ffmpeg");
        std::fs::write(&tool, "#!/bin/sh\necho 'boom' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let transcoder = FfmpegTranscoder::new(&tool);
        let err = transcoder.convert(&input, ".mp3").unwrap_err();
        match err {
            TranscodeError::Conversion { code, detail } => {
                assert_eq!(code, Some(1));
                assert!(detail.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(input.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_conversion_removes_source() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.webm");
        std::fs::write(&input, b"fake media").unwrap();

        // A stand-in tool that "converts" by creating the last argument
        let tool = dir.path().join("fake-ffmpeg");
        std::fs::write(&tool, "#!/bin/sh\nfor last; do :; done\ntouch \"$last\"\nexit 0\n")
            .unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let transcoder = FfmpegTranscoder::new(&tool);
        let output = transcoder.convert(&input, ".mp3").unwrap();

        assert_eq!(output, dir.path().join("clip.mp3"));
        assert!(output.exists());
        assert!(!input.exists());
    }
}
