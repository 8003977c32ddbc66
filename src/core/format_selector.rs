//! Format expression selection
//!
//! Pure mapping from (media kind, quality tier) to the extraction engine's
//! format-selection expression. The expressions are written in the engine's
//! own selection DSL and are emitted verbatim, never reinterpreted here.

use crate::core::models::{CoreError, CoreResult, MediaKind, Quality};

/// Selects engine format expressions for download requests
pub struct FormatSelector;

impl FormatSelector {
    /// Produce the format expression for a (kind, quality) pair.
    ///
    /// Total over the documented pairs; a quality outside the kind's
    /// accepted scale fails with [`CoreError::InvalidQuality`]. Music only
    /// accepts the tiers that have a 3-tier equivalent.
    pub fn select(kind: MediaKind, quality: Quality) -> CoreResult<String> {
        let expression = match kind {
            MediaKind::Video => Self::video_expression(quality),
            MediaKind::VideoOnly => Self::video_only_expression(quality),
            MediaKind::Music => Self::music_expression(quality).ok_or(CoreError::InvalidQuality {
                kind,
                quality,
            })?,
        };
        Ok(expression.to_string())
    }

    fn video_expression(quality: Quality) -> &'static str {
        match quality {
            Quality::Best => "mp4",
            Quality::Good => {
                "(bestvideo[height<=720][ext=mp4]+bestaudio/best[height<=720][ext=mp4])[ext=mp4]"
            }
            Quality::Normal => {
                "(bestvideo[height<=480][ext=mp4]+bestaudio/best[height<=480][ext=mp4])[ext=mp4]"
            }
            Quality::Bad => {
                "(bestvideo[height<=360][ext=mp4]+bestaudio/best[height<=360][ext=mp4])[ext=mp4]"
            }
            Quality::VeryBad => {
                "(bestvideo[height<=240][ext=mp4]+bestaudio/best[height<=240][ext=mp4])[ext=mp4]"
            }
            Quality::Worst => "(worstvideo[ext=mp4]+worstaudio/worst[ext=mp4])[ext=mp4]",
        }
    }

    fn video_only_expression(quality: Quality) -> &'static str {
        match quality {
            Quality::Best => "bestvideo[ext=mp4]",
            Quality::Good => "bestvideo[height<=720][ext=mp4]",
            Quality::Normal => "bestvideo[height<=480][ext=mp4]",
            Quality::Bad => "bestvideo[height<=360][ext=mp4]",
            Quality::VeryBad => "bestvideo[height<=240][ext=mp4]",
            Quality::Worst => "worstvideo[ext=mp4]",
        }
    }

    fn music_expression(quality: Quality) -> Option<&'static str> {
        match quality {
            Quality::Best => Some("bestaudio"),
            Quality::Normal => Some("bestaudio[abr<=100]"),
            Quality::Worst => Some("worstaudio"),
            Quality::Good | Quality::Bad | Quality::VeryBad => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_QUALITIES: [Quality; 6] = [
        Quality::Best,
        Quality::Good,
        Quality::Normal,
        Quality::Bad,
        Quality::VeryBad,
        Quality::Worst,
    ];

    #[test]
    fn test_video_ladder() {
        assert_eq!(
            FormatSelector::select(MediaKind::Video, Quality::Best).unwrap(),
            "mp4"
        );
        assert_eq!(
            FormatSelector::select(MediaKind::Video, Quality::Good).unwrap(),
            "(bestvideo[height<=720][ext=mp4]+bestaudio/best[height<=720][ext=mp4])[ext=mp4]"
        );
        assert_eq!(
            FormatSelector::select(MediaKind::Video, Quality::Worst).unwrap(),
            "(worstvideo[ext=mp4]+worstaudio/worst[ext=mp4])[ext=mp4]"
        );
    }

    #[test]
    fn test_video_only_ladder() {
        assert_eq!(
            FormatSelector::select(MediaKind::VideoOnly, Quality::Best).unwrap(),
            "bestvideo[ext=mp4]"
        );
        assert_eq!(
            FormatSelector::select(MediaKind::VideoOnly, Quality::VeryBad).unwrap(),
            "bestvideo[height<=240][ext=mp4]"
        );
        assert_eq!(
            FormatSelector::select(MediaKind::VideoOnly, Quality::Worst).unwrap(),
            "worstvideo[ext=mp4]"
        );
    }

    #[test]
    fn test_music_ladder() {
        assert_eq!(
            FormatSelector::select(MediaKind::Music, Quality::Best).unwrap(),
            "bestaudio"
        );
        assert_eq!(
            FormatSelector::select(MediaKind::Music, Quality::Normal).unwrap(),
            "bestaudio[abr<=100]"
        );
        assert_eq!(
            FormatSelector::select(MediaKind::Music, Quality::Worst).unwrap(),
            "worstaudio"
        );
    }

    #[test]
    fn test_music_rejects_video_only_tiers() {
        for quality in [Quality::Good, Quality::Bad, Quality::VeryBad] {
            let err = FormatSelector::select(MediaKind::Music, quality).unwrap_err();
            assert!(matches!(err, CoreError::InvalidQuality { .. }));
        }
    }

    #[test]
    fn test_selection_is_total_and_deterministic() {
        for kind in [MediaKind::Video, MediaKind::VideoOnly] {
            for quality in ALL_QUALITIES {
                let first = FormatSelector::select(kind, quality).unwrap();
                let second = FormatSelector::select(kind, quality).unwrap();
                assert!(!first.is_empty());
                assert_eq!(first, second);
            }
        }
    }
}
