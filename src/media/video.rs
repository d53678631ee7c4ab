// SPDX-License-Identifier: MPL-2.0
//! FFmpeg initialization and lightweight video probing.

use crate::error::{Error, Result, VideoError};
use std::path::Path;
use std::sync::OnceLock;

/// Outcome of the one-time FFmpeg initialization.
static FFMPEG_INIT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/// Initialize FFmpeg with appropriate log level.
///
/// Safe to call from any decoder thread; initialization happens once and
/// every call reports its outcome. The FFmpeg log level is lowered to ERROR
/// so container warnings do not flood stderr.
pub fn init_ffmpeg() -> Result<()> {
    FFMPEG_INIT
        .get_or_init(|| {
            ffmpeg_next::init().map_err(|e| e.to_string())?;
            // SAFETY: av_log_set_level is thread-safe and only affects logging
            unsafe {
                ffmpeg_next::ffi::av_log_set_level(ffmpeg_next::ffi::AV_LOG_ERROR);
            }
            Ok(())
        })
        .clone()
        .map_err(|e| Error::Io(format!("FFmpeg initialization failed: {e}")))
}

/// Video metadata shown in the preview status line.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Duration in seconds, 0.0 when the container does not say.
    pub duration_secs: f64,
    pub has_audio: bool,
}

impl VideoMetadata {
    /// Formats the duration as `m:ss` or `h:mm:ss`.
    #[must_use]
    pub fn duration_label(&self) -> String {
        format_duration(self.duration_secs)
    }
}

/// Formats seconds as `m:ss`, or `h:mm:ss` past one hour.
#[must_use]
pub fn format_duration(secs: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = secs.max(0.0).round() as u64;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Reads dimensions, duration and audio presence without decoding frames.
///
/// # Errors
///
/// Returns [`Error::Video`] when FFmpeg cannot open the file or it has no
/// usable video stream.
pub fn probe<P: AsRef<Path>>(path: P) -> Result<VideoMetadata> {
    init_ffmpeg()?;

    let ictx = ffmpeg_next::format::input(&path)
        .map_err(|e| VideoError::from_message(&format!("Failed to open video file: {e}")))?;

    let video_stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .ok_or(VideoError::NoVideoStream)?;

    let context_decoder =
        ffmpeg_next::codec::context::Context::from_parameters(video_stream.parameters())
            .map_err(|e| VideoError::from_message(&format!("Failed to create codec context: {e}")))?;
    let decoder = context_decoder
        .decoder()
        .video()
        .map_err(|e| VideoError::from_message(&format!("Failed to create video decoder: {e}")))?;

    let width = decoder.width();
    let height = decoder.height();
    if width == 0 || height == 0 {
        return Err(VideoError::CorruptedFile.into());
    }

    #[allow(clippy::cast_precision_loss)]
    let duration_secs = if video_stream.duration() > 0 {
        let time_base = video_stream.time_base();
        video_stream.duration() as f64 * f64::from(time_base.numerator())
            / f64::from(time_base.denominator())
    } else if ictx.duration() > 0 {
        ictx.duration() as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE)
    } else {
        0.0
    };

    let has_audio = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Audio)
        .is_some();

    Ok(VideoMetadata {
        width,
        height,
        duration_secs,
        has_audio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn format_duration_under_an_hour() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(65.4), "1:05");
        assert_eq!(format_duration(599.6), "10:00");
    }

    #[test]
    fn format_duration_over_an_hour() {
        assert_eq!(format_duration(3723.0), "1:02:03");
    }

    #[test]
    fn format_duration_clamps_negative() {
        assert_eq!(format_duration(-3.0), "0:00");
    }

    #[test]
    fn init_ffmpeg_reports_the_same_outcome_every_call() {
        let first = init_ffmpeg().map_err(|e| e.to_string());
        let second = init_ffmpeg().map_err(|e| e.to_string());
        assert_eq!(first, second);
        assert_eq!(FFMPEG_INIT.get().map(|outcome| outcome.is_ok()), Some(first.is_ok()));
    }

    #[test]
    fn probe_rejects_non_video_bytes() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let path = temp_dir.path().join("fake.mp4");
        std::fs::write(&path, b"definitely not a video").expect("write fake video");

        assert!(probe(&path).is_err());
    }
}
