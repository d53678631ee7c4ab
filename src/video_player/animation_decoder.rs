// SPDX-License-Identifier: MPL-2.0
//! Animated GIF decoder.
//!
//! GIFs are short, so every frame is decoded up front and replayed from
//! memory in a loop. The decoder speaks the same command/event protocol as
//! [`AsyncDecoder`](super::AsyncDecoder).

use super::decoder::{DecodedFrame, DecoderCommand, DecoderEvent};
use crate::error::{Error, Result};
use image_rs::codecs::gif::GifDecoder;
use image_rs::AnimationDecoder as _;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Shortest frame duration honoured (~60 fps).
const MIN_FRAME_DURATION_MS: u32 = 16;

/// One fully composed animation frame.
#[derive(Debug, Clone)]
pub struct AnimationFrame {
    pub rgba_data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub duration: Duration,
}

/// Decodes every frame of a GIF file.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, is not a GIF, or holds no
/// frames.
pub fn load_frames<P: AsRef<Path>>(path: P) -> Result<Vec<AnimationFrame>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let decoder = GifDecoder::new(reader)?;
    let frames = decoder.into_frames().collect_frames()?;

    if frames.is_empty() {
        return Err(Error::Io("No frames found in GIF file".to_string()));
    }

    Ok(frames
        .into_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay_ms = (numer / denom.max(1)).max(MIN_FRAME_DURATION_MS);
            let buffer = frame.into_buffer();
            AnimationFrame {
                width: buffer.width(),
                height: buffer.height(),
                rgba_data: Arc::new(buffer.into_raw()),
                duration: Duration::from_millis(u64::from(delay_ms)),
            }
        })
        .collect())
}

/// Async animated image decoder that runs in a Tokio blocking task.
#[derive(Debug)]
pub struct AnimationDecoder {
    command_tx: mpsc::UnboundedSender<DecoderCommand>,
    event_rx: mpsc::Receiver<DecoderEvent>,
}

impl AnimationDecoder {
    /// Creates a looping decoder for the GIF at `path`.
    ///
    /// The first frame is sent immediately; the animation advances once
    /// [`DecoderCommand::Play`] is received.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(Error::Io(format!("GIF file not found: {}", path.display())));
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(2);

        tokio::task::spawn_blocking(move || {
            let frames = match load_frames(&path) {
                Ok(frames) => frames,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "animation decoding failed: {e}");
                    let _ = event_tx.blocking_send(DecoderEvent::Error(e.to_string()));
                    return;
                }
            };
            tracing::debug!(path = %path.display(), frames = frames.len(), "animation loaded");
            Self::playback_loop(&frames, command_rx, &event_tx);
        });

        Ok(Self {
            command_tx,
            event_rx,
        })
    }

    /// Sends a command to the decoder task.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder task has exited.
    pub fn send_command(&self, command: DecoderCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::Io("Animation decoder task is not running".into()))
    }

    /// Receives the next event from the decoder.
    pub async fn recv_event(&mut self) -> Option<DecoderEvent> {
        self.event_rx.recv().await
    }

    fn playback_loop(
        frames: &[AnimationFrame],
        mut command_rx: mpsc::UnboundedReceiver<DecoderCommand>,
        event_tx: &mpsc::Sender<DecoderEvent>,
    ) {
        let mut is_playing = false;
        let mut send_single_frame = true;
        let mut current_frame_idx = 0usize;
        let mut next_due: Option<Instant> = None;
        let mut pts = Duration::ZERO;

        loop {
            match command_rx.try_recv() {
                Ok(DecoderCommand::Play) => {
                    if !is_playing {
                        is_playing = true;
                        next_due = Some(Instant::now());
                        let _ = event_tx.blocking_send(DecoderEvent::Buffering);
                    }
                }
                Ok(DecoderCommand::Pause) => {
                    is_playing = false;
                    next_due = None;
                }
                Ok(DecoderCommand::Stop) | Err(mpsc::error::TryRecvError::Disconnected) => break,
                Err(mpsc::error::TryRecvError::Empty) => {}
            }

            if !is_playing && !send_single_frame {
                std::thread::sleep(Duration::from_millis(10));
                continue;
            }

            // Sleep in short slices so Pause and Stop stay responsive
            if let Some(due) = next_due {
                let now = Instant::now();
                if due > now {
                    std::thread::sleep((due - now).min(Duration::from_millis(10)));
                    continue;
                }
            }

            let frame = &frames[current_frame_idx];
            let decoded = DecodedFrame {
                rgba_data: Arc::clone(&frame.rgba_data),
                width: frame.width,
                height: frame.height,
                pts_secs: pts.as_secs_f64(),
            };

            if event_tx
                .blocking_send(DecoderEvent::FrameReady(decoded))
                .is_err()
            {
                break;
            }
            send_single_frame = false;

            if is_playing {
                next_due = next_due.map(|due| due + frame.duration);
                current_frame_idx += 1;
                pts += frame.duration;
                if current_frame_idx >= frames.len() {
                    current_frame_idx = 0;
                    pts = Duration::ZERO;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image_rs::codecs::gif::GifEncoder;
    use image_rs::{Delay, Frame, Rgba, RgbaImage};
    use tempfile::tempdir;

    fn write_gif(path: &Path, delays_ms: &[u32]) {
        let file = File::create(path).expect("failed to create gif");
        let mut encoder = GifEncoder::new(file);
        let frames = delays_ms.iter().enumerate().map(|(i, &ms)| {
            #[allow(clippy::cast_possible_truncation)]
            let shade = (i * 60) as u8;
            let buffer = RgbaImage::from_pixel(4, 3, Rgba([shade, 0, 0, 255]));
            Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(ms, 1))
        });
        encoder
            .encode_frames(frames)
            .expect("failed to encode gif frames");
    }

    #[test]
    fn load_frames_reads_every_frame_with_delays() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let path = temp_dir.path().join("anim.gif");
        write_gif(&path, &[100, 200, 50]);

        let frames = load_frames(&path).expect("gif should decode");
        assert_eq!(frames.len(), 3);
        assert_eq!((frames[0].width, frames[0].height), (4, 3));
        assert_eq!(frames[0].rgba_data.len(), 4 * 3 * 4);
        assert_eq!(frames[1].duration, Duration::from_millis(200));
    }

    #[test]
    fn zero_delay_is_clamped_to_minimum() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let path = temp_dir.path().join("fast.gif");
        write_gif(&path, &[0, 0]);

        let frames = load_frames(&path).expect("gif should decode");
        assert!(frames
            .iter()
            .all(|f| f.duration >= Duration::from_millis(u64::from(MIN_FRAME_DURATION_MS))));
    }

    #[test]
    fn load_frames_rejects_non_gif() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let path = temp_dir.path().join("fake.gif");
        std::fs::write(&path, b"GIF? no").expect("write fake gif");

        assert!(load_frames(&path).is_err());
    }

    #[tokio::test]
    async fn decoder_sends_first_frame_before_play() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let path = temp_dir.path().join("anim.gif");
        write_gif(&path, &[100, 100]);

        let mut decoder = AnimationDecoder::new(&path).expect("decoder should spawn");
        let event = tokio::time::timeout(Duration::from_secs(5), decoder.recv_event())
            .await
            .expect("timeout waiting for first frame");

        match event {
            Some(DecoderEvent::FrameReady(frame)) => {
                assert_eq!((frame.width, frame.height), (4, 3));
                assert!(frame.pts_secs.abs() < f64::EPSILON);
            }
            other => panic!("expected first frame, got {other:?}"),
        }

        decoder
            .send_command(DecoderCommand::Stop)
            .expect("decoder still running");
    }

    #[tokio::test]
    async fn decoder_loops_while_playing() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let path = temp_dir.path().join("loop.gif");
        write_gif(&path, &[20, 20]);

        let mut decoder = AnimationDecoder::new(&path).expect("decoder should spawn");
        decoder
            .send_command(DecoderCommand::Play)
            .expect("decoder running");

        let mut frames_seen = 0;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while frames_seen < 5 && tokio::time::Instant::now() < deadline {
            if let Ok(Some(DecoderEvent::FrameReady(_))) =
                tokio::time::timeout(Duration::from_secs(1), decoder.recv_event()).await
            {
                frames_seen += 1;
            }
        }

        assert!(frames_seen >= 5, "animation should keep looping");
        let _ = decoder.send_command(DecoderCommand::Stop);
    }

    #[tokio::test]
    async fn decoder_for_missing_file_fails_fast() {
        assert!(AnimationDecoder::new("/nonexistent/anim.gif").is_err());
    }
}
