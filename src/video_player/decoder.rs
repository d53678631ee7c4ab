// SPDX-License-Identifier: MPL-2.0
//! Async video frame decoder using FFmpeg.
//!
//! Decoding happens on a blocking thread; frames are delivered through a
//! bounded channel so a slow UI applies backpressure to the decoder.

use super::transport::{EndAction, PlayAction, Transport};
use crate::error::{Error, Result, VideoError};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Represents a decoded video frame ready for display.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// RGBA pixel data (width × height × 4 bytes).
    pub rgba_data: Arc<Vec<u8>>,

    pub width: u32,
    pub height: u32,

    /// Presentation timestamp in seconds.
    pub pts_secs: f64,
}

/// Commands sent to a decoder task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderCommand {
    /// Start or resume playback from the current position.
    Play,

    /// Stop sending frames, keeping the position.
    Pause,

    /// Stop decoding and release resources.
    Stop,
}

/// Events sent from a decoder to the UI.
#[derive(Debug, Clone)]
pub enum DecoderEvent {
    /// A new frame is ready for display.
    FrameReady(DecodedFrame),

    /// Playback (re)started and the next frame is on its way.
    Buffering,

    /// Playback reached the end and is not looping.
    EndOfStream,

    /// An error occurred during decoding.
    Error(String),
}

/// Async video decoder that runs in a Tokio blocking task.
pub struct AsyncDecoder {
    command_tx: mpsc::UnboundedSender<DecoderCommand>,

    /// Bounded so decoded frames never pile up in memory.
    event_rx: mpsc::Receiver<DecoderEvent>,
}

impl AsyncDecoder {
    /// Creates a decoder for `video_path`.
    ///
    /// The first frame is decoded and sent right away, then the decoder waits
    /// for [`DecoderCommand::Play`]. With `looping` set the video restarts
    /// from the beginning instead of reporting the end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist.
    pub fn new<P: AsRef<Path>>(video_path: P, looping: bool) -> Result<Self> {
        let path = video_path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(Error::Io(format!(
                "Video file not found: {}",
                path.display()
            )));
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(2);

        // FFmpeg contexts are not Send, so the whole loop lives on one thread
        tokio::task::spawn_blocking(move || {
            if let Err(e) = Self::decoder_loop_blocking(&path, looping, command_rx, &event_tx) {
                tracing::warn!(path = %path.display(), "video decoder failed: {e}");
                let _ = event_tx.blocking_send(DecoderEvent::Error(e.to_string()));
            }
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
            .map_err(|_| Error::Io("Decoder task is not running".into()))
    }

    /// Receives the next event from the decoder.
    ///
    /// Returns `None` once the decoder task has terminated.
    pub async fn recv_event(&mut self) -> Option<DecoderEvent> {
        self.event_rx.recv().await
    }

    #[allow(clippy::too_many_lines)]
    #[allow(clippy::cast_precision_loss)]
    fn decoder_loop_blocking(
        video_path: &Path,
        looping: bool,
        mut command_rx: mpsc::UnboundedReceiver<DecoderCommand>,
        event_tx: &mpsc::Sender<DecoderEvent>,
    ) -> Result<()> {
        crate::media::video::init_ffmpeg()?;

        let mut ictx = ffmpeg_next::format::input(video_path)
            .map_err(|e| VideoError::from_message(&format!("Failed to open video: {e}")))?;

        let input = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or(VideoError::NoVideoStream)?;
        let video_stream_index = input.index();

        let time_base = input.time_base();
        let time_base_f64 = f64::from(time_base.numerator()) / f64::from(time_base.denominator());

        let context_decoder =
            ffmpeg_next::codec::context::Context::from_parameters(input.parameters())
                .map_err(|e| VideoError::from_message(&format!("Failed to create codec context: {e}")))?;
        let mut decoder = context_decoder
            .decoder()
            .video()
            .map_err(|e| VideoError::from_message(&format!("Failed to create video decoder: {e}")))?;

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(VideoError::CorruptedFile.into());
        }

        let mut scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGBA,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| VideoError::DecodingFailed(format!("Failed to create scaler: {e}")))?;

        let mut transport = Transport::default();
        // Show the first frame even before playback starts
        let mut decode_single_frame = true;
        let mut playback_start_time: Option<Instant> = None;
        let mut first_pts: Option<f64> = None;
        let mut frames_this_pass = 0usize;

        loop {
            match command_rx.try_recv() {
                Ok(DecoderCommand::Play) => match transport.play() {
                    PlayAction::None => {}
                    action => {
                        if action == PlayAction::Rewind {
                            Self::rewind(&mut ictx, &mut decoder)?;
                            frames_this_pass = 0;
                        }
                        playback_start_time = Some(Instant::now());
                        first_pts = None;
                        let _ = event_tx.blocking_send(DecoderEvent::Buffering);
                    }
                },
                Ok(DecoderCommand::Pause) => {
                    transport.pause();
                    playback_start_time = None;
                    first_pts = None;
                }
                Ok(DecoderCommand::Stop) | Err(mpsc::error::TryRecvError::Disconnected) => break,
                Err(mpsc::error::TryRecvError::Empty) => {}
            }

            if !transport.is_playing() && !decode_single_frame {
                std::thread::sleep(Duration::from_millis(10));
                continue;
            }

            let mut decoded_frame = ffmpeg_next::frame::Video::empty();
            if !Self::next_frame(&mut ictx, &mut decoder, video_stream_index, &mut decoded_frame)
            {
                match transport.exhausted(looping, frames_this_pass > 0) {
                    EndAction::Loop => {
                        Self::rewind(&mut ictx, &mut decoder)?;
                        frames_this_pass = 0;
                        playback_start_time = Some(Instant::now());
                        first_pts = None;
                    }
                    EndAction::Finish => {
                        let _ = event_tx.blocking_send(DecoderEvent::EndOfStream);
                        playback_start_time = None;
                        first_pts = None;
                        decode_single_frame = false;
                    }
                }
                continue;
            }
            frames_this_pass += 1;

            let mut rgb_frame = ffmpeg_next::frame::Video::empty();
            if let Err(e) = scaler.run(&decoded_frame, &mut rgb_frame) {
                let _ = event_tx.blocking_send(DecoderEvent::Error(format!("Scaling failed: {e}")));
                break;
            }

            let rgba_data = Self::extract_rgba_data(&rgb_frame);
            let pts_secs = decoded_frame
                .timestamp()
                .map_or(0.0, |pts| pts as f64 * time_base_f64);

            // Frame pacing: wait until the frame is due
            if let Some(start_time) = playback_start_time {
                let first = *first_pts.get_or_insert(pts_secs);
                let frame_delay = (pts_secs - first).max(0.0);
                let target_time = start_time + Duration::from_secs_f64(frame_delay);
                let now = Instant::now();
                if target_time > now {
                    std::thread::sleep(target_time - now);
                }
            }

            let decoded = DecodedFrame {
                rgba_data: Arc::new(rgba_data),
                width,
                height,
                pts_secs,
            };

            if event_tx
                .blocking_send(DecoderEvent::FrameReady(decoded))
                .is_err()
            {
                break;
            }

            decode_single_frame = false;
        }

        Ok(())
    }

    fn rewind(
        ictx: &mut ffmpeg_next::format::context::Input,
        decoder: &mut ffmpeg_next::decoder::Video,
    ) -> Result<()> {
        ictx.seek(0, ..0)
            .map_err(|e| VideoError::DecodingFailed(format!("Failed to rewind: {e}")))?;
        decoder.flush();
        Ok(())
    }

    /// Pulls packets until the decoder produces a frame.
    ///
    /// Returns false once the stream is exhausted and fully drained.
    fn next_frame(
        ictx: &mut ffmpeg_next::format::context::Input,
        decoder: &mut ffmpeg_next::decoder::Video,
        stream_index: usize,
        frame: &mut ffmpeg_next::frame::Video,
    ) -> bool {
        loop {
            if decoder.receive_frame(frame).is_ok() {
                return true;
            }

            let Some((stream, packet)) = ictx.packets().next() else {
                let _ = decoder.send_eof();
                return decoder.receive_frame(frame).is_ok();
            };

            if stream.index() != stream_index {
                continue;
            }

            if let Err(e) = decoder.send_packet(&packet) {
                tracing::debug!("skipping undecodable packet: {e}");
            }
        }
    }

    /// Extracts RGBA data from a decoded frame, handling stride correctly.
    fn extract_rgba_data(frame: &ffmpeg_next::frame::Video) -> Vec<u8> {
        let width = frame.width() as usize;
        let height = frame.height() as usize;
        let data = frame.data(0);
        let stride = frame.stride(0);
        let row_len = width * 4;

        let mut rgba_bytes = Vec::with_capacity(row_len * height);
        for y in 0..height {
            let row_start = y * stride;
            rgba_bytes.extend_from_slice(&data[row_start..row_start + row_len]);
        }

        rgba_bytes
    }
}
