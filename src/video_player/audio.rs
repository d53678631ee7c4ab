// SPDX-License-Identifier: MPL-2.0
//! Audio extraction from video files.
//!
//! The audio track is decoded with FFmpeg and resampled to interleaved `f32`
//! at the output device's rate and channel count, then handed to
//! [`AudioOutput`](super::audio_output::AudioOutput) in small buffers.

use super::audio_output::AudioOutputConfig;
use super::transport::{EndAction, PlayAction, Transport};
use crate::error::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Audio is queued this far ahead of its presentation time.
const AUDIO_LOOKAHEAD_SECS: f64 = 0.2;

/// Represents a decoded audio buffer ready for playback.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved samples normalized to [-1.0, 1.0].
    pub samples: Arc<Vec<f32>>,
    pub sample_rate: u32,
    pub channels: u16,
    pub pts_secs: f64,
}

impl DecodedAudio {
    /// Returns the number of frames (samples per channel).
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Returns the buffer duration in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / f64::from(self.sample_rate)
    }
}

/// Commands sent to the audio decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioDecoderCommand {
    Play,
    Pause,
    /// Seek back to the start and wait for `Play`.
    Rewind,
    Stop,
}

/// Events sent from the audio decoder.
#[derive(Debug, Clone)]
pub enum AudioDecoderEvent {
    BufferReady(DecodedAudio),
    EndOfStream,
    Error(String),
}

/// Async audio decoder running on a blocking thread.
pub struct AudioDecoder {
    command_tx: mpsc::UnboundedSender<AudioDecoderCommand>,
    event_rx: mpsc::Receiver<AudioDecoderEvent>,
}

impl AudioDecoder {
    /// Creates an audio decoder for the given video file.
    ///
    /// Returns `None` if the file has no audio stream. With `looping` set the
    /// track restarts at its end, mirroring the video decoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened by FFmpeg.
    pub fn new<P: AsRef<Path>>(
        video_path: P,
        output_config: AudioOutputConfig,
        looping: bool,
    ) -> Result<Option<Self>> {
        let path = video_path.as_ref().to_path_buf();

        if !Self::has_audio_stream(&path)? {
            return Ok(None);
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(4);

        tokio::task::spawn_blocking(move || {
            if let Err(e) =
                Self::decoder_loop(&path, output_config, looping, command_rx, &event_tx)
            {
                tracing::warn!(path = %path.display(), "audio decoder failed: {e}");
                let _ = event_tx.blocking_send(AudioDecoderEvent::Error(e.to_string()));
            }
        });

        Ok(Some(Self {
            command_tx,
            event_rx,
        }))
    }

    fn has_audio_stream(path: &Path) -> Result<bool> {
        crate::media::video::init_ffmpeg()?;

        let ictx = ffmpeg_next::format::input(path)
            .map_err(|e| Error::Io(format!("Failed to open file: {e}")))?;

        Ok(ictx
            .streams()
            .best(ffmpeg_next::media::Type::Audio)
            .is_some())
    }

    /// Sends a command to the decoder task.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder task is not running.
    pub fn send_command(&self, command: AudioDecoderCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::Io("Audio decoder task is not running".into()))
    }

    /// Receives the next event from the decoder.
    pub async fn recv_event(&mut self) -> Option<AudioDecoderEvent> {
        self.event_rx.recv().await
    }

    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::too_many_lines)]
    fn decoder_loop(
        video_path: &Path,
        output_config: AudioOutputConfig,
        looping: bool,
        mut command_rx: mpsc::UnboundedReceiver<AudioDecoderCommand>,
        event_tx: &mpsc::Sender<AudioDecoderEvent>,
    ) -> Result<()> {
        crate::media::video::init_ffmpeg()?;

        let mut ictx = ffmpeg_next::format::input(video_path)
            .map_err(|e| Error::Io(format!("Failed to open video: {e}")))?;

        let input = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Audio)
            .ok_or_else(|| Error::Io("No audio stream found".to_string()))?;
        let audio_stream_index = input.index();

        let time_base = input.time_base();
        let time_base_f64 = f64::from(time_base.numerator()) / f64::from(time_base.denominator());

        let context_decoder =
            ffmpeg_next::codec::context::Context::from_parameters(input.parameters())
                .map_err(|e| Error::Io(format!("Failed to create codec context: {e}")))?;
        let mut decoder = context_decoder
            .decoder()
            .audio()
            .map_err(|e| Error::Io(format!("Failed to create audio decoder: {e}")))?;

        // Anything that is not mono is downmixed to stereo
        let output_channel_layout = match output_config.channels {
            1 => ffmpeg_next::ChannelLayout::MONO,
            _ => ffmpeg_next::ChannelLayout::STEREO,
        };
        let output_channels = if output_config.channels == 1 { 1 } else { 2 };

        let mut resampler = ffmpeg_next::software::resampling::Context::get(
            decoder.format(),
            decoder.channel_layout(),
            decoder.rate(),
            ffmpeg_next::format::Sample::F32(ffmpeg_next::format::sample::Type::Packed),
            output_channel_layout,
            output_config.sample_rate,
        )
        .map_err(|e| Error::Io(format!("Failed to create resampler: {e}")))?;

        let mut transport = Transport::default();
        let mut playback_start_time: Option<Instant> = None;
        let mut first_pts: Option<f64> = None;
        let mut frames_this_pass = 0usize;

        loop {
            match command_rx.try_recv() {
                Ok(AudioDecoderCommand::Play) => match transport.play() {
                    PlayAction::None => {}
                    action => {
                        if action == PlayAction::Rewind {
                            Self::rewind(&mut ictx, &mut decoder)?;
                            frames_this_pass = 0;
                        }
                        playback_start_time = Some(Instant::now());
                        first_pts = None;
                    }
                },
                Ok(AudioDecoderCommand::Pause) => {
                    transport.pause();
                    playback_start_time = None;
                    first_pts = None;
                }
                Ok(AudioDecoderCommand::Rewind) => {
                    Self::rewind(&mut ictx, &mut decoder)?;
                    transport = Transport::Paused;
                    frames_this_pass = 0;
                    playback_start_time = None;
                    first_pts = None;
                }
                Ok(AudioDecoderCommand::Stop) | Err(mpsc::error::TryRecvError::Disconnected) => {
                    break
                }
                Err(mpsc::error::TryRecvError::Empty) => {}
            }

            if !transport.is_playing() {
                std::thread::sleep(Duration::from_millis(10));
                continue;
            }

            let mut decoded_frame = ffmpeg_next::frame::Audio::empty();
            if !Self::next_frame(&mut ictx, &mut decoder, audio_stream_index, &mut decoded_frame)
            {
                match transport.exhausted(looping, frames_this_pass > 0) {
                    EndAction::Loop => {
                        Self::rewind(&mut ictx, &mut decoder)?;
                        frames_this_pass = 0;
                        playback_start_time = Some(Instant::now());
                        first_pts = None;
                    }
                    EndAction::Finish => {
                        let _ = event_tx.blocking_send(AudioDecoderEvent::EndOfStream);
                    }
                }
                continue;
            }
            frames_this_pass += 1;

            let mut output_audio = ffmpeg_next::frame::Audio::empty();
            if let Err(e) = resampler.run(&decoded_frame, &mut output_audio) {
                let _ = event_tx.blocking_send(AudioDecoderEvent::Error(format!(
                    "Resampling failed: {e}"
                )));
                continue;
            }

            let samples = Self::extract_samples(&output_audio, output_channels);
            let pts_secs = decoded_frame
                .timestamp()
                .map_or(0.0, |pts| pts as f64 * time_base_f64);

            // Pace decoding so the output buffer stays just ahead of playback
            if let Some(start_time) = playback_start_time {
                let first = *first_pts.get_or_insert(pts_secs);
                let frame_delay = pts_secs - first - AUDIO_LOOKAHEAD_SECS;
                if frame_delay > 0.0 {
                    let target_time = start_time + Duration::from_secs_f64(frame_delay);
                    let now = Instant::now();
                    if target_time > now {
                        std::thread::sleep(target_time - now);
                    }
                }
            }

            let audio = DecodedAudio {
                samples: Arc::new(samples),
                sample_rate: output_config.sample_rate,
                channels: output_channels,
                pts_secs,
            };

            if event_tx
                .blocking_send(AudioDecoderEvent::BufferReady(audio))
                .is_err()
            {
                break;
            }
        }

        Ok(())
    }

    fn rewind(
        ictx: &mut ffmpeg_next::format::context::Input,
        decoder: &mut ffmpeg_next::decoder::Audio,
    ) -> Result<()> {
        ictx.seek(0, ..0)
            .map_err(|e| Error::Io(format!("Failed to rewind audio: {e}")))?;
        decoder.flush();
        Ok(())
    }

    fn next_frame(
        ictx: &mut ffmpeg_next::format::context::Input,
        decoder: &mut ffmpeg_next::decoder::Audio,
        stream_index: usize,
        frame: &mut ffmpeg_next::frame::Audio,
    ) -> bool {
        loop {
            if decoder.receive_frame(frame).is_ok() {
                return true;
            }

            let Some((stream, packet)) = ictx.packets().next() else {
                let _ = decoder.send_eof();
                return decoder.receive_frame(frame).is_ok();
            };

            if stream.index() == stream_index {
                if let Err(e) = decoder.send_packet(&packet) {
                    tracing::debug!("skipping undecodable audio packet: {e}");
                }
            }
        }
    }

    /// Extracts f32 samples from a packed, resampled audio frame.
    fn extract_samples(frame: &ffmpeg_next::frame::Audio, channels: u16) -> Vec<f32> {
        let data = frame.data(0);
        let sample_count = frame.samples() * usize::from(channels);

        data.chunks_exact(4)
            .take(sample_count)
            .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .collect()
    }
}
