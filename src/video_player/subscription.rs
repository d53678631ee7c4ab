// SPDX-License-Identifier: MPL-2.0
//! Iced subscription driving one playback session.
//!
//! The subscription owns the decoders for the file being previewed and turns
//! their events into [`PlaybackMessage`]s. Its identity is the session id, so
//! bumping the id drops the previous stream together with its decoders.

use super::animation_decoder::AnimationDecoder;
use super::audio::{AudioDecoder, AudioDecoderCommand, AudioDecoderEvent};
use super::audio_output::AudioOutput;
use super::decoder::{AsyncDecoder, DecoderCommand, DecoderEvent};
use iced::futures::{SinkExt, Stream};
use iced::stream;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Which decoder a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackSource {
    /// FFmpeg video with optional audio track.
    Video,
    /// Animated image, always looping and silent.
    Animation,
}

/// Playback preferences applied when a session starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    pub autoplay: bool,
    pub looping: bool,
    pub volume: f32,
    pub muted: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            autoplay: true,
            looping: false,
            volume: crate::app::config::DEFAULT_VOLUME,
            muted: false,
        }
    }
}

/// One playback session: a file, its decoder kind and the start options.
///
/// Only `id` takes part in hashing, so the subscription is rebuilt exactly
/// when a new session id is issued.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub id: u64,
    pub path: PathBuf,
    pub source: PlaybackSource,
    pub options: PlaybackOptions,
}

impl Hash for PlaybackSession {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Cloneable handle for sending play/pause/stop to a running session.
#[derive(Clone)]
pub struct DecoderCommandSender {
    tx: mpsc::UnboundedSender<DecoderCommand>,
}

impl DecoderCommandSender {
    pub(crate) fn from_channel(tx: mpsc::UnboundedSender<DecoderCommand>) -> Self {
        Self { tx }
    }

    /// Sends a command to the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has ended.
    pub fn send(&self, command: DecoderCommand) -> Result<(), String> {
        self.tx
            .send(command)
            .map_err(|_| "Playback session not running".to_string())
    }
}

impl std::fmt::Debug for DecoderCommandSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderCommandSender")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Messages emitted by the playback subscription.
#[derive(Debug, Clone)]
pub enum PlaybackMessage {
    /// Session started; the sender controls playback. `playing` tells whether
    /// autoplay kicked in.
    Started {
        session_id: u64,
        sender: DecoderCommandSender,
        playing: bool,
    },

    /// A new frame is ready for display.
    FrameReady {
        session_id: u64,
        rgba_data: Arc<Vec<u8>>,
        width: u32,
        height: u32,
        pts_secs: f64,
    },

    /// Playback reached the end of a non-looping video.
    EndOfStream { session_id: u64 },

    /// The decoder failed.
    Error { session_id: u64, message: String },
}

impl PlaybackMessage {
    /// Session the message belongs to.
    #[must_use]
    pub fn session_id(&self) -> u64 {
        match self {
            PlaybackMessage::Started { session_id, .. }
            | PlaybackMessage::FrameReady { session_id, .. }
            | PlaybackMessage::EndOfStream { session_id }
            | PlaybackMessage::Error { session_id, .. } => *session_id,
        }
    }
}

/// Video decoders behind one interface.
enum VideoDecoderKind {
    Ffmpeg(AsyncDecoder),
    Animation(AnimationDecoder),
}

impl VideoDecoderKind {
    fn send_command(&self, command: DecoderCommand) -> crate::error::Result<()> {
        match self {
            VideoDecoderKind::Ffmpeg(dec) => dec.send_command(command),
            VideoDecoderKind::Animation(dec) => dec.send_command(command),
        }
    }

    async fn recv_event(&mut self) -> Option<DecoderEvent> {
        match self {
            VideoDecoderKind::Ffmpeg(dec) => dec.recv_event().await,
            VideoDecoderKind::Animation(dec) => dec.recv_event().await,
        }
    }
}

/// Audio decoder paired with the device it plays on.
struct AudioPipeline {
    decoder: AudioDecoder,
    output: AudioOutput,
}

impl AudioPipeline {
    /// Opens the device and the audio track. `None` when either is missing.
    fn open(session: &PlaybackSession) -> Option<Self> {
        if session.source != PlaybackSource::Video {
            return None;
        }

        let output = match AudioOutput::new(session.options.volume, session.options.muted) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("audio output unavailable: {e}");
                return None;
            }
        };

        match AudioDecoder::new(&session.path, output.config(), session.options.looping) {
            Ok(Some(decoder)) => Some(Self { decoder, output }),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(path = %session.path.display(), "audio decoder failed: {e}");
                None
            }
        }
    }

    fn apply(&self, command: DecoderCommand) {
        let audio_command = match command {
            DecoderCommand::Play => {
                self.output.resume();
                AudioDecoderCommand::Play
            }
            DecoderCommand::Pause => {
                self.output.pause();
                AudioDecoderCommand::Pause
            }
            DecoderCommand::Stop => {
                self.output.stop();
                AudioDecoderCommand::Stop
            }
        };
        let _ = self.decoder.send_command(audio_command);
    }

    /// The video finished: drop queued samples and rewind so the next `Play`
    /// restarts both tracks together.
    fn rewind(&self) {
        self.output.stop();
        let _ = self.decoder.send_command(AudioDecoderCommand::Rewind);
    }
}

/// Creates the playback subscription for `session`.
pub fn video_playback(session: PlaybackSession) -> iced::Subscription<PlaybackMessage> {
    iced::Subscription::run_with(session, playback_stream)
}

fn playback_stream(session: &PlaybackSession) -> impl Stream<Item = PlaybackMessage> {
    let session = session.clone();

    stream::channel(100, move |mut output| async move {
        let session_id = session.id;

        let video_decoder = match session.source {
            PlaybackSource::Video => {
                AsyncDecoder::new(&session.path, session.options.looping)
                    .map(VideoDecoderKind::Ffmpeg)
            }
            PlaybackSource::Animation => {
                AnimationDecoder::new(&session.path).map(VideoDecoderKind::Animation)
            }
        };

        let mut video_decoder = match video_decoder {
            Ok(decoder) => decoder,
            Err(e) => {
                let _ = output
                    .send(PlaybackMessage::Error {
                        session_id,
                        message: e.to_string(),
                    })
                    .await;
                std::future::pending::<()>().await;
                return;
            }
        };

        // Probing the audio track opens the file with FFmpeg
        let mut audio = {
            let session = session.clone();
            match tokio::task::spawn_blocking(move || AudioPipeline::open(&session)).await {
                Ok(pipeline) => pipeline,
                Err(e) => {
                    tracing::warn!("audio setup task failed: {e}");
                    None
                }
            }
        };

        let (external_cmd_tx, mut external_cmd_rx) = mpsc::unbounded_channel();
        // Animations always play; videos follow the autoplay preference
        let playing = session.source == PlaybackSource::Animation || session.options.autoplay;

        let _ = output
            .send(PlaybackMessage::Started {
                session_id,
                sender: DecoderCommandSender::from_channel(external_cmd_tx.clone()),
                playing,
            })
            .await;

        if playing {
            let _ = external_cmd_tx.send(DecoderCommand::Play);
        }

        tracing::debug!(
            session_id,
            path = %session.path.display(),
            has_audio = audio.is_some(),
            "playback session started"
        );

        loop {
            tokio::select! {
                cmd = external_cmd_rx.recv() => {
                    let Some(command) = cmd else { break };
                    if let Some(ref pipeline) = audio {
                        pipeline.apply(command);
                    }
                    if video_decoder.send_command(command).is_err() || command == DecoderCommand::Stop {
                        break;
                    }
                }

                event = video_decoder.recv_event() => {
                    let Some(event) = event else { break };
                    let message = match event {
                        DecoderEvent::FrameReady(frame) => PlaybackMessage::FrameReady {
                            session_id,
                            rgba_data: frame.rgba_data,
                            width: frame.width,
                            height: frame.height,
                            pts_secs: frame.pts_secs,
                        },
                        DecoderEvent::Buffering => continue,
                        DecoderEvent::EndOfStream => {
                            if let Some(ref pipeline) = audio {
                                pipeline.rewind();
                            }
                            PlaybackMessage::EndOfStream { session_id }
                        }
                        DecoderEvent::Error(message) => PlaybackMessage::Error { session_id, message },
                    };

                    if output.send(message).await.is_err() {
                        break;
                    }
                }

                Some(audio_event) = async {
                    match audio {
                        Some(ref mut pipeline) => pipeline.decoder.recv_event().await,
                        None => std::future::pending::<Option<AudioDecoderEvent>>().await,
                    }
                } => {
                    match audio_event {
                        AudioDecoderEvent::BufferReady(buffer) => {
                            if let Some(ref pipeline) = audio {
                                pipeline.output.play(&buffer.samples);
                            }
                        }
                        AudioDecoderEvent::EndOfStream => {}
                        AudioDecoderEvent::Error(msg) => {
                            tracing::warn!("audio error: {msg}");
                            audio = None;
                        }
                    }
                }
            }
        }

        if let Some(pipeline) = audio.take() {
            pipeline.apply(DecoderCommand::Stop);
        }
        tracing::debug!(session_id, "playback session ended");

        // Keep the subscription alive but idle until iced drops it
        std::future::pending::<()>().await;
    })
}
