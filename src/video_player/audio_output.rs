// SPDX-License-Identifier: MPL-2.0
//! Audio output through the default cpal device.
//!
//! The cpal stream lives on a dedicated thread; the rest of the player talks
//! to it through shared atomics and a bounded sample buffer.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// Interleaved f32 samples normalized to [-1.0, 1.0].
pub type AudioSamples = Arc<Vec<f32>>;

/// Sample rate and channel count of the output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioOutputConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

/// State shared between the audio callback and the player.
struct SharedState {
    volume_bits: AtomicU32,
    muted: AtomicBool,
    paused: AtomicBool,
    shutdown: AtomicBool,
    buffer: Mutex<Vec<f32>>,
    max_buffer_len: usize,
}

impl SharedState {
    fn new(initial_volume: f32, muted: bool, max_buffer_len: usize) -> Self {
        Self {
            volume_bits: AtomicU32::new(initial_volume.to_bits()),
            muted: AtomicBool::new(muted),
            paused: AtomicBool::new(true),
            shutdown: AtomicBool::new(false),
            buffer: Mutex::new(Vec::with_capacity(max_buffer_len)),
            max_buffer_len,
        }
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    fn set_volume(&self, volume: f32) {
        self.volume_bits.store(volume.to_bits(), Ordering::Relaxed);
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    /// Appends samples, dropping whatever does not fit.
    fn push_samples(&self, samples: &[f32]) {
        if let Ok(mut buf) = self.buffer.lock() {
            let available = self.max_buffer_len.saturating_sub(buf.len());
            let take = available.min(samples.len());
            buf.extend_from_slice(&samples[..take]);
        }
    }

    fn clear(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }

    /// Fills `out` from the buffer with volume applied, silence past the end.
    fn fill<T: cpal::SizedSample + cpal::FromSample<f32>>(&self, out: &mut [T]) {
        let silence = T::from_sample(0.0f32);
        if self.is_muted() || self.is_paused() {
            out.fill(silence);
            return;
        }

        let Ok(mut buf) = self.buffer.lock() else {
            out.fill(silence);
            return;
        };

        let gain = perceptual_gain(self.volume());
        let consumed = out.len().min(buf.len());
        for (dst, src) in out.iter_mut().zip(buf.iter()) {
            // Just under 1.0: i16 conversion overflows at exactly 1.0
            *dst = T::from_sample((src * gain).clamp(-1.0, 0.999_999_9));
        }
        out[consumed..].fill(silence);
        buf.drain(..consumed);
    }
}

/// Quadratic volume curve so the 0..1 setting feels linear to the ear.
#[must_use]
pub fn perceptual_gain(volume: f32) -> f32 {
    let volume = volume.clamp(0.0, 1.0);
    volume * volume
}

/// Audio output stream manager.
///
/// Starts paused; call [`AudioOutput::resume`] once playback begins.
pub struct AudioOutput {
    shared: Arc<SharedState>,
    config: AudioOutputConfig,
    stream_thread: Option<thread::JoinHandle<()>>,
}

impl AudioOutput {
    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns an error if no output device is available or the stream cannot
    /// be built or started.
    pub fn new(initial_volume: f32, muted: bool) -> Result<Self> {
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(AudioOutputConfig, Arc<SharedState>)>>();

        let stream_thread = thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || {
                let opened = Self::open_stream(initial_volume, muted);
                let (stream, config, shared) = match opened {
                    Ok(parts) => parts,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok((config, Arc::clone(&shared))));

                // cpal streams are not Send; keep this one alive on its own thread
                while !shared.shutdown.load(Ordering::Relaxed) {
                    thread::park_timeout(Duration::from_millis(100));
                }
                drop(stream);
            })
            .map_err(|e| Error::Io(format!("Failed to spawn audio thread: {e}")))?;

        let (config, shared) = ready_rx
            .recv()
            .map_err(|_| Error::Io("Audio thread exited during startup".to_string()))??;

        Ok(Self {
            shared,
            config,
            stream_thread: Some(stream_thread),
        })
    }

    fn open_stream(
        initial_volume: f32,
        muted: bool,
    ) -> Result<(cpal::Stream, AudioOutputConfig, Arc<SharedState>)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Io("No audio output device found".to_string()))?;

        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::Io(format!("Failed to get audio config: {e}")))?;
        let sample_format = supported_config.sample_format();
        let stream_config: cpal::StreamConfig = supported_config.config();

        let config = AudioOutputConfig {
            sample_rate: stream_config.sample_rate,
            channels: stream_config.channels,
        };

        // Half a second of audio at the device format
        let max_buffer_len = (config.sample_rate as usize) * usize::from(config.channels) / 2;
        let shared = Arc::new(SharedState::new(initial_volume, muted, max_buffer_len));

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &stream_config, Arc::clone(&shared))?
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &stream_config, Arc::clone(&shared))?
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &stream_config, Arc::clone(&shared))?
            }
            other => {
                return Err(Error::Io(format!(
                    "Unsupported audio sample format: {other:?}"
                )))
            }
        };

        stream
            .play()
            .map_err(|e| Error::Io(format!("Failed to start audio stream: {e}")))?;

        tracing::debug!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            "audio output opened"
        );

        Ok((stream, config, shared))
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        shared: Arc<SharedState>,
    ) -> Result<cpal::Stream> {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| shared.fill(data),
                |err| tracing::warn!("audio output error: {err}"),
                None,
            )
            .map_err(|e| Error::Io(format!("Failed to build audio stream: {e}")))
    }

    /// Queues samples for playback.
    pub fn play(&self, samples: &AudioSamples) {
        self.shared.push_samples(samples);
    }

    pub fn pause(&self) {
        self.shared.set_paused(true);
    }

    pub fn resume(&self) {
        self.shared.set_paused(false);
    }

    /// Pauses and discards queued samples.
    pub fn stop(&self) {
        self.shared.set_paused(true);
        self.shared.clear();
    }

    pub fn set_volume(&self, volume: f32) {
        self.shared.set_volume(volume.clamp(0.0, 1.0));
    }

    pub fn set_muted(&self, muted: bool) {
        self.shared.set_muted(muted);
    }

    #[must_use]
    pub fn config(&self) -> AudioOutputConfig {
        self.config
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.stream_thread.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}
