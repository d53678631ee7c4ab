// SPDX-License-Identifier: MPL-2.0
//! Playback engine for videos and animated images.
//!
//! Videos are decoded with FFmpeg, GIF animations with the `image` crate.
//! Both run on blocking threads and deliver frames to the UI through the
//! [`video_playback`] subscription.

pub mod animation_decoder;
pub mod audio;
pub mod audio_output;
mod decoder;
pub mod subscription;
mod transport;

pub use animation_decoder::AnimationDecoder;
pub use decoder::{AsyncDecoder, DecodedFrame, DecoderCommand, DecoderEvent};
pub use subscription::{
    video_playback, DecoderCommandSender, PlaybackMessage, PlaybackOptions, PlaybackSession,
    PlaybackSource,
};
