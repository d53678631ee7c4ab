// SPDX-License-Identifier: MPL-2.0
//! Play/pause state shared by the video and audio decoder loops.
//!
//! A stream that ran to its end is parked in [`Transport::Ended`]; the next
//! `Play` asks the decoder to rewind before resuming.

/// Transport state of one decoder loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Transport {
    /// Waiting for `Play`, position kept.
    #[default]
    Paused,
    Playing,
    /// Input exhausted on a non-looping stream.
    Ended,
}

/// What the decoder must do after a `Play` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayAction {
    /// Already playing.
    None,
    /// Continue from the current position.
    Resume,
    /// Seek back to the start, then continue.
    Rewind,
}

/// What the decoder must do once its input is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EndAction {
    /// Seek back to the start and keep playing.
    Loop,
    /// Report the end of stream and wait for `Play`.
    Finish,
}

impl Transport {
    pub(crate) fn is_playing(self) -> bool {
        self == Transport::Playing
    }

    pub(crate) fn play(&mut self) -> PlayAction {
        let action = match self {
            Transport::Playing => PlayAction::None,
            Transport::Paused => PlayAction::Resume,
            Transport::Ended => PlayAction::Rewind,
        };
        *self = Transport::Playing;
        action
    }

    /// Pausing an ended stream keeps it ended, so the next `Play` still rewinds.
    pub(crate) fn pause(&mut self) {
        if *self == Transport::Playing {
            *self = Transport::Paused;
        }
    }

    /// `produced_frames` is false when the stream yielded nothing since the
    /// last rewind, which stops an empty file from looping forever.
    pub(crate) fn exhausted(&mut self, looping: bool, produced_frames: bool) -> EndAction {
        if looping && self.is_playing() && produced_frames {
            EndAction::Loop
        } else {
            *self = Transport::Ended;
            EndAction::Finish
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_resumes_then_is_idempotent() {
        let mut transport = Transport::default();
        assert_eq!(transport.play(), PlayAction::Resume);
        assert!(transport.is_playing());
        assert_eq!(transport.play(), PlayAction::None);
    }

    #[test]
    fn play_after_end_rewinds() {
        let mut transport = Transport::Playing;
        assert_eq!(transport.exhausted(false, true), EndAction::Finish);
        assert_eq!(transport, Transport::Ended);

        assert_eq!(transport.play(), PlayAction::Rewind);
        assert!(transport.is_playing());
    }

    #[test]
    fn pause_keeps_an_ended_stream_ended() {
        let mut transport = Transport::Ended;
        transport.pause();
        assert_eq!(transport.play(), PlayAction::Rewind);

        transport.pause();
        assert_eq!(transport, Transport::Paused);
        assert_eq!(transport.play(), PlayAction::Resume);
    }

    #[test]
    fn looping_restarts_only_while_playing_with_frames() {
        let mut transport = Transport::Playing;
        assert_eq!(transport.exhausted(true, true), EndAction::Loop);
        assert!(transport.is_playing());

        assert_eq!(transport.exhausted(true, false), EndAction::Finish);
        assert_eq!(transport, Transport::Ended);

        let mut paused = Transport::Paused;
        assert_eq!(paused.exhausted(true, true), EndAction::Finish);
    }
}
