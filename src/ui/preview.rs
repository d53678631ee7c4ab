// SPDX-License-Identifier: MPL-2.0
//! Preview pane: dispatches a media path to the matching viewer.
//!
//! Still images are decoded on the blocking pool. GIF animations and videos
//! run through the playback subscription, one session at a time; showing
//! anything else releases the previous session first.

use crate::error::{Error, VideoError};
use crate::i18n::fluent::I18n;
use crate::media::video::{self, VideoMetadata};
use crate::media::{self, ExtensionSet, ImageData, MediaKind};
use crate::ui::design_tokens::{spacing, typography};
use crate::ui::styles;
use crate::ui::theming::ColorScheme;
use crate::video_player::{
    video_playback, DecoderCommand, DecoderCommandSender, PlaybackMessage, PlaybackOptions,
    PlaybackSession, PlaybackSource,
};
use iced::widget::{center, column, container, image, text};
use iced::{alignment, ContentFit, Element, Length, Subscription, Task};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Why the placeholder is showing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaceholderReason {
    /// Nothing selected yet, or the selection has no media.
    #[default]
    Idle,
    /// A folder scan is running.
    Scanning,
    /// The file could not be previewed. `key` names the i18n message.
    Error { file_name: String, key: &'static str },
}

/// What the preview pane shows.
#[derive(Debug, Clone)]
pub enum PreviewTarget {
    Placeholder(PlaceholderReason),
    /// Still image; `data` is `None` while decoding.
    Image {
        path: PathBuf,
        data: Option<ImageData>,
    },
    Animated {
        path: PathBuf,
    },
    Video {
        path: PathBuf,
    },
}

impl Default for PreviewTarget {
    fn default() -> Self {
        PreviewTarget::Placeholder(PlaceholderReason::Idle)
    }
}

impl PreviewTarget {
    /// File being previewed, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            PreviewTarget::Placeholder(_) => None,
            PreviewTarget::Image { path, .. }
            | PreviewTarget::Animated { path }
            | PreviewTarget::Video { path } => Some(path),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    ImageLoaded {
        request: u64,
        result: Result<ImageData, Error>,
    },
    VideoProbed {
        session_id: u64,
        result: Result<VideoMetadata, Error>,
    },
    Playback(PlaybackMessage),
}

/// Last decoded frame of the running session.
#[derive(Debug, Clone)]
struct Frame {
    handle: image::Handle,
    width: u32,
    height: u32,
}

pub struct State {
    target: PreviewTarget,
    extensions: ExtensionSet,
    video_options: PlaybackOptions,
    /// Counter shared by image requests and playback sessions.
    next_id: u64,
    image_request: u64,
    image_task: Option<iced::task::Handle>,
    session: Option<PlaybackSession>,
    sender: Option<DecoderCommandSender>,
    playing: bool,
    frame: Option<Frame>,
    metadata: Option<VideoMetadata>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("target", &self.target)
            .field("session", &self.session)
            .field("playing", &self.playing)
            .field("image_pending", &self.image_task.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new(ExtensionSet::default(), PlaybackOptions::default())
    }
}

impl State {
    #[must_use]
    pub fn new(extensions: ExtensionSet, video_options: PlaybackOptions) -> Self {
        Self {
            target: PreviewTarget::default(),
            extensions,
            video_options,
            next_id: 0,
            image_request: 0,
            image_task: None,
            session: None,
            sender: None,
            playing: false,
            frame: None,
            metadata: None,
        }
    }

    #[must_use]
    pub fn target(&self) -> &PreviewTarget {
        &self.target
    }

    /// Id of the running playback session.
    #[must_use]
    pub fn session_id(&self) -> Option<u64> {
        self.session.as_ref().map(|session| session.id)
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[must_use]
    pub fn is_video(&self) -> bool {
        matches!(self.target, PreviewTarget::Video { .. })
    }

    fn next_id(&mut self) -> u64 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }

    /// Releases the current viewer and opens the one matching `path`.
    ///
    /// Unknown extensions fall back to the idle placeholder.
    pub fn show(&mut self, path: &Path) -> Task<Message> {
        self.release();
        let kind = self.extensions.kind_of(path);
        tracing::debug!(path = %path.display(), ?kind, "preview dispatch");

        match kind {
            Some(MediaKind::Image) => self.open_image(path.to_path_buf()),
            Some(MediaKind::AnimatedImage) => {
                self.start_session(path, PlaybackSource::Animation);
                self.target = PreviewTarget::Animated {
                    path: path.to_path_buf(),
                };
                Task::none()
            }
            Some(MediaKind::Video) => {
                let session_id = self.start_session(path, PlaybackSource::Video);
                self.target = PreviewTarget::Video {
                    path: path.to_path_buf(),
                };
                probe_video(path.to_path_buf(), session_id)
            }
            None => {
                self.target = PreviewTarget::Placeholder(PlaceholderReason::Idle);
                Task::none()
            }
        }
    }

    /// Releases the current viewer and shows the placeholder.
    pub fn show_placeholder(&mut self, reason: PlaceholderReason) {
        self.release();
        self.target = PreviewTarget::Placeholder(reason);
    }

    /// Stops playback and drops any pending image decode.
    ///
    /// Clearing the session removes it from the subscription, which drops the
    /// decoder threads and the audio device.
    pub fn release(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(DecoderCommand::Stop);
        }
        if let Some(session) = self.session.take() {
            tracing::debug!(session_id = session.id, "playback session released");
        }
        self.image_task = None;
        self.playing = false;
        self.frame = None;
        self.metadata = None;
    }

    /// Toggles play/pause for videos. Returns false when nothing toggled.
    pub fn toggle_playback(&mut self) -> bool {
        if !self.is_video() {
            return false;
        }
        let Some(sender) = &self.sender else {
            return false;
        };

        let command = if self.playing {
            DecoderCommand::Pause
        } else {
            DecoderCommand::Play
        };
        match sender.send(command) {
            Ok(()) => {
                self.playing = !self.playing;
                true
            }
            Err(e) => {
                tracing::debug!("play/pause ignored: {e}");
                false
            }
        }
    }

    fn open_image(&mut self, path: PathBuf) -> Task<Message> {
        let request = self.next_id();
        self.image_request = request;
        self.target = PreviewTarget::Image {
            path: path.clone(),
            data: None,
        };

        let (task, handle) = Task::perform(
            async move {
                match tokio::task::spawn_blocking(move || media::load_image(&path)).await {
                    Ok(result) => result,
                    Err(e) => Err(Error::Io(format!("image decode task failed: {e}"))),
                }
            },
            move |result| Message::ImageLoaded { request, result },
        )
        .abortable();
        self.image_task = Some(handle.abort_on_drop());
        task
    }

    fn start_session(&mut self, path: &Path, source: PlaybackSource) -> u64 {
        let id = self.next_id();
        let options = match source {
            PlaybackSource::Video => self.video_options,
            PlaybackSource::Animation => PlaybackOptions {
                autoplay: true,
                looping: true,
                muted: true,
                ..self.video_options
            },
        };
        self.session = Some(PlaybackSession {
            id,
            path: path.to_path_buf(),
            source,
            options,
        });
        id
    }

    fn fail(&mut self, key: &'static str) {
        let file_name = self
            .target
            .path()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.show_placeholder(PlaceholderReason::Error { file_name, key });
    }

    pub fn handle_message(&mut self, message: Message) {
        match message {
            Message::ImageLoaded { request, result } => {
                if request != self.image_request
                    || !matches!(self.target, PreviewTarget::Image { data: None, .. })
                {
                    return;
                }
                self.image_task = None;
                match result {
                    Ok(loaded) => {
                        if let PreviewTarget::Image { data, .. } = &mut self.target {
                            *data = Some(loaded);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(path = ?self.target.path(), "image preview failed: {e}");
                        self.fail("error-image-load");
                    }
                }
            }
            Message::VideoProbed { session_id, result } => {
                if self.session_id() != Some(session_id) {
                    return;
                }
                match result {
                    Ok(metadata) => self.metadata = Some(metadata),
                    Err(e) => tracing::debug!("video probe failed: {e}"),
                }
            }
            Message::Playback(playback) => self.handle_playback(playback),
        }
    }

    fn handle_playback(&mut self, message: PlaybackMessage) {
        if self.session_id() != Some(message.session_id()) {
            return;
        }

        match message {
            PlaybackMessage::Started {
                sender, playing, ..
            } => {
                self.sender = Some(sender);
                self.playing = playing;
            }
            PlaybackMessage::FrameReady {
                rgba_data,
                width,
                height,
                ..
            } => {
                let pixels = Arc::try_unwrap(rgba_data).unwrap_or_else(|shared| (*shared).clone());
                self.frame = Some(Frame {
                    handle: image::Handle::from_rgba(width, height, pixels),
                    width,
                    height,
                });
            }
            PlaybackMessage::EndOfStream { .. } => {
                self.playing = false;
            }
            PlaybackMessage::Error { message, .. } => {
                tracing::warn!(path = ?self.target.path(), "playback failed: {message}");
                self.fail(VideoError::from_message(&message).i18n_key());
            }
        }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        match &self.session {
            Some(session) => video_playback(session.clone()).map(Message::Playback),
            None => Subscription::none(),
        }
    }

    pub fn view<'a>(&'a self, i18n: &I18n) -> Element<'a, Message> {
        let content: Element<'a, Message> = match &self.target {
            PreviewTarget::Placeholder(reason) => placeholder(reason, i18n),
            PreviewTarget::Image { data: None, .. } => status_text(i18n.tr("preview-loading")),
            PreviewTarget::Image {
                data: Some(data), ..
            } => with_caption(
                media_image(data.handle.clone()),
                format!("{} × {}", data.width, data.height),
            ),
            PreviewTarget::Animated { .. } => match &self.frame {
                Some(frame) => media_image(frame.handle.clone()),
                None => status_text(i18n.tr("preview-loading")),
            },
            PreviewTarget::Video { .. } => match &self.frame {
                Some(frame) => with_caption(
                    media_image(frame.handle.clone()),
                    self.video_caption(frame, i18n),
                ),
                None => status_text(i18n.tr("preview-loading")),
            },
        };

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .style(styles::container::preview)
            .into()
    }

    fn video_caption(&self, frame: &Frame, i18n: &I18n) -> String {
        let state = if self.playing {
            i18n.tr("video-playing")
        } else {
            i18n.tr("video-paused")
        };
        let mut parts = vec![state];
        if let Some(metadata) = &self.metadata {
            if metadata.duration_secs > 0.0 {
                parts.push(metadata.duration_label());
            }
        }
        parts.push(format!("{} × {}", frame.width, frame.height));
        if self.metadata.as_ref().is_some_and(|metadata| !metadata.has_audio) {
            parts.push(i18n.tr("video-no-audio"));
        }
        parts.join(" · ")
    }
}

fn probe_video(path: PathBuf, session_id: u64) -> Task<Message> {
    Task::perform(
        async move {
            match tokio::task::spawn_blocking(move || video::probe(&path)).await {
                Ok(result) => result,
                Err(e) => Err(Error::Io(format!("video probe task failed: {e}"))),
            }
        },
        move |result| Message::VideoProbed { session_id, result },
    )
}

fn media_image<'a>(handle: image::Handle) -> Element<'a, Message> {
    image(handle)
        .content_fit(ContentFit::Contain)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn with_caption<'a>(media: Element<'a, Message>, caption: String) -> Element<'a, Message> {
    column![
        media,
        container(text(caption).size(typography::CAPTION))
            .width(Length::Fill)
            .align_x(alignment::Horizontal::Center)
            .padding(spacing::XXS),
    ]
    .into()
}

fn status_text<'a>(label: String) -> Element<'a, Message> {
    center(text(label).size(typography::BODY)).into()
}

fn headline_text<'a>(label: String) -> Element<'a, Message> {
    center(text(label).size(typography::TITLE_MD)).into()
}

fn placeholder<'a>(reason: &PlaceholderReason, i18n: &I18n) -> Element<'a, Message> {
    match reason {
        PlaceholderReason::Idle => headline_text(i18n.tr("preview-placeholder")),
        PlaceholderReason::Scanning => headline_text(i18n.tr("preview-scanning")),
        PlaceholderReason::Error { file_name, key } => {
            let headline = text(i18n.tr_with_args("error-load-file", &[("name", file_name.as_str())]))
                .size(typography::TITLE_MD)
                .style(|theme: &iced::Theme| text::Style {
                    color: Some(ColorScheme::for_theme(theme).error),
                });
            let detail = text(i18n.tr(key)).size(typography::BODY);
            center(
                column![headline, detail]
                    .spacing(spacing::XS)
                    .align_x(alignment::Horizontal::Center),
            )
            .into()
        }
    }
}
