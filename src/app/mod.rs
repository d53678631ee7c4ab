// SPDX-License-Identifier: MPL-2.0
//! Application root state and orchestration between the tree and preview panes.
//!
//! The `App` struct owns the tree, the media list built by the latest folder
//! scan, and the preview of the current entry. It translates messages into
//! side effects like background scans, image decoding and playback sessions.

pub mod config;
mod message;
pub mod paths;
mod subscription;
mod update;
mod view;

pub use message::{Flags, Message};
pub use update::wheel_step;

use crate::directory_scanner::ScanHandle;
use crate::i18n::fluent::I18n;
use crate::media::{ExtensionSet, MediaList};
use crate::ui::{file_tree, preview};
use config::Config;
use iced::{window, Element, Subscription, Task, Theme};
use std::fmt;
use std::path::{Path, PathBuf};

/// Root Iced application state.
pub struct App {
    pub i18n: I18n,
    tree: file_tree::State,
    preview: preview::State,
    media: MediaList,
    extensions: ExtensionSet,
    /// Scan in flight, if any. Dropping it cancels the scan.
    scan: Option<ScanHandle>,
    /// Generation of the latest scan request.
    scan_generation: u64,
    fullscreen: bool,
    window_id: Option<window::Id>,
    theme: Theme,
    tree_width: f32,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("media_len", &self.media.len())
            .field("current_index", &self.media.current_index())
            .field("scan_generation", &self.scan_generation)
            .field("fullscreen", &self.fullscreen)
            .finish_non_exhaustive()
    }
}

pub const MIN_WINDOW_WIDTH: f32 = 640.0;
pub const MIN_WINDOW_HEIGHT: f32 = 480.0;

/// Builds the window settings
pub fn window_settings() -> window::Settings {
    let icon = crate::icon::load_window_icon();

    window::Settings {
        size: iced::Size::new(config::DEFAULT_WINDOW_WIDTH, config::DEFAULT_WINDOW_HEIGHT),
        min_size: Some(iced::Size::new(MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT)),
        icon,
        ..window::Settings::default()
    }
}

/// Entry point used by `main.rs` to launch the Iced application loop.
pub fn run(flags: Flags) -> iced::Result {
    use std::cell::RefCell;

    paths::init_cli_overrides(flags.config_dir.clone());

    // iced 0.14 requires an Fn boot closure; flags are consumed on first call
    let boot_state = RefCell::new(Some(flags));
    let boot = move || {
        let flags = boot_state.borrow_mut().take().unwrap_or_default();
        App::new(flags)
    };

    iced::application(boot, App::update, App::view)
        .title(App::title)
        .theme(App::theme)
        .window(window_settings())
        .subscription(App::subscription)
        .run()
}

/// Absolute form of a CLI path, without resolving symlinks.
fn absolute_start_path(raw: &str) -> Option<PathBuf> {
    let path = Path::new(raw);
    match std::path::absolute(path) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!(path = raw, "ignoring start path: {e}");
            None
        }
    }
}

impl App {
    /// Loads the configuration and builds the initial state.
    fn new(flags: Flags) -> (Self, Task<Message>) {
        let (config, config_warning) = config::load();
        let (app, task) = Self::with_config(flags, &config);
        if let Some(key) = config_warning {
            tracing::warn!("{}", app.i18n.tr(&key));
        }
        (app, task)
    }

    /// Builds the initial state from an already loaded configuration.
    ///
    /// A start path from the flags is revealed in the tree and selected.
    pub fn with_config(flags: Flags, config: &Config) -> (Self, Task<Message>) {
        let i18n = I18n::new(flags.lang.clone(), config);
        let extensions = ExtensionSet::default();

        let tree = file_tree::State::new(
            config.browser.root_dir.clone(),
            extensions.clone(),
            config.browser.show_hidden(),
        );
        let preview = preview::State::new(extensions.clone(), config.video.playback_options());

        let mut app = Self {
            i18n,
            tree,
            preview,
            media: MediaList::new(),
            extensions,
            scan: None,
            scan_generation: 0,
            fullscreen: false,
            window_id: None,
            theme: config.general.theme_mode.iced_theme(),
            tree_width: config.browser.tree_width(),
        };

        let task = match flags.path.as_deref().and_then(absolute_start_path) {
            Some(start) => {
                tracing::info!(path = %start.display(), "opening start path");
                let reveal = app.tree.reveal(start.clone()).map(Message::Tree);
                let selection = update::handle_selection(&mut app.update_context(), Some(start));
                Task::batch([reveal, selection])
            }
            None => app.expand_single_root(),
        };

        (app, task)
    }

    /// A tree with a single root starts expanded.
    fn expand_single_root(&mut self) -> Task<Message> {
        let single_root = {
            let mut roots = self.tree.root_paths();
            match (roots.next(), roots.next()) {
                (Some(root), None) => Some(root.to_path_buf()),
                _ => None,
            }
        };

        match single_root {
            Some(root) => {
                let (_, task) = self
                    .tree
                    .handle_message(file_tree::Message::TogglePressed(root));
                task.map(Message::Tree)
            }
            None => Task::none(),
        }
    }

    fn update_context(&mut self) -> update::UpdateContext<'_> {
        update::UpdateContext {
            tree: &mut self.tree,
            preview: &mut self.preview,
            media: &mut self.media,
            extensions: &self.extensions,
            scan: &mut self.scan,
            scan_generation: &mut self.scan_generation,
            fullscreen: &mut self.fullscreen,
            window_id: &mut self.window_id,
        }
    }

    fn title(&self) -> String {
        let base = self.i18n.tr("window-title");
        let current = self
            .preview
            .target()
            .path()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned());

        match (current, self.media.current_index()) {
            (Some(name), Some(index)) => {
                format!("{base} - {name} ({}/{})", index + 1, self.media.len())
            }
            _ => base,
        }
    }

    fn theme(&self) -> Theme {
        self.theme.clone()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            subscription::create_event_subscription(),
            self.preview.subscription().map(Message::Preview),
        ])
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tree(tree_message) => {
                update::handle_tree_message(&mut self.update_context(), tree_message)
            }
            Message::Preview(preview_message) => {
                self.preview.handle_message(preview_message);
                Task::none()
            }
            Message::ScanCompleted { generation, result } => {
                update::handle_scan_completed(&mut self.update_context(), generation, result)
            }
            Message::Navigate(step) => update::handle_navigate(&mut self.update_context(), step),
            Message::PreviewScrolled(delta) => {
                update::handle_preview_scrolled(&mut self.update_context(), delta)
            }
            Message::TogglePlayback => {
                self.preview.toggle_playback();
                Task::none()
            }
            Message::ToggleFullscreen(window) => {
                update::handle_toggle_fullscreen(&mut self.update_context(), window)
            }
            Message::ExitFullscreen(window) => {
                update::handle_exit_fullscreen(&mut self.update_context(), window)
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        view::view(view::ViewContext {
            i18n: &self.i18n,
            tree: &self.tree,
            preview: &self.preview,
            media: &self.media,
            fullscreen: self.fullscreen,
            tree_width: self.tree_width,
        })
    }
}
