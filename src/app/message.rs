// SPDX-License-Identifier: MPL-2.0
//! Top-level messages and runtime flags for the application.

use crate::directory_scanner::ScanOutcome;
use crate::error::Error;
use crate::ui::{file_tree, preview};
use iced::{mouse, window};

/// Top-level messages consumed by `App::update`. The variants forward
/// component messages while keeping a single update entrypoint.
#[derive(Debug, Clone)]
pub enum Message {
    Tree(file_tree::Message),
    Preview(preview::Message),
    /// A background folder scan finished.
    ScanCompleted {
        generation: u64,
        result: Result<ScanOutcome, Error>,
    },
    /// Step through the media list: -1 for previous, 1 for next.
    Navigate(isize),
    /// Mouse wheel moved over the preview pane.
    PreviewScrolled(mouse::ScrollDelta),
    TogglePlayback,
    ToggleFullscreen(window::Id),
    ExitFullscreen(window::Id),
}

/// Runtime flags passed in from the CLI.
#[derive(Debug, Default)]
pub struct Flags {
    /// Optional locale override in BCP-47 form (e.g. `zh-CN`, `en-US`).
    pub lang: Option<String>,
    /// Optional directory or media file to open on startup.
    pub path: Option<String>,
    /// Optional config directory override (for settings.toml).
    /// Takes precedence over the `MEDIA_BROWSER_CONFIG_DIR` environment variable.
    pub config_dir: Option<String>,
}
