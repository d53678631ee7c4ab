// SPDX-License-Identifier: MPL-2.0
//! Update logic and message handlers for the application.
//!
//! Selection handling lives here: the tree reports what was selected, a scan
//! builds the media list, and the preview shows the current entry.

use super::Message;
use crate::directory_scanner::{self, ScanHandle, ScanOutcome, ScanRequest};
use crate::error::{Error, Result};
use crate::media::{ExtensionSet, MediaList};
use crate::ui::file_tree;
use crate::ui::preview::{self, PlaceholderReason};
use iced::{mouse, window, Task};
use std::path::{Path, PathBuf};

/// Context for update operations containing mutable references to app state.
pub struct UpdateContext<'a> {
    pub tree: &'a mut file_tree::State,
    pub preview: &'a mut preview::State,
    pub media: &'a mut MediaList,
    pub extensions: &'a ExtensionSet,
    pub scan: &'a mut Option<ScanHandle>,
    pub scan_generation: &'a mut u64,
    pub fullscreen: &'a mut bool,
    pub window_id: &'a mut Option<window::Id>,
}

/// Handles file tree messages.
pub fn handle_tree_message(ctx: &mut UpdateContext<'_>, message: file_tree::Message) -> Task<Message> {
    let (effect, task) = ctx.tree.handle_message(message);
    let tree_task = task.map(Message::Tree);

    let side_effect = match effect {
        file_tree::Effect::Selected(path) => handle_selection(ctx, Some(path)),
        file_tree::Effect::None => Task::none(),
    };

    Task::batch([tree_task, side_effect])
}

/// Reacts to a new tree selection.
///
/// - nothing selected: clear the media state
/// - a directory: scan it
/// - a media file: scan its parent and target the file
/// - anything else: clear the media state
pub fn handle_selection(ctx: &mut UpdateContext<'_>, selection: Option<PathBuf>) -> Task<Message> {
    let Some(path) = selection else {
        clear_media_state(ctx);
        return Task::none();
    };

    let generation = *ctx.scan_generation + 1;
    let request = if path.is_dir() {
        Some(ScanRequest::folder(path, generation))
    } else if path.is_file() && ctx.extensions.matches(&path) {
        ScanRequest::around_file(path, generation)
    } else {
        None
    };

    match request {
        Some(request) => start_scan(
            ctx,
            ScanRequest {
                extensions: ctx.extensions.clone(),
                ..request
            },
        ),
        None => {
            clear_media_state(ctx);
            Task::none()
        }
    }
}

/// Supersedes any running scan with `request`.
fn start_scan(ctx: &mut UpdateContext<'_>, request: ScanRequest) -> Task<Message> {
    // Dropping the previous handle cancels its walk and aborts its task
    if let Some(previous) = ctx.scan.take() {
        tracing::debug!(generation = previous.generation(), "superseding running scan");
    }

    *ctx.scan_generation = request.generation;
    ctx.media.clear();
    ctx.preview.show_placeholder(PlaceholderReason::Scanning);

    let (task, handle) = directory_scanner::spawn(request, |generation, result| {
        Message::ScanCompleted { generation, result }
    });
    *ctx.scan = Some(handle);
    task
}

/// Empties the media list and returns the preview to its idle placeholder.
pub fn clear_media_state(ctx: &mut UpdateContext<'_>) {
    // Late results of an abandoned scan must not repopulate the list
    if ctx.scan.take().is_some() {
        *ctx.scan_generation += 1;
    }
    ctx.media.clear();
    ctx.preview.show_placeholder(PlaceholderReason::Idle);
}

/// Applies a finished scan if it belongs to the latest request.
pub fn handle_scan_completed(
    ctx: &mut UpdateContext<'_>,
    generation: u64,
    result: Result<ScanOutcome>,
) -> Task<Message> {
    if generation != *ctx.scan_generation {
        tracing::debug!(generation, latest = *ctx.scan_generation, "ignoring stale scan result");
        return Task::none();
    }
    *ctx.scan = None;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(Error::Cancelled) => return Task::none(),
        Err(e) => {
            tracing::warn!("folder scan failed: {e}");
            clear_media_state(ctx);
            return Task::none();
        }
    };

    tracing::info!(generation, count = outcome.media.len(), "scan finished");
    *ctx.media = MediaList::from_scan(outcome.media, outcome.target.as_deref());

    match ctx.media.current().map(Path::to_path_buf) {
        Some(current) => ctx.preview.show(&current).map(Message::Preview),
        None => {
            clear_media_state(ctx);
            Task::none()
        }
    }
}

/// Moves through the media list. Steps past either end are ignored.
pub fn handle_navigate(ctx: &mut UpdateContext<'_>, step: isize) -> Task<Message> {
    match ctx.media.navigate(step).map(Path::to_path_buf) {
        Some(path) => ctx.preview.show(&path).map(Message::Preview),
        None => Task::none(),
    }
}

/// Wheel up shows the previous entry, wheel down the next.
#[must_use]
pub fn wheel_step(delta: mouse::ScrollDelta) -> Option<isize> {
    let y = match delta {
        mouse::ScrollDelta::Lines { y, .. } | mouse::ScrollDelta::Pixels { y, .. } => y,
    };
    if y > 0.0 {
        Some(-1)
    } else if y < 0.0 {
        Some(1)
    } else {
        None
    }
}

pub fn handle_preview_scrolled(ctx: &mut UpdateContext<'_>, delta: mouse::ScrollDelta) -> Task<Message> {
    match wheel_step(delta) {
        Some(step) => handle_navigate(ctx, step),
        None => Task::none(),
    }
}

/// Toggles fullscreen; the tree pane is hidden while fullscreen.
pub fn handle_toggle_fullscreen(ctx: &mut UpdateContext<'_>, window: window::Id) -> Task<Message> {
    *ctx.window_id = Some(window);
    let desired = !*ctx.fullscreen;
    update_fullscreen_mode(ctx.fullscreen, window, desired)
}

pub fn handle_exit_fullscreen(ctx: &mut UpdateContext<'_>, window: window::Id) -> Task<Message> {
    *ctx.window_id = Some(window);
    update_fullscreen_mode(ctx.fullscreen, window, false)
}

/// Updates fullscreen mode to the desired state.
fn update_fullscreen_mode(fullscreen: &mut bool, window_id: window::Id, desired: bool) -> Task<Message> {
    if *fullscreen == desired {
        return Task::none();
    }

    *fullscreen = desired;
    let mode = if desired {
        window::Mode::Fullscreen
    } else {
        window::Mode::Windowed
    };
    window::set_mode(window_id, mode)
}
