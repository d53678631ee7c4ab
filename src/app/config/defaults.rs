// SPDX-License-Identifier: MPL-2.0
//! Default values for configuration settings.

// ==========================================================================
// Window
// ==========================================================================

/// Initial window width in logical pixels.
pub const DEFAULT_WINDOW_WIDTH: f32 = 1200.0;

/// Initial window height in logical pixels.
pub const DEFAULT_WINDOW_HEIGHT: f32 = 800.0;

// ==========================================================================
// Browser pane
// ==========================================================================

/// Default width of the file tree pane.
pub const DEFAULT_TREE_WIDTH: f32 = 320.0;

/// Narrowest tree pane accepted from the config file.
pub const MIN_TREE_WIDTH: f32 = 160.0;

/// Widest tree pane accepted from the config file.
pub const MAX_TREE_WIDTH: f32 = 800.0;

// ==========================================================================
// Video
// ==========================================================================

/// Default playback volume (0.0 to 1.0).
pub const DEFAULT_VOLUME: f32 = 0.8;

pub const MIN_VOLUME: f32 = 0.0;

pub const MAX_VOLUME: f32 = 1.0;
