// SPDX-License-Identifier: MPL-2.0
//! `media_browser` pairs a filesystem tree with an image and video preview
//! pane, built with the Iced GUI framework.
//!
//! Selecting a folder scans it recursively for images, GIFs and videos;
//! selecting a file previews it, and the arrow keys or mouse wheel step through
//! its siblings.

pub mod app;
pub mod directory_scanner;
pub mod error;
pub mod i18n;
pub mod icon;
pub mod media;
pub mod ui;
pub mod video_player;
