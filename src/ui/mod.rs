// SPDX-License-Identifier: MPL-2.0
//! User interface components.
//!
//! Components follow the Elm-style "state down, messages up" pattern: each
//! owns a `State`, consumes its own `Message` and reports anything the
//! application must act on.
//!
//! - [`file_tree`] - Lazy directory tree in the left pane
//! - [`preview`] - Image, animation and video preview in the right pane
//! - [`styles`] - Centralized widget styles
//! - [`design_tokens`] - Design system constants (colors, spacing, sizing)
//! - [`theming`] - Light/Dark/System theme mode management

pub mod design_tokens;
pub mod file_tree;
pub mod preview;
pub mod styles;
pub mod theming;
