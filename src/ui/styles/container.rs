// SPDX-License-Identifier: MPL-2.0
//! Container styles.

use crate::ui::design_tokens::{opacity, radius};
use crate::ui::theming::ColorScheme;
use iced::widget::container;
use iced::{Background, Border, Color, Theme};

/// Tree pane surface.
///
/// Derived from the active theme background so it stays readable in both
/// light and dark modes.
pub fn panel(theme: &Theme) -> container::Style {
    let base = theme.extended_palette().background.weak.color;

    container::Style {
        background: Some(Background::Color(Color {
            a: opacity::SURFACE,
            ..base
        })),
        border: Border {
            radius: radius::NONE.into(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Preview pane backdrop.
pub fn preview(theme: &Theme) -> container::Style {
    let colors = ColorScheme::for_theme(theme);

    container::Style {
        background: Some(Background::Color(colors.surface_secondary)),
        text_color: Some(colors.text_secondary),
        ..Default::default()
    }
}
