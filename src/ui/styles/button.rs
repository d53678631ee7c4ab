// SPDX-License-Identifier: MPL-2.0
//! Centralized button styles.

use crate::ui::design_tokens::{palette, radius};
use crate::ui::theming::ColorScheme;
use iced::widget::button;
use iced::{Background, Border, Color, Theme};

/// Primary action button ("Open folder…").
pub fn primary(_theme: &Theme, status: button::Status) -> button::Style {
    let background = match status {
        button::Status::Hovered => palette::PRIMARY_400,
        button::Status::Disabled => palette::GRAY_400,
        button::Status::Active | button::Status::Pressed => palette::PRIMARY_500,
    };

    button::Style {
        background: Some(Background::Color(background)),
        text_color: palette::WHITE,
        border: Border {
            color: palette::PRIMARY_600,
            width: 1.0,
            radius: radius::SM.into(),
        },
        ..button::Style::default()
    }
}

/// Flat row in the file tree. Selected rows keep their highlight while hovered.
pub fn tree_row(selected: bool) -> impl Fn(&Theme, button::Status) -> button::Style {
    move |theme: &Theme, status: button::Status| {
        let colors = ColorScheme::for_theme(theme);
        let background = match (selected, status) {
            (true, _) => Some(colors.selection),
            (false, button::Status::Hovered | button::Status::Pressed) => Some(colors.hover),
            (false, _) => None,
        };

        button::Style {
            background: background.map(Background::Color),
            text_color: colors.text_primary,
            border: Border {
                radius: radius::SM.into(),
                ..Border::default()
            },
            ..button::Style::default()
        }
    }
}

/// Disclosure arrow in front of directory rows.
pub fn disclosure(theme: &Theme, status: button::Status) -> button::Style {
    let colors = ColorScheme::for_theme(theme);
    let text_color = match status {
        button::Status::Hovered | button::Status::Pressed => colors.text_primary,
        _ => colors.text_secondary,
    };

    button::Style {
        background: Some(Background::Color(Color::TRANSPARENT)),
        text_color,
        ..button::Style::default()
    }
}
