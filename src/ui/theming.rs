// SPDX-License-Identifier: MPL-2.0
//! Light, dark and system theme modes.

use crate::ui::design_tokens::{opacity, palette};
use iced::{Color, Theme};
use serde::{Deserialize, Serialize};

/// Colors the custom styles draw with.
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub surface_primary: Color,
    pub surface_secondary: Color,

    pub text_primary: Color,
    pub text_secondary: Color,

    /// Background of the selected tree row.
    pub selection: Color,
    /// Background of a hovered tree row.
    pub hover: Color,

    pub error: Color,
}

impl ColorScheme {
    #[must_use]
    pub fn light() -> Self {
        Self {
            surface_primary: palette::WHITE,
            surface_secondary: palette::GRAY_100,

            text_primary: palette::GRAY_900,
            text_secondary: palette::GRAY_700,

            selection: Color {
                a: opacity::OVERLAY_MEDIUM,
                ..palette::PRIMARY_400
            },
            hover: Color {
                a: opacity::OVERLAY_SUBTLE,
                ..palette::PRIMARY_400
            },

            error: palette::ERROR_500,
        }
    }

    #[must_use]
    pub fn dark() -> Self {
        Self {
            surface_primary: palette::GRAY_900,
            surface_secondary: Color::from_rgb(0.15, 0.15, 0.15),

            text_primary: palette::WHITE,
            text_secondary: palette::GRAY_200,

            selection: Color {
                a: opacity::OVERLAY_MEDIUM,
                ..palette::PRIMARY_600
            },
            hover: Color {
                a: opacity::OVERLAY_SUBTLE,
                ..palette::PRIMARY_500
            },

            error: palette::ERROR_500,
        }
    }

    /// Scheme matching an iced theme's brightness.
    #[must_use]
    pub fn for_theme(theme: &Theme) -> Self {
        if theme.extended_palette().is_dark {
            Self::dark()
        } else {
            Self::light()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemeMode {
    /// Returns true if the effective theme is dark.
    /// For System mode, detects the actual system theme.
    #[must_use]
    pub fn is_dark(self) -> bool {
        match self {
            ThemeMode::Light => false,
            ThemeMode::Dark => true,
            ThemeMode::System => {
                // Detect system theme; default to dark on detection error
                !matches!(dark_light::detect(), Ok(dark_light::Mode::Light))
            }
        }
    }

    /// Built-in iced theme for this mode.
    #[must_use]
    pub fn iced_theme(self) -> Theme {
        if self.is_dark() {
            Theme::Dark
        } else {
            Theme::Light
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_scheme_has_light_surface() {
        let scheme = ColorScheme::light();
        assert!(scheme.surface_primary.r > 0.9);
        assert!(scheme.text_primary.r < 0.2);
    }

    #[test]
    fn dark_scheme_has_dark_surface() {
        let scheme = ColorScheme::dark();
        assert!(scheme.surface_primary.r < 0.2);
        assert!(scheme.text_primary.r > 0.9);
    }

    #[test]
    fn selection_is_more_visible_than_hover() {
        for scheme in [ColorScheme::light(), ColorScheme::dark()] {
            assert!(scheme.selection.a > scheme.hover.a);
        }
    }

    #[test]
    fn scheme_follows_iced_theme() {
        assert!(ColorScheme::for_theme(&Theme::Dark).surface_primary.r < 0.2);
        assert!(ColorScheme::for_theme(&Theme::Light).surface_primary.r > 0.9);
    }

    #[test]
    fn explicit_modes_map_to_iced_themes() {
        assert!(!ThemeMode::Light.is_dark());
        assert!(ThemeMode::Dark.is_dark());
        assert_eq!(ThemeMode::Light.iced_theme(), Theme::Light);
        assert_eq!(ThemeMode::Dark.iced_theme(), Theme::Dark);
        // System mode depends on the desktop, so only check it resolves
        let _ = ThemeMode::System.iced_theme();
    }
}
