// SPDX-License-Identifier: MPL-2.0
//! Application configuration stored in `settings.toml`.
//!
//! # Configuration Sections
//!
//! - `[general]` - Language and theme mode
//! - `[browser]` - Tree pane root, width and hidden-file visibility
//! - `[video]` - Autoplay, volume, mute and looping
//!
//! Missing sections and keys fall back to their defaults. Non-finite
//! numbers count as missing. Browsing never writes the file.
//!
//! # Examples
//!
//! ```no_run
//! use media_browser::app::config;
//!
//! let (config, warning) = config::load();
//! if let Some(key) = warning {
//!     eprintln!("config fell back to defaults: {key}");
//! }
//! println!("tree width: {}", config.browser.tree_width());
//! ```

pub mod defaults;

pub use defaults::*;

use crate::app::paths;
use crate::error::Result;
use crate::ui::theming::ThemeMode;
use crate::video_player::PlaybackOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "settings.toml";

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GeneralConfig {
    /// UI language code (e.g., "en-US", "zh-CN").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, deserialize_with = "deserialize_theme_mode")]
    pub theme_mode: ThemeMode,
}

/// File tree pane settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BrowserConfig {
    /// Directory the tree is rooted at. Filesystem roots when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_width: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_hidden: Option<bool>,
}

impl BrowserConfig {
    /// Tree pane width, clamped to the supported range.
    #[must_use]
    pub fn tree_width(&self) -> f32 {
        self.tree_width
            .filter(|width| width.is_finite())
            .unwrap_or(DEFAULT_TREE_WIDTH)
            .clamp(MIN_TREE_WIDTH, MAX_TREE_WIDTH)
    }

    #[must_use]
    pub fn show_hidden(&self) -> bool {
        self.show_hidden.unwrap_or(false)
    }
}

/// Video playback settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoplay: Option<bool>,

    #[serde(default = "default_volume", skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_enabled: Option<bool>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            autoplay: Some(true),
            volume: Some(DEFAULT_VOLUME),
            muted: Some(false),
            loop_enabled: Some(false),
        }
    }
}

impl VideoConfig {
    /// Videos start playing as soon as they are shown unless disabled.
    #[must_use]
    pub fn autoplay(&self) -> bool {
        self.autoplay.unwrap_or(true)
    }

    #[must_use]
    pub fn volume(&self) -> f32 {
        self.volume
            .filter(|volume| volume.is_finite())
            .unwrap_or(DEFAULT_VOLUME)
            .clamp(MIN_VOLUME, MAX_VOLUME)
    }

    #[must_use]
    pub fn muted(&self) -> bool {
        self.muted.unwrap_or(false)
    }

    #[must_use]
    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled.unwrap_or(false)
    }

    /// Start options for video playback sessions.
    #[must_use]
    pub fn playback_options(&self) -> PlaybackOptions {
        PlaybackOptions {
            autoplay: self.autoplay(),
            looping: self.loop_enabled(),
            volume: self.volume(),
            muted: self.muted(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub video: VideoConfig,
}

#[allow(clippy::unnecessary_wraps)]
fn default_volume() -> Option<f32> {
    Some(DEFAULT_VOLUME)
}

fn deserialize_theme_mode<'de, D>(deserializer: D) -> std::result::Result<ThemeMode, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let raw = String::deserialize(deserializer)?;
    match raw.to_lowercase().as_str() {
        "light" => Ok(ThemeMode::Light),
        "dark" => Ok(ThemeMode::Dark),
        "system" => Ok(ThemeMode::System),
        other => Err(D::Error::custom(format!("invalid theme_mode: {other}"))),
    }
}

fn get_config_path_with_override(base_dir: Option<PathBuf>) -> Option<PathBuf> {
    paths::get_app_config_dir_with_override(base_dir).map(|mut path| {
        path.push(CONFIG_FILE);
        path
    })
}

/// Loads the configuration from the default path.
///
/// Returns a tuple of (config, optional warning key). A missing file yields
/// the defaults silently; an unreadable one yields the defaults plus the i18n
/// key of a warning to show.
pub fn load() -> (Config, Option<String>) {
    load_with_override(None)
}

/// Loads the configuration from a custom directory.
pub fn load_with_override(base_dir: Option<PathBuf>) -> (Config, Option<String>) {
    let Some(path) = get_config_path_with_override(base_dir) else {
        return (Config::default(), None);
    };

    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return (Config::default(), None);
    }

    match load_from_path(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "config loaded");
            (config, None)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "config load failed, using defaults: {e}");
            (Config::default(), Some("notification-config-load-error".to_string()))
        }
    }
}

/// Loads configuration from a specific path.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::error::Error::Io) if the file cannot be read
/// and [`Error::Config`](crate::error::Error::Config) if it is not valid TOML
/// for [`Config`].
pub fn load_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::tempdir;

    #[test]
    fn serialized_config_loads_back_unchanged() {
        let config = Config {
            general: GeneralConfig {
                language: Some("zh-CN".to_string()),
                theme_mode: ThemeMode::Light,
            },
            browser: BrowserConfig {
                root_dir: Some(PathBuf::from("/srv/photos")),
                tree_width: Some(280.0),
                show_hidden: Some(true),
            },
            video: VideoConfig {
                autoplay: Some(false),
                volume: Some(0.5),
                muted: Some(true),
                loop_enabled: Some(true),
            },
        };
        let temp_dir = tempdir().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("settings.toml");
        let content = toml::to_string_pretty(&config).expect("failed to serialize config");
        fs::write(&config_path, content).expect("failed to write config");
        let loaded = load_from_path(&config_path).expect("failed to load config");

        assert_eq!(loaded, config);
    }

    #[test]
    fn load_from_path_invalid_toml_errors() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "not = valid = toml").expect("failed to write invalid toml");

        match load_from_path(&config_path) {
            Err(Error::Config(message)) => assert!(!message.is_empty()),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn missing_sections_use_defaults() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "[browser]\nshow_hidden = true\n").expect("write config");

        let loaded = load_from_path(&config_path).expect("partial config should load");
        assert!(loaded.browser.show_hidden());
        assert_eq!(loaded.general, GeneralConfig::default());
        assert_eq!(loaded.video.volume, Some(DEFAULT_VOLUME));
        assert!(loaded.video.autoplay());
    }

    #[test]
    fn theme_mode_is_case_insensitive() {
        let config: Config =
            toml::from_str("[general]\ntheme_mode = \"Dark\"\n").expect("valid config");
        assert_eq!(config.general.theme_mode, ThemeMode::Dark);

        let invalid = toml::from_str::<Config>("[general]\ntheme_mode = \"sepia\"\n");
        assert!(invalid.is_err());
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.general.theme_mode, ThemeMode::System);
        assert!(config.general.language.is_none());
        assert!(config.browser.root_dir.is_none());
        assert!((config.browser.tree_width() - DEFAULT_TREE_WIDTH).abs() < f32::EPSILON);
        assert!(!config.browser.show_hidden());
        assert!(config.video.autoplay());
        assert!(!config.video.muted());
        assert!(!config.video.loop_enabled());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = Config {
            browser: BrowserConfig {
                tree_width: Some(5.0),
                ..BrowserConfig::default()
            },
            video: VideoConfig {
                volume: Some(3.0),
                ..VideoConfig::default()
            },
            ..Config::default()
        };
        assert!((config.browser.tree_width() - MIN_TREE_WIDTH).abs() < f32::EPSILON);
        assert!((config.video.volume() - MAX_VOLUME).abs() < f32::EPSILON);
    }

    #[test]
    fn non_finite_values_fall_back_to_defaults() {
        let config: Config = toml::from_str(
            "[browser]\ntree_width = nan\n\n[video]\nvolume = nan\n",
        )
        .expect("nan is valid TOML");
        assert!((config.browser.tree_width() - DEFAULT_TREE_WIDTH).abs() < f32::EPSILON);
        assert!((config.video.volume() - DEFAULT_VOLUME).abs() < f32::EPSILON);

        let config: Config = toml::from_str("[browser]\ntree_width = inf\n").expect("valid");
        assert!((config.browser.tree_width() - DEFAULT_TREE_WIDTH).abs() < f32::EPSILON);
    }

    #[test]
    fn video_section_maps_to_playback_options() {
        let video = VideoConfig {
            autoplay: Some(false),
            volume: Some(0.25),
            muted: None,
            loop_enabled: Some(true),
        };
        let options = video.playback_options();
        assert!(!options.autoplay);
        assert!(options.looping);
        assert!(!options.muted);
        assert!((options.volume - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn load_with_override_missing_file_returns_defaults() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let (config, warning) = load_with_override(Some(temp_dir.path().to_path_buf()));
        assert_eq!(config, Config::default());
        assert!(warning.is_none());
    }

    #[test]
    fn load_with_override_invalid_file_warns() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        fs::write(temp_dir.path().join(CONFIG_FILE), "[[[").expect("write config");

        let (config, warning) = load_with_override(Some(temp_dir.path().to_path_buf()));
        assert_eq!(config, Config::default());
        assert_eq!(warning.as_deref(), Some("notification-config-load-error"));
    }
}
