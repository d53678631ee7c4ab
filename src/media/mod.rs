// SPDX-License-Identifier: MPL-2.0
//! Media classification and loading.
//!
//! Every path the browser handles is classified by extension into one of the
//! [`MediaKind`] categories. The category decides which viewer the preview
//! pane opens: a still image, a looping animation, or the video player.

pub mod image;
pub mod navigator;
pub mod video;

use std::collections::BTreeMap;
use std::path::Path;

pub use image::{load_image, ImageData};
pub use navigator::MediaList;

/// Viewer category of a media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MediaKind {
    /// Still image (JPEG, PNG, BMP).
    Image,
    /// Animated image played frame by frame (GIF).
    AnimatedImage,
    /// Video with optional audio track.
    Video,
}

/// Supported media extensions
pub mod extensions {
    /// Still image extensions.
    pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

    /// Animated image extensions.
    pub const ANIMATED_IMAGE_EXTENSIONS: &[&str] = &["gif"];

    /// Video file extensions.
    pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "mov"];
}

/// Mapping from lowercase extension (without the dot) to [`MediaKind`].
///
/// Lookups are case-insensitive. The default set is the one the application
/// uses; other sets can be built with [`ExtensionSet::from_pairs`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionSet {
    kinds: BTreeMap<String, MediaKind>,
}

impl ExtensionSet {
    /// Builds a set from `(extension, kind)` pairs. Extensions may carry a
    /// leading dot and any case.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, MediaKind)>,
    {
        let kinds = pairs
            .into_iter()
            .map(|(ext, kind)| (normalize_extension(ext), kind))
            .collect();
        Self { kinds }
    }

    /// Returns the category for a bare extension.
    #[must_use]
    pub fn kind_of_extension(&self, extension: &str) -> Option<MediaKind> {
        self.kinds.get(&normalize_extension(extension)).copied()
    }

    /// Returns the category for a path, based on its extension.
    pub fn kind_of<P: AsRef<Path>>(&self, path: P) -> Option<MediaKind> {
        let extension = path.as_ref().extension()?.to_str()?;
        self.kind_of_extension(extension)
    }

    /// Returns true if the path carries one of the configured extensions.
    pub fn matches<P: AsRef<Path>>(&self, path: P) -> bool {
        self.kind_of(path).is_some()
    }
}

impl Default for ExtensionSet {
    fn default() -> Self {
        let images = extensions::IMAGE_EXTENSIONS
            .iter()
            .map(|ext| (*ext, MediaKind::Image));
        let animated = extensions::ANIMATED_IMAGE_EXTENSIONS
            .iter()
            .map(|ext| (*ext, MediaKind::AnimatedImage));
        let videos = extensions::VIDEO_EXTENSIONS
            .iter()
            .map(|ext| (*ext, MediaKind::Video));
        Self::from_pairs(images.chain(animated).chain(videos))
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}

/// Classifies a path with the default extension set.
pub fn detect_media_kind<P: AsRef<Path>>(path: P) -> Option<MediaKind> {
    ExtensionSet::default().kind_of(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn default_set_maps_every_extension() {
        let set = ExtensionSet::default();
        for ext in ["jpg", "jpeg", "png", "bmp"] {
            assert_eq!(set.kind_of_extension(ext), Some(MediaKind::Image), "{ext}");
        }
        assert_eq!(set.kind_of_extension("gif"), Some(MediaKind::AnimatedImage));
        for ext in ["mp4", "avi", "mkv", "mov"] {
            assert_eq!(set.kind_of_extension(ext), Some(MediaKind::Video), "{ext}");
        }
        assert_eq!(set.kind_of_extension("webm"), None);
    }

    #[test]
    fn detection_is_case_insensitive() {
        assert_eq!(detect_media_kind("VIDEO.MP4"), Some(MediaKind::Video));
        assert_eq!(detect_media_kind("Image.JpEg"), Some(MediaKind::Image));
        assert_eq!(detect_media_kind("loop.GIF"), Some(MediaKind::AnimatedImage));
    }

    #[test]
    fn unsupported_or_missing_extension_is_none() {
        assert_eq!(detect_media_kind("document.pdf"), None);
        assert_eq!(detect_media_kind("photo.webp"), None);
        assert_eq!(detect_media_kind("README"), None);
        assert_eq!(detect_media_kind(".hidden"), None);
    }

    #[test]
    fn path_with_directories_uses_file_extension() {
        let path = PathBuf::from("/home/user/videos.d/vacation.mkv");
        assert_eq!(detect_media_kind(&path), Some(MediaKind::Video));
    }

    #[test]
    fn from_pairs_accepts_leading_dots() {
        let set = ExtensionSet::from_pairs([(".PNG", MediaKind::Image)]);
        assert!(set.matches("a.png"));
        assert!(set.matches("b.PnG"));
        assert!(!set.matches("a.jpg"));
    }
}
