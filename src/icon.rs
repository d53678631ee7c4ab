// SPDX-License-Identifier: MPL-2.0
//! Window icon, rasterized at runtime from the embedded SVG.

use iced::window::{icon, Icon};
use resvg::usvg;

/// Edge length of the rasterized icon in pixels.
const ICON_SIZE: u32 = 128;

/// Rasterizes the embedded SVG icon to a square RGBA buffer.
/// Returns `None` if parsing or rendering fails.
pub fn load_window_icon() -> Option<Icon> {
    // Embedded so packaging does not need to locate assets on disk
    const SVG_SOURCE: &str = include_str!("../assets/branding/media_browser.svg");

    let tree = match usvg::Tree::from_data(SVG_SOURCE.as_bytes(), &usvg::Options::default()) {
        Ok(tree) => tree,
        Err(e) => {
            tracing::warn!("window icon unavailable: {e}");
            return None;
        }
    };

    let size = tree.size();
    #[allow(clippy::cast_precision_loss)]
    let transform = tiny_skia::Transform::from_scale(
        ICON_SIZE as f32 / size.width(),
        ICON_SIZE as f32 / size.height(),
    );

    let mut pixmap = tiny_skia::Pixmap::new(ICON_SIZE, ICON_SIZE)?;
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    icon::from_rgba(pixmap.data().to_vec(), ICON_SIZE, ICON_SIZE).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_svg_rasterizes() {
        assert!(load_window_icon().is_some());
    }
}
