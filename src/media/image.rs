// SPDX-License-Identifier: MPL-2.0
//! Still image decoding (JPEG, PNG, BMP) into RGBA handles for the preview.

use crate::error::Result;
use iced::widget::image;
use image_rs::GenericImageView;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct ImageData {
    pub handle: image::Handle,
    pub width: u32,
    pub height: u32,
}

impl ImageData {
    /// Creates a new `ImageData` from RGBA pixels.
    #[must_use]
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        let handle = image::Handle::from_rgba(width, height, pixels);
        Self {
            handle,
            width,
            height,
        }
    }
}

/// Load an image from the given path and return its data.
///
/// # Errors
///
/// Returns [`crate::error::Error::Io`] if the file cannot be read or the
/// bytes are not a decodable image.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ImageData> {
    let img_bytes = fs::read(path.as_ref())?;
    let img = image_rs::load_from_memory(&img_bytes)?;

    let (width, height) = img.dimensions();
    let pixels = img.to_rgba8().into_vec();

    Ok(ImageData::from_rgba(width, height, pixels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use image_rs::{ImageError, Rgba, RgbaImage};
    use std::io;
    use tempfile::tempdir;

    #[test]
    fn load_png_image_returns_expected_dimensions() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let image_path = temp_dir.path().join("sample.png");

        let image = RgbaImage::from_pixel(4, 2, Rgba([255, 0, 0, 255]));
        image
            .save(&image_path)
            .expect("failed to write temporary png");

        let data = load_image(&image_path).expect("png should load successfully");
        assert_eq!(data.width, 4);
        assert_eq!(data.height, 2);
    }

    #[test]
    fn load_bmp_image_returns_expected_dimensions() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let image_path = temp_dir.path().join("sample.bmp");

        let image = RgbaImage::from_pixel(3, 5, Rgba([0, 128, 255, 255]));
        image
            .save(&image_path)
            .expect("failed to write temporary bmp");

        let data = load_image(&image_path).expect("bmp should load successfully");
        assert_eq!((data.width, data.height), (3, 5));
    }

    #[test]
    fn load_missing_image_returns_io_error() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let missing_path = temp_dir.path().join("does_not_exist.png");

        match load_image(&missing_path) {
            Err(Error::Io(_)) => {}
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn load_invalid_png_bytes_returns_io_error() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let bad_path = temp_dir.path().join("invalid.png");
        fs::write(&bad_path, b"not a png").expect("failed to write invalid data");

        match load_image(&bad_path) {
            Err(Error::Io(message)) => assert!(!message.is_empty()),
            other => panic!("expected Io error for invalid png, got {other:?}"),
        }
    }

    #[test]
    fn image_error_conversion_returns_io_variant() {
        let io_err = io::Error::other("decode failed");
        let image_error = ImageError::IoError(io_err);
        let error: Error = image_error.into();
        match error {
            Error::Io(message) => assert!(message.contains("decode failed")),
            other => panic!("expected Io variant from ImageError, got {other:?}"),
        }
    }
}
