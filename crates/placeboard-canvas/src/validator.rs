//! Canvas Image Validation
//!
//! A replacement canvas must decode as PNG, match the canvas size exactly
//! and use nothing but palette colors. Checks run in that order and stop at
//! the first failure. Dimensions come from the PNG header, so a wrong-size
//! image is refused before any pixel data is decoded.

use image::{ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

use crate::error::{Error, Result};
use crate::palette::{Palette, Rgb};

/// Default canvas width in pixels
pub const DEFAULT_CANVAS_WIDTH: u32 = 2000;
/// Default canvas height in pixels
pub const DEFAULT_CANVAS_HEIGHT: u32 = 2000;

/// Canvas dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl CanvasSize {
    /// Create a canvas size
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels
    #[must_use]
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Check that a coordinate lies on the canvas
    #[must_use]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        (0..i64::from(self.width)).contains(&x) && (0..i64::from(self.height)).contains(&y)
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT)
    }
}

/// An encoded image that passed every check
///
/// Only the submitted bytes are kept; the decoded pixel grid is dropped
/// as soon as validation finishes.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    bytes: Vec<u8>,
    size: CanvasSize,
}

impl ValidatedImage {
    /// Encoded PNG bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take the encoded bytes
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Image dimensions
    #[must_use]
    pub fn size(&self) -> CanvasSize {
        self.size
    }
}

/// Validates candidate canvas images
#[derive(Debug, Clone, Default)]
pub struct CanvasValidator {
    size: CanvasSize,
    palette: Palette,
}

impl CanvasValidator {
    /// Create a validator for the given canvas size
    #[must_use]
    pub fn new(size: CanvasSize) -> Self {
        Self {
            size,
            palette: Palette,
        }
    }

    /// Expected canvas size
    #[must_use]
    pub fn size(&self) -> CanvasSize {
        self.size
    }

    /// Validate encoded PNG bytes
    ///
    /// CPU-bound on large canvases; async callers should run it on a
    /// blocking worker.
    pub fn validate(&self, bytes: Vec<u8>) -> Result<ValidatedImage> {
        let (width, height) =
            ImageReader::with_format(Cursor::new(&bytes), ImageFormat::Png).into_dimensions()?;
        if width != self.size.width || height != self.size.height {
            return Err(Error::Dimensions {
                width,
                height,
                expected_width: self.size.width,
                expected_height: self.size.height,
            });
        }

        let decoded = ImageReader::with_format(Cursor::new(&bytes), ImageFormat::Png).decode()?;
        let pixels = decoded.to_rgb8();
        drop(decoded);

        let first_invalid = pixels
            .pixels()
            .position(|p| !self.palette.contains(Rgb(p.0)));

        if let Some(index) = first_invalid {
            let index = index as u64;
            let width = u64::from(width);
            return Err(Error::InvalidColor {
                x: (index % width) as u32,
                y: (index / width) as u32,
            });
        }

        Ok(ValidatedImage {
            bytes,
            size: self.size,
        })
    }

    /// Validate a PNG file on disk
    pub fn validate_file(&self, path: impl AsRef<Path>) -> Result<ValidatedImage> {
        let bytes = std::fs::read(path.as_ref())?;
        self.validate(bytes)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageBuffer, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    use crate::palette::PALETTE;

    pub(crate) fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    pub(crate) fn solid_canvas(width: u32, height: u32, color: Rgb) -> RgbImage {
        ImageBuffer::from_pixel(width, height, image::Rgb(color.0))
    }

    #[test]
    fn test_accepts_palette_only_image() {
        let validator = CanvasValidator::new(CanvasSize::new(24, 3));
        let img = RgbImage::from_fn(24, 3, |x, _| image::Rgb(PALETTE[x as usize].0));
        let bytes = encode_png(&img);

        let validated = validator.validate(bytes.clone()).unwrap();
        assert_eq!(validated.bytes(), bytes.as_slice());
        assert_eq!(validated.size(), CanvasSize::new(24, 3));
    }

    #[test]
    fn test_rejects_garbage_bytes() {
        let validator = CanvasValidator::new(CanvasSize::new(4, 4));
        let err = validator.validate(b"definitely not a png".to_vec()).unwrap_err();
        assert_eq!(err.code(), "decode_error");
    }

    #[test]
    fn test_rejects_wrong_dimensions_regardless_of_content() {
        let validator = CanvasValidator::new(CanvasSize::new(8, 8));

        for (w, h) in [(7, 8), (8, 9), (16, 4), (1, 1)] {
            let bytes = encode_png(&solid_canvas(w, h, PALETTE[0]));
            match validator.validate(bytes) {
                Err(Error::Dimensions { width, height, .. }) => {
                    assert_eq!((width, height), (w, h));
                }
                other => panic!("expected dimension error for {}x{}, got {:?}", w, h, other),
            }
        }
    }

    fn crc32(data: &[u8]) -> u32 {
        let mut crc = 0xFFFF_FFFFu32;
        for &byte in data {
            crc ^= u32::from(byte);
            for _ in 0..8 {
                let mask = (crc & 1).wrapping_neg();
                crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
            }
        }
        !crc
    }

    /// Rewrite the IHDR size of an encoded PNG, keeping its CRC valid
    fn with_header_size(mut png: Vec<u8>, width: u32, height: u32) -> Vec<u8> {
        png[16..20].copy_from_slice(&width.to_be_bytes());
        png[20..24].copy_from_slice(&height.to_be_bytes());
        let crc = crc32(&png[12..29]);
        png[29..33].copy_from_slice(&crc.to_be_bytes());
        png
    }

    #[test]
    fn test_oversized_image_is_a_dimension_error() {
        let validator = CanvasValidator::default();
        let bytes = with_header_size(
            encode_png(&solid_canvas(1, 1, PALETTE[0])),
            24_000,
            24_000,
        );

        match validator.validate(bytes) {
            Err(Error::Dimensions { width, height, .. }) => {
                assert_eq!((width, height), (24_000, 24_000));
            }
            other => panic!("expected dimension error, got {:?}", other),
        }
    }

    #[test]
    fn test_reports_first_invalid_pixel_column_then_row() {
        let validator = CanvasValidator::new(CanvasSize::new(10, 6));
        let mut img = solid_canvas(10, 6, PALETTE[23]);
        img.put_pixel(7, 4, image::Rgb([1, 2, 3]));
        img.put_pixel(2, 5, image::Rgb([1, 2, 3]));

        match validator.validate(encode_png(&img)) {
            Err(Error::InvalidColor { x, y }) => assert_eq!((x, y), (7, 4)),
            other => panic!("expected invalid color, got {:?}", other),
        }
    }

    #[test]
    fn test_alpha_channel_is_ignored() {
        let validator = CanvasValidator::new(CanvasSize::new(4, 4));
        let [r, g, b] = PALETTE[5].0;
        let img: RgbaImage = ImageBuffer::from_pixel(4, 4, Rgba([r, g, b, 17]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();

        assert!(validator.validate(out.into_inner()).is_ok());
    }

    #[test]
    fn test_full_size_canvas() {
        let validator = CanvasValidator::default();
        let mut img = solid_canvas(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT, PALETTE[20]);
        assert!(validator.validate(encode_png(&img)).is_ok());

        img.put_pixel(1999, 1999, image::Rgb([0x12, 0x34, 0x56]));
        match validator.validate(encode_png(&img)) {
            Err(Error::InvalidColor { x, y }) => assert_eq!((x, y), (1999, 1999)),
            other => panic!("expected invalid color, got {:?}", other),
        }
    }

    #[test]
    fn test_canvas_size_contains() {
        let size = CanvasSize::default();
        assert!(size.contains(0, 0));
        assert!(size.contains(1999, 1999));
        assert!(!size.contains(2000, 0));
        assert!(!size.contains(0, -1));
        assert_eq!(size.pixel_count(), 4_000_000);
    }
}
