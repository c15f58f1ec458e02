//! Packed ARGB bitmaps, the pixel input of the classifier.
//!
//! Decoding and face detection happen elsewhere; this module only turns an
//! already-decoded [`DynamicImage`] into the `side × side` ARGB array the
//! encoder consumes, optionally cropping a face region first.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use crate::error::EncodingError;

/// Pack RGBA channels into a single `0xAARRGGBB` value.
#[inline]
pub fn pack_argb(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// Axis-aligned face region inside a source image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Row-major packed ARGB pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Bitmap {
    /// Wrap an ARGB pixel array. Fails if `pixels.len() != width * height`.
    pub fn from_argb(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self, EncodingError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(EncodingError::PixelCount {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A bitmap with every pixel set to `argb`.
    pub fn filled(width: u32, height: u32, argb: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![argb; width as usize * height as usize],
        }
    }

    /// Convert a decoded image without resizing.
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = rgba
            .pixels()
            .map(|p| pack_argb(p[0], p[1], p[2], p[3]))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Resize a decoded image to exactly `side × side` and convert it.
    ///
    /// Uses bilinear filtering; aspect ratio is not preserved, so callers
    /// should pass a roughly square face crop.
    pub fn from_image_resized(image: &DynamicImage, side: u32) -> Self {
        if image.dimensions() == (side, side) {
            return Self::from_image(image);
        }
        let resized = image.resize_exact(side, side, FilterType::Triangle);
        Self::from_image(&resized)
    }

    /// Crop `rect` out of `image` and resize it to `side × side`.
    ///
    /// The rectangle is clamped to the image bounds. Returns `None` when
    /// nothing of it remains.
    pub fn crop_resized(image: &DynamicImage, rect: FaceRect, side: u32) -> Option<Self> {
        let (img_w, img_h) = image.dimensions();
        if rect.x >= img_w || rect.y >= img_h {
            return None;
        }
        let width = rect.width.min(img_w - rect.x);
        let height = rect.height.min(img_h - rect.y);
        if width == 0 || height == 0 {
            return None;
        }
        let crop = image.crop_imm(rect.x, rect.y, width, height);
        Some(Self::from_image_resized(&crop, side))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Copy all pixels into `dst`, which must hold exactly `width * height`.
    pub fn get_pixels(&self, dst: &mut [u32]) -> Result<(), EncodingError> {
        if dst.len() != self.pixels.len() {
            return Err(EncodingError::PixelCount {
                expected: dst.len(),
                actual: self.pixels.len(),
            });
        }
        dst.copy_from_slice(&self.pixels);
        Ok(())
    }
}
