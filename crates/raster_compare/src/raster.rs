//! Grayscale raster images.
//!
//! A [`RasterImage`] is an immutable, row-major grid of 8-bit intensity samples.
//! By convention 0 is ink and 255 is background. Nothing in this crate mutates
//! an image in place; every transformation produces a new value.

use crate::error::{CompareError, Result};
use image::GrayImage;

/// Intensity used for background pixels.
pub const BACKGROUND: u8 = 255;

/// Intensity used for ink pixels.
pub const INK: u8 = 0;

/// Row-major 8-bit grayscale image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Wraps an existing sample buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::BufferLength`] if `pixels.len()` is not
    /// `width * height`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != sample_count(width, height) {
            return Err(CompareError::BufferLength {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Creates an image where every sample has the same intensity.
    #[must_use]
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; sample_count(width, height)],
        }
    }

    /// Creates an all-background image.
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        Self::filled(width, height, BACKGROUND)
    }

    /// Creates an image by evaluating `sample` at every coordinate.
    #[must_use]
    pub fn from_fn<F>(width: u32, height: u32, mut sample: F) -> Self
    where
        F: FnMut(u32, u32) -> u8,
    {
        let mut pixels = Vec::with_capacity(sample_count(width, height));
        for y_pos in 0..height {
            for x_pos in 0..width {
                pixels.push(sample(x_pos, y_pos));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Returns a copy of this image with one sample replaced.
    ///
    /// Out-of-bounds coordinates leave the image unchanged.
    #[must_use]
    pub fn with_pixel(mut self, x_pos: u32, y_pos: u32, value: u8) -> Self {
        if let Some(idx) = self.index_of(x_pos, y_pos) {
            self.pixels[idx] = value;
        }
        self
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns `(width, height)`.
    #[inline]
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of samples in the image.
    #[inline]
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// True when the image has no samples.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Raw row-major samples.
    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Sample at `(x_pos, y_pos)`, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, x_pos: u32, y_pos: u32) -> Option<u8> {
        self.index_of(x_pos, y_pos).map(|idx| self.pixels[idx])
    }

    /// Converts into an `image` crate buffer for encoding or further processing.
    #[must_use]
    pub fn to_gray_image(&self) -> GrayImage {
        // Length is guaranteed by construction; fall back to a blank canvas otherwise.
        GrayImage::from_raw(self.width, self.height, self.pixels.clone())
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    fn index_of(&self, x_pos: u32, y_pos: u32) -> Option<usize> {
        (x_pos < self.width && y_pos < self.height)
            .then(|| y_pos as usize * self.width as usize + x_pos as usize)
    }
}

impl From<GrayImage> for RasterImage {
    fn from(img: GrayImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            pixels: img.into_raw(),
        }
    }
}

fn sample_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}
