//! Diff visualisation.
//!
//! [`DiffRenderer`] turns an image pair into an RGB artifact. Pixels that
//! differ are painted in a highlight colour, identical pixels keep their gray
//! tone. The composite form adds the two inputs and a statistics panel so a
//! single image explains the whole comparison.
//!
//! Rendering never fails: pairs with different dimensions degrade to a
//! side-by-side placeholder.

use crate::artifact::{ArtifactKind, DiffArtifact};
use crate::comparator::PixelComparator;
use crate::glyphs::{draw_text, line_height, text_width};
use crate::raster::RasterImage;
use crate::statistics::ComparisonStatistics;
use image::{Rgb, RgbImage};

/// Default highlight colour for changed pixels.
pub const HIGHLIGHT: Rgb<u8> = Rgb([255, 0, 0]);

const PANEL_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_COLOR: Rgb<u8> = Rgb([32, 32, 32]);
const GAP: u32 = 4;
const MARGIN: u32 = 4;
const LINE_SPACING: u32 = 3;
const TEXT_SCALE: u32 = 1;

/// Renders highlighted difference maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffRenderer {
    /// Colour used for pixels that differ.
    pub highlight: Rgb<u8>,
    /// Decides which pixels count as different.
    pub comparator: PixelComparator,
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self {
            highlight: HIGHLIGHT,
            comparator: PixelComparator::default(),
        }
    }
}

impl DiffRenderer {
    #[must_use]
    pub const fn new(highlight: Rgb<u8>, comparator: PixelComparator) -> Self {
        Self {
            highlight,
            comparator,
        }
    }

    /// Renders a same-size overlay, or a side-by-side placeholder when the
    /// dimensions differ.
    #[must_use]
    pub fn render(&self, expected: &RasterImage, actual: &RasterImage) -> DiffArtifact {
        if expected.dimensions() != actual.dimensions() {
            return self.side_by_side(expected, actual);
        }
        DiffArtifact::new(ArtifactKind::Overlay, self.overlay(expected, actual))
    }

    /// Renders `expected | actual | diff | statistics`.
    ///
    /// Falls back to the side-by-side placeholder when the dimensions differ.
    #[must_use]
    pub fn render_composite(
        &self,
        expected: &RasterImage,
        actual: &RasterImage,
        statistics: &ComparisonStatistics,
    ) -> DiffArtifact {
        if expected.dimensions() != actual.dimensions() {
            return self.side_by_side(expected, actual);
        }

        let (width, height) = expected.dimensions();
        let lines = statistics_lines(statistics);
        let text_w = lines
            .iter()
            .map(|line| text_width(line, TEXT_SCALE))
            .max()
            .unwrap_or(0);
        let panel_w = text_w + 2 * MARGIN;
        let panel_h = lines.len() as u32 * (line_height(TEXT_SCALE) + LINE_SPACING) + 2 * MARGIN;

        let canvas_w = width * 3 + GAP * 3 + panel_w;
        let canvas_h = height.max(panel_h);
        let mut canvas = RgbImage::from_pixel(canvas_w, canvas_h, PANEL_BACKGROUND);

        blit_gray(&mut canvas, expected, 0);
        blit_gray(&mut canvas, actual, width + GAP);
        blit_rgb(&mut canvas, &self.overlay(expected, actual), 2 * (width + GAP));

        let panel_left = 3 * (width + GAP) + MARGIN;
        let mut top = MARGIN;
        for line in &lines {
            draw_text(&mut canvas, panel_left, top, line, TEXT_SCALE, TEXT_COLOR);
            top += line_height(TEXT_SCALE) + LINE_SPACING;
        }

        DiffArtifact::new(ArtifactKind::Composite, canvas)
    }

    fn overlay(&self, expected: &RasterImage, actual: &RasterImage) -> RgbImage {
        let (width, height) = expected.dimensions();
        let mut out = RgbImage::new(width, height);
        let samples = expected.pixels().iter().zip(actual.pixels());
        for (pixel, (&left, &right)) in out.pixels_mut().zip(samples) {
            *pixel = if self.comparator.differs(left, right) {
                self.highlight
            } else {
                Rgb([left, left, left])
            };
        }
        out
    }

    fn side_by_side(&self, expected: &RasterImage, actual: &RasterImage) -> DiffArtifact {
        let canvas_w = expected.width() + GAP + actual.width();
        let canvas_h = expected.height().max(actual.height());
        let mut canvas = RgbImage::from_pixel(canvas_w, canvas_h, PANEL_BACKGROUND);

        blit_gray(&mut canvas, expected, 0);
        for x_pos in expected.width()..expected.width() + GAP {
            for y_pos in 0..canvas_h {
                canvas.put_pixel(x_pos, y_pos, self.highlight);
            }
        }
        blit_gray(&mut canvas, actual, expected.width() + GAP);

        DiffArtifact::new(ArtifactKind::SideBySide, canvas)
    }
}

/// Text lines shown in the statistics panel.
#[must_use]
pub fn statistics_lines(statistics: &ComparisonStatistics) -> Vec<String> {
    vec![
        format!("DIFF {:.2}%", statistics.difference_percent),
        format!("MAX {}", statistics.max_error),
        format!("MEAN {:.2}", statistics.mean_error),
        format!("SIM {:.2}%", statistics.similarity_percent),
    ]
}

fn blit_gray(canvas: &mut RgbImage, src: &RasterImage, left: u32) {
    for y_pos in 0..src.height() {
        for x_pos in 0..src.width() {
            if let Some(value) = src.get(x_pos, y_pos) {
                canvas.put_pixel(left + x_pos, y_pos, Rgb([value, value, value]));
            }
        }
    }
}

fn blit_rgb(canvas: &mut RgbImage, src: &RgbImage, left: u32) {
    for (x_pos, y_pos, pixel) in src.enumerate_pixels() {
        canvas.put_pixel(left + x_pos, y_pos, *pixel);
    }
}
