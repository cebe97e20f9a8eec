//! Tolerance-based pixel comparison.
//!
//! The comparator walks both images once, counting samples whose absolute
//! difference exceeds an intensity threshold and accumulating the maximum and
//! total error. A pair matches when the fraction of differing samples is at
//! most the requested tolerance.

use crate::error::{CompareError, Result};
use crate::raster::RasterImage;
use crate::statistics::ComparisonStatistics;

/// Statistics plus the match verdict for one comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelComparison {
    pub statistics: ComparisonStatistics,
    pub matched: bool,
}

/// Compares grayscale rasters sample by sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelComparator {
    /// A sample differs when its absolute difference is strictly greater than this.
    pub intensity_threshold: u8,
}

impl PixelComparator {
    #[inline]
    #[must_use]
    pub const fn new(intensity_threshold: u8) -> Self {
        Self {
            intensity_threshold,
        }
    }

    /// Compares `actual` against `expected` with the given tolerance.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::InvalidTolerance`] for a tolerance outside
    /// `[0.0, 1.0]`, and [`CompareError::SizeMismatch`] when the dimensions
    /// differ. A size mismatch is never treated as similar.
    pub fn compare(
        &self,
        expected: &RasterImage,
        actual: &RasterImage,
        tolerance: f64,
    ) -> Result<PixelComparison> {
        let tolerance = check_tolerance(tolerance)?;
        check_dimensions(expected, actual)?;

        if expected.is_empty() {
            return Ok(PixelComparison {
                statistics: ComparisonStatistics::EMPTY,
                matched: true,
            });
        }

        let mut different_pixels = 0u64;
        let mut max_error = 0u8;
        let mut error_sum = 0u64;
        for (&left, &right) in expected.pixels().iter().zip(actual.pixels()) {
            let diff = left.abs_diff(right);
            if diff > self.intensity_threshold {
                different_pixels += 1;
            }
            max_error = max_error.max(diff);
            error_sum += u64::from(diff);
        }

        let statistics = ComparisonStatistics::from_totals(
            expected.pixel_count() as u64,
            different_pixels,
            max_error,
            error_sum,
        );
        Ok(PixelComparison {
            matched: statistics.difference_fraction() <= tolerance,
            statistics,
        })
    }

    /// True when the pixel pair at a given difference counts as changed.
    #[inline]
    #[must_use]
    pub const fn differs(&self, left: u8, right: u8) -> bool {
        left.abs_diff(right) > self.intensity_threshold
    }
}

/// Validates a tolerance, returning it unchanged when it lies in `[0.0, 1.0]`.
///
/// # Errors
///
/// Returns [`CompareError::InvalidTolerance`] for NaN or out-of-range values.
pub fn check_tolerance(tolerance: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&tolerance) {
        Ok(tolerance)
    } else {
        Err(CompareError::InvalidTolerance(tolerance))
    }
}

/// Fails with [`CompareError::SizeMismatch`] unless both images share dimensions.
///
/// # Errors
///
/// Returns [`CompareError::SizeMismatch`] when width or height differ.
pub fn check_dimensions(expected: &RasterImage, actual: &RasterImage) -> Result<()> {
    if expected.dimensions() == actual.dimensions() {
        Ok(())
    } else {
        Err(CompareError::SizeMismatch {
            expected: expected.dimensions(),
            actual: actual.dimensions(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::INK;

    #[test]
    fn identical_white_images_match() -> anyhow::Result<()> {
        let img = RasterImage::blank(10, 10);
        let cmp = PixelComparator::default().compare(&img, &img.clone(), 0.01)?;
        assert!(cmp.matched);
        assert_eq!(cmp.statistics.total_pixels, 100);
        assert_eq!(cmp.statistics.different_pixels, 0);
        assert!((cmp.statistics.similarity_percent - 100.0).abs() < f64::EPSILON);
        Ok(())
    }

    #[test]
    fn three_differences_exceed_two_percent() -> anyhow::Result<()> {
        let expected = RasterImage::blank(10, 10);
        let actual = expected
            .clone()
            .with_pixel(0, 0, INK)
            .with_pixel(4, 4, INK)
            .with_pixel(9, 9, 200);
        let cmp = PixelComparator::default().compare(&expected, &actual, 0.02)?;
        assert!(!cmp.matched);
        assert_eq!(cmp.statistics.different_pixels, 3);
        assert!((cmp.statistics.difference_percent - 3.0).abs() < 1e-9);
        assert!((cmp.statistics.similarity_percent - 97.0).abs() < 1e-9);
        assert_eq!(cmp.statistics.max_error, 255);
        assert!((cmp.statistics.mean_error - (255.0 + 255.0 + 55.0) / 100.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn tolerance_boundary_is_inclusive() -> anyhow::Result<()> {
        let expected = RasterImage::blank(10, 10);
        let actual = expected.clone().with_pixel(1, 1, INK).with_pixel(2, 2, INK);
        let cmp = PixelComparator::default().compare(&expected, &actual, 0.02)?;
        assert!(cmp.matched);
        Ok(())
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let res = PixelComparator::default().compare(
            &RasterImage::blank(10, 10),
            &RasterImage::blank(10, 11),
            1.0,
        );
        assert!(matches!(
            res,
            Err(CompareError::SizeMismatch {
                expected: (10, 10),
                actual: (10, 11)
            })
        ));
    }

    #[test]
    fn empty_images_are_vacuously_similar() -> anyhow::Result<()> {
        let empty = RasterImage::blank(0, 4);
        let cmp = PixelComparator::default().compare(&empty, &empty.clone(), 0.0)?;
        assert!(cmp.matched);
        assert_eq!(cmp.statistics, ComparisonStatistics::EMPTY);
        Ok(())
    }

    #[test]
    fn threshold_ignores_small_noise() -> anyhow::Result<()> {
        let expected = RasterImage::filled(4, 4, 100);
        let actual = RasterImage::filled(4, 4, 104);
        let strict = PixelComparator::default().compare(&expected, &actual, 0.0)?;
        let loose = PixelComparator::new(8).compare(&expected, &actual, 0.0)?;
        assert!(!strict.matched);
        assert!(loose.matched);
        assert_eq!(loose.statistics.max_error, 4);
        Ok(())
    }

    #[test]
    fn invalid_tolerance_is_rejected() {
        let img = RasterImage::blank(2, 2);
        for bad in [-0.1, 1.5, f64::NAN] {
            let res = PixelComparator::default().compare(&img, &img, bad);
            assert!(matches!(res, Err(CompareError::InvalidTolerance(_))));
        }
    }
}
