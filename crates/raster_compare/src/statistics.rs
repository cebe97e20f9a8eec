//! Summary figures for one pixel comparison.

use serde::Serialize;

/// Per-pixel difference summary for one image pair.
///
/// Always fully populated: values are derived from a single accumulation pass
/// and never updated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComparisonStatistics {
    /// Number of compared samples.
    pub total_pixels: u64,
    /// Samples whose difference exceeded the intensity threshold.
    pub different_pixels: u64,
    /// Largest absolute difference seen.
    pub max_error: u8,
    /// Sum of absolute differences divided by `total_pixels`.
    pub mean_error: f64,
    /// Share of differing pixels, in percent.
    pub difference_percent: f64,
    /// `100 - difference_percent`.
    pub similarity_percent: f64,
}

impl ComparisonStatistics {
    /// Statistics for a pair of empty images.
    pub const EMPTY: Self = Self {
        total_pixels: 0,
        different_pixels: 0,
        max_error: 0,
        mean_error: 0.0,
        difference_percent: 0.0,
        similarity_percent: 100.0,
    };

    /// Builds the derived fields from raw accumulator values.
    #[must_use]
    pub fn from_totals(
        total_pixels: u64,
        different_pixels: u64,
        max_error: u8,
        error_sum: u64,
    ) -> Self {
        if total_pixels == 0 {
            return Self::EMPTY;
        }
        let total = total_pixels as f64;
        let difference_percent = different_pixels as f64 / total * 100.0;
        Self {
            total_pixels,
            different_pixels,
            max_error,
            mean_error: error_sum as f64 / total,
            difference_percent,
            similarity_percent: 100.0 - difference_percent,
        }
    }

    /// Fraction of differing pixels in `[0.0, 1.0]`, the quantity compared against tolerance.
    #[must_use]
    pub fn difference_fraction(&self) -> f64 {
        if self.total_pixels == 0 {
            0.0
        } else {
            self.different_pixels as f64 / self.total_pixels as f64
        }
    }
}
