//! One request, one outcome.
//!
//! [`ComparisonUnit`] composes the pixel comparator and the diff renderer. It
//! takes its request by value so every invocation owns its own images and
//! drops them on return.

use crate::comparator::{PixelComparator, check_tolerance};
use crate::error::{CompareError, Result};
use crate::outcome::ComparisonOutcome;
use crate::raster::RasterImage;
use crate::render::DiffRenderer;

/// A pair of images to compare, with a label and tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRequest {
    expected: RasterImage,
    actual: RasterImage,
    label: String,
    tolerance: f64,
}

impl ComparisonRequest {
    /// # Errors
    ///
    /// Returns [`CompareError::InvalidTolerance`] when `tolerance` is outside
    /// `[0.0, 1.0]`.
    pub fn new(
        expected: RasterImage,
        actual: RasterImage,
        label: impl Into<String>,
        tolerance: f64,
    ) -> Result<Self> {
        Ok(Self {
            expected,
            actual,
            label: label.into(),
            tolerance: check_tolerance(tolerance)?,
        })
    }

    #[inline]
    #[must_use]
    pub const fn expected(&self) -> &RasterImage {
        &self.expected
    }

    #[inline]
    #[must_use]
    pub const fn actual(&self) -> &RasterImage {
        &self.actual
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub const fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

/// Which artifact the unit renders for completed comparisons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArtifactStyle {
    /// Same-size highlighted diff map.
    #[default]
    Overlay,
    /// Expected, actual, diff and statistics panels.
    Composite,
}

/// Comparator + renderer packaged as a single operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComparisonUnit {
    pub comparator: PixelComparator,
    pub renderer: DiffRenderer,
    pub style: ArtifactStyle,
}

impl ComparisonUnit {
    /// Builds a unit whose renderer shares the comparator's intensity threshold.
    #[must_use]
    pub fn new(comparator: PixelComparator, style: ArtifactStyle) -> Self {
        Self {
            comparator,
            renderer: DiffRenderer {
                comparator,
                ..DiffRenderer::default()
            },
            style,
        }
    }

    /// Runs the comparison and renders the artifact.
    ///
    /// A size mismatch short-circuits to `Failed` without rendering. Any
    /// completed comparison is rendered, matched or not.
    #[must_use]
    pub fn evaluate(&self, request: ComparisonRequest) -> ComparisonOutcome {
        let ComparisonRequest {
            expected,
            actual,
            tolerance,
            ..
        } = request;

        let comparison = match self.comparator.compare(&expected, &actual, tolerance) {
            Ok(comparison) => comparison,
            Err(err @ CompareError::SizeMismatch { .. }) => {
                return ComparisonOutcome::failed(err.to_string());
            }
            Err(err) => return ComparisonOutcome::failed(format!("comparison failed: {err}")),
        };

        let statistics = comparison.statistics;
        let artifact = match self.style {
            ArtifactStyle::Overlay => self.renderer.render(&expected, &actual),
            ArtifactStyle::Composite => {
                self.renderer.render_composite(&expected, &actual, &statistics)
            }
        };

        if comparison.matched {
            ComparisonOutcome::Matched {
                statistics,
                artifact,
            }
        } else {
            ComparisonOutcome::Mismatched {
                statistics,
                artifact,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactKind;
    use crate::outcome::OutcomeTag;
    use crate::raster::INK;

    #[test]
    fn request_rejects_out_of_range_tolerance() {
        let img = RasterImage::blank(2, 2);
        let res = ComparisonRequest::new(img.clone(), img, "sym", 1.01);
        assert!(matches!(res, Err(CompareError::InvalidTolerance(_))));
    }

    #[test]
    fn size_mismatch_fails_without_artifact() -> anyhow::Result<()> {
        let request = ComparisonRequest::new(
            RasterImage::blank(4, 4),
            RasterImage::blank(4, 5),
            "sym",
            0.5,
        )?;
        let outcome = ComparisonUnit::default().evaluate(request);
        let ComparisonOutcome::Failed { reason } = &outcome else {
            anyhow::bail!("expected failure, got {outcome:?}");
        };
        assert!(reason.starts_with("size mismatch"));
        assert!(outcome.artifact().is_none());
        Ok(())
    }

    #[test]
    fn matched_pairs_still_get_an_artifact() -> anyhow::Result<()> {
        let img = RasterImage::blank(10, 10);
        let request = ComparisonRequest::new(img.clone(), img, "sym", 0.01)?;
        let outcome = ComparisonUnit::default().evaluate(request);
        assert_eq!(outcome.tag(), OutcomeTag::Matched);
        assert_eq!(
            outcome.artifact().map(|artifact| artifact.kind()),
            Some(ArtifactKind::Overlay)
        );
        Ok(())
    }

    #[test]
    fn composite_style_is_honoured() -> anyhow::Result<()> {
        let expected = RasterImage::blank(6, 6);
        let actual = expected.clone().with_pixel(1, 1, INK);
        let request = ComparisonRequest::new(expected, actual, "sym", 0.0)?;
        let unit = ComparisonUnit::new(PixelComparator::default(), ArtifactStyle::Composite);
        let outcome = unit.evaluate(request);
        assert_eq!(outcome.tag(), OutcomeTag::Mismatched);
        assert_eq!(
            outcome.artifact().map(|artifact| artifact.kind()),
            Some(ArtifactKind::Composite)
        );
        Ok(())
    }

    #[test]
    fn renderer_uses_comparator_threshold() -> anyhow::Result<()> {
        let expected = RasterImage::filled(3, 3, 100);
        let actual = RasterImage::filled(3, 3, 103);
        let request = ComparisonRequest::new(expected, actual, "sym", 0.0)?;
        let unit = ComparisonUnit::new(PixelComparator::new(5), ArtifactStyle::Overlay);
        let outcome = unit.evaluate(request);
        assert_eq!(outcome.tag(), OutcomeTag::Matched);
        let highlighted = outcome
            .artifact()
            .is_some_and(|artifact| artifact.image().pixels().any(|px| px.0 == [255, 0, 0]));
        assert!(!highlighted);
        Ok(())
    }
}
