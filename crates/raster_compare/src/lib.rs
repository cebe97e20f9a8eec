//! Grayscale raster comparison and diff rendering.
//!
//! This crate holds the per-pair half of the comparison engine: a pixel
//! comparator that produces [`ComparisonStatistics`], a renderer that turns an
//! image pair into a [`DiffArtifact`], and [`ComparisonUnit`], which packages
//! both into a single request -> outcome operation. Batch scheduling lives in
//! the `batch_compare` crate.

pub mod artifact;
pub mod comparator;
pub mod error;
pub mod glyphs;
pub mod outcome;
pub mod raster;
pub mod render;
pub mod statistics;
pub mod unit;

pub use artifact::{ArtifactKind, DiffArtifact};
pub use comparator::{PixelComparator, PixelComparison, check_dimensions, check_tolerance};
pub use error::{CompareError, Result};
pub use outcome::{ComparisonOutcome, OutcomeTag};
pub use raster::{BACKGROUND, INK, RasterImage};
pub use render::{DiffRenderer, HIGHLIGHT, statistics_lines};
pub use statistics::ComparisonStatistics;
pub use unit::{ArtifactStyle, ComparisonRequest, ComparisonUnit};
