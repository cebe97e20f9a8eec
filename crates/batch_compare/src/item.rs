//! Submitted items and their results.

use crate::error::{ConfigError, Result};
use raster_compare::{CompareError, ComparisonOutcome, ComparisonRequest, RasterImage};
use serde::Serialize;
use std::collections::HashSet;

/// One comparison request with its stable position in the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub index: usize,
    pub request: ComparisonRequest,
}

impl BatchItem {
    #[inline]
    #[must_use]
    pub const fn new(index: usize, request: ComparisonRequest) -> Self {
        Self { index, request }
    }

    /// Build items from `(label, expected, actual)` triples, indexing them in
    /// iteration order and applying one tolerance to all of them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Tolerance`] if `tolerance` is outside `[0.0, 1.0]`.
    pub fn from_pairs<I, L>(pairs: I, tolerance: f64) -> Result<Vec<Self>>
    where
        I: IntoIterator<Item = (L, RasterImage, RasterImage)>,
        L: Into<String>,
    {
        pairs
            .into_iter()
            .enumerate()
            .map(|(index, (label, expected, actual))| {
                ComparisonRequest::new(expected, actual, label, tolerance)
                    .map(|request| Self::new(index, request))
                    .map_err(|err| match err {
                        CompareError::InvalidTolerance(value) => ConfigError::Tolerance(value),
                        _ => ConfigError::Tolerance(tolerance),
                    })
            })
            .collect()
    }
}

/// Terminal record for one submitted item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub index: usize,
    pub label: String,
    #[serde(flatten)]
    pub outcome: ComparisonOutcome,
    /// Comparison attempts made; zero when the item never started.
    pub attempts: u32,
}

/// Reject item lists that reuse an index.
pub(crate) fn check_unique_indices(items: &[BatchItem]) -> Result<()> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.index) {
            return Err(ConfigError::DuplicateIndex(item.index));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_pairs_indexes_in_order() -> anyhow::Result<()> {
        let pairs = ["a", "b", "c"]
            .into_iter()
            .map(|label| (label, RasterImage::blank(2, 2), RasterImage::blank(2, 2)));
        let items = BatchItem::from_pairs(pairs, 0.1)?;
        let summary: Vec<(usize, &str)> = items
            .iter()
            .map(|item| (item.index, item.request.label()))
            .collect();
        assert_eq!(summary, vec![(0, "a"), (1, "b"), (2, "c")]);
        Ok(())
    }

    #[test]
    fn from_pairs_rejects_tolerance() {
        let pairs = [("a", RasterImage::blank(1, 1), RasterImage::blank(1, 1))];
        assert_eq!(
            BatchItem::from_pairs(pairs, -0.5),
            Err(ConfigError::Tolerance(-0.5))
        );
    }

    #[test]
    fn duplicate_indices_are_rejected() -> anyhow::Result<()> {
        let request = ComparisonRequest::new(
            RasterImage::blank(1, 1),
            RasterImage::blank(1, 1),
            "dup",
            0.0,
        )?;
        let items = vec![
            BatchItem::new(0, request.clone()),
            BatchItem::new(3, request.clone()),
            BatchItem::new(3, request),
        ];
        assert_eq!(
            check_unique_indices(&items),
            Err(ConfigError::DuplicateIndex(3))
        );
        assert_eq!(check_unique_indices(&items[..2]), Ok(()));
        Ok(())
    }

    #[test]
    fn result_serializes_flat() -> anyhow::Result<()> {
        let result = BatchResult {
            index: 4,
            label: "glyph".to_owned(),
            outcome: ComparisonOutcome::TimedOut,
            attempts: 2,
        };
        assert_eq!(
            serde_json::to_string(&result)?,
            r#"{"index":4,"label":"glyph","outcome":"timed_out","attempts":2}"#
        );
        Ok(())
    }
}
