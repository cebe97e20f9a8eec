//! Terminal outcome of comparing one image pair.

use crate::artifact::DiffArtifact;
use crate::statistics::ComparisonStatistics;
use serde::Serialize;

/// Exactly one of these holds for every compared item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    /// Difference fraction within tolerance.
    Matched {
        statistics: ComparisonStatistics,
        #[serde(skip)]
        artifact: DiffArtifact,
    },
    /// Difference fraction above tolerance.
    Mismatched {
        statistics: ComparisonStatistics,
        #[serde(skip)]
        artifact: DiffArtifact,
    },
    /// The comparison could not be performed.
    Failed { reason: String },
    /// The comparison exceeded its time budget.
    TimedOut,
    /// The batch was cancelled before this comparison could run.
    Cancelled,
}

/// Field-less discriminant of [`ComparisonOutcome`], used for tallying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeTag {
    Matched,
    Mismatched,
    Failed,
    TimedOut,
    Cancelled,
}

impl ComparisonOutcome {
    /// Builds a `Failed` outcome from anything printable.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn tag(&self) -> OutcomeTag {
        match self {
            Self::Matched { .. } => OutcomeTag::Matched,
            Self::Mismatched { .. } => OutcomeTag::Mismatched,
            Self::Failed { .. } => OutcomeTag::Failed,
            Self::TimedOut => OutcomeTag::TimedOut,
            Self::Cancelled => OutcomeTag::Cancelled,
        }
    }

    /// True for outcomes where the comparison itself ran to completion.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Matched { .. } | Self::Mismatched { .. })
    }

    /// True for outcomes that an opt-in retry policy may attempt again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::TimedOut)
    }

    #[must_use]
    pub const fn statistics(&self) -> Option<&ComparisonStatistics> {
        match self {
            Self::Matched { statistics, .. } | Self::Mismatched { statistics, .. } => {
                Some(statistics)
            }
            Self::Failed { .. } | Self::TimedOut | Self::Cancelled => None,
        }
    }

    #[must_use]
    pub const fn artifact(&self) -> Option<&DiffArtifact> {
        match self {
            Self::Matched { artifact, .. } | Self::Mismatched { artifact, .. } => Some(artifact),
            Self::Failed { .. } | Self::TimedOut | Self::Cancelled => None,
        }
    }
}
