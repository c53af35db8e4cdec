//! Significance engine
//!
//! Two table-driven hypothesis tests, selected purely by arm count:
//!
//! - exactly two arms: [`TwoArmZTest`] (pooled two-proportion z-test)
//! - three or more arms: [`MultiArmChiSquareTest`]
//!
//! Both return *bucketed* p-values looked up from fixed critical-value
//! tables ordered loosest to strictest; the reverse lookup scans from the
//! strictest entry and returns the first bucket whose critical value the
//! statistic clears. There is no continuous p-value computation.

mod chi_square;

pub use chi_square::MultiArmChiSquareTest;
pub use z_test::TwoArmZTest;

use crate::error::{Error, Result};
use crate::model::Experiment;

/// Default threshold for "is this significant?" questions.
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Which hypothesis test applies to an experiment, chosen by arm count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignificanceTest {
    /// Fewer than two arms: nothing to compare.
    NotApplicable,
    /// Exactly two arms.
    TwoArmZTest,
    /// Three or more arms.
    MultiArmChiSquare,
}

impl SignificanceTest {
    /// Select the applicable test for `arm_count` arms.
    #[must_use]
    pub const fn for_arm_count(arm_count: usize) -> Self {
        match arm_count {
            0 | 1 => Self::NotApplicable,
            2 => Self::TwoArmZTest,
            _ => Self::MultiArmChiSquare,
        }
    }

    /// Human-readable test name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NotApplicable => "None",
            Self::TwoArmZTest => "Two-proportion z-test",
            Self::MultiArmChiSquare => "Chi-square test",
        }
    }

    /// Bucketed p-value for the experiment's observed differences.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the selected test's preconditions
    /// are not met.
    pub fn p_value(self, experiment: &Experiment) -> Result<f64> {
        match self {
            Self::NotApplicable => Err(not_applicable()),
            Self::TwoArmZTest => TwoArmZTest.p_value(experiment),
            Self::MultiArmChiSquare => MultiArmChiSquareTest.p_value(experiment),
        }
    }

    /// Whether the experiment is significant at the default 0.05 level.
    #[must_use]
    pub fn is_significant(self, experiment: &Experiment) -> bool {
        self.is_significant_at(experiment, DEFAULT_SIGNIFICANCE_LEVEL)
    }

    /// Whether the experiment's p-value is at or below `threshold`.
    #[must_use]
    pub fn is_significant_at(self, experiment: &Experiment, threshold: f64) -> bool {
        self.p_value(experiment).is_ok_and(|p| p <= threshold)
    }

    /// Human-readable outcome summary. Precondition failures are folded
    /// into the returned text, never surfaced as errors.
    #[must_use]
    pub fn result_description(self, experiment: &Experiment) -> String {
        match self {
            Self::NotApplicable => not_applicable().to_string(),
            Self::TwoArmZTest => TwoArmZTest.result_description(experiment),
            Self::MultiArmChiSquare => MultiArmChiSquareTest.result_description(experiment),
        }
    }

    /// Assumptions the experimenter should verify by hand for this test.
    #[must_use]
    pub const fn assumptions(self) -> &'static [&'static str] {
        match self {
            Self::NotApplicable => &[],
            Self::TwoArmZTest => TwoArmZTest::ASSUMPTIONS,
            Self::MultiArmChiSquare => MultiArmChiSquareTest::ASSUMPTIONS,
        }
    }
}

fn not_applicable() -> Error {
    Error::Validation(
        "significance testing needs at least two alternatives to compare".to_string(),
    )
}

/// Qualitative confidence phrases keyed by tabulated p-value bucket.
const CONFIDENCE_PHRASES: [(f64, &str); 7] = [
    (0.10, "fairly confident"),
    (0.05, "confident"),
    (0.025, "very confident"),
    (0.01, "very confident"),
    (0.005, "extremely confident"),
    (0.001, "extremely confident"),
    (0.0, "completely confident"),
];

/// The confidence phrase for a tabulated p-value bucket.
pub(crate) fn confidence_phrase(p: f64) -> &'static str {
    CONFIDENCE_PHRASES
        .iter()
        .find(|(bucket, _)| (bucket - p).abs() < 1e-9)
        .map_or("confident", |(_, phrase)| phrase)
}

/// `(1 - p)` as a trimmed percentage string, e.g. `0.025` → `"97.5%"`.
pub(crate) fn confidence_percent(p: f64) -> String {
    crate::model::format_percent(1.0 - p)
}

/// The shared significance clause appended to both tests' descriptions
/// when the difference is significant.
pub(crate) fn significance_clause(p: f64) -> String {
    format!(
        "This difference is {} likely to be statistically significant (p <= {p}), \
         which means you can be {} that it is the result of your alternatives actually \
         mattering, rather than being due to random chance. However, this statistical \
         test can't measure how likely the currently observed magnitude of the \
         difference is to be accurate or not. It only says \"better\", not \"better by \
         so much\".",
        confidence_percent(p),
        confidence_phrase(p),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_by_arm_count() {
        assert_eq!(
            SignificanceTest::for_arm_count(0),
            SignificanceTest::NotApplicable
        );
        assert_eq!(
            SignificanceTest::for_arm_count(1),
            SignificanceTest::NotApplicable
        );
        assert_eq!(
            SignificanceTest::for_arm_count(2),
            SignificanceTest::TwoArmZTest
        );
        assert_eq!(
            SignificanceTest::for_arm_count(3),
            SignificanceTest::MultiArmChiSquare
        );
        assert_eq!(
            SignificanceTest::for_arm_count(12),
            SignificanceTest::MultiArmChiSquare
        );
    }

    #[test]
    fn test_confidence_phrases() {
        assert_eq!(confidence_phrase(0.10), "fairly confident");
        assert_eq!(confidence_phrase(0.05), "confident");
        assert_eq!(confidence_phrase(0.025), "very confident");
        assert_eq!(confidence_phrase(0.01), "very confident");
        assert_eq!(confidence_phrase(0.005), "extremely confident");
        assert_eq!(confidence_phrase(0.001), "extremely confident");
        assert_eq!(confidence_phrase(0.0), "completely confident");
    }

    #[test]
    fn test_confidence_percent_is_trimmed() {
        assert_eq!(confidence_percent(0.05), "95%");
        assert_eq!(confidence_percent(0.025), "97.5%");
        assert_eq!(confidence_percent(0.001), "99.9%");
        assert_eq!(confidence_percent(0.0), "100%");
    }
}
