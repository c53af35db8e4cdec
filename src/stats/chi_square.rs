//! Chi-square test of homogeneity for experiments with three or more arms

use crate::error::Result;
use crate::model::Experiment;

use super::{significance_clause, DEFAULT_SIGNIFICANCE_LEVEL};

/// Highest degrees-of-freedom row the table carries. Six arms give df = 5;
/// experiments with more arms are clamped to this row, which understates
/// the bar for significance. Extend the table before relying on results
/// for seven or more arms.
const MAX_DEGREES_OF_FREEDOM: usize = 5;

/// Right-tail critical values indexed by `degrees of freedom - 1`. Each row
/// is `(tail probability, critical chi-square)`, ordered loosest to
/// strictest; the lookup scans from the strictest entry and returns the
/// first tail probability whose critical value the statistic exceeds.
const CHI_TABLE: [[(f64, f64); 5]; MAX_DEGREES_OF_FREEDOM] = [
    [
        (0.1, 2.706),
        (0.05, 3.841),
        (0.025, 5.024),
        (0.01, 6.635),
        (0.005, 7.879),
    ],
    [
        (0.1, 4.605),
        (0.05, 5.991),
        (0.025, 7.378),
        (0.01, 9.210),
        (0.005, 10.597),
    ],
    [
        (0.1, 6.251),
        (0.05, 7.815),
        (0.025, 9.348),
        (0.01, 11.345),
        (0.005, 12.838),
    ],
    [
        (0.1, 7.779),
        (0.05, 9.488),
        (0.025, 11.143),
        (0.01, 13.277),
        (0.005, 14.860),
    ],
    [
        (0.1, 9.236),
        (0.05, 11.070),
        (0.025, 12.833),
        (0.01, 15.086),
        (0.005, 16.750),
    ],
];

/// Chi-square test of homogeneity over the success/failure cells of every
/// arm, against the pooled rate.
///
/// The outcome is always yes/no, so the contingency table is `arms x 2`
/// and degrees of freedom reduce to `arm_count - 1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiArmChiSquareTest;

impl MultiArmChiSquareTest {
    /// Assumptions the experimenter should verify by hand.
    pub const ASSUMPTIONS: &'static [&'static str] = &[
        "Counted data condition",
        "Randomization condition",
        "10% condition",
        "Expected cell frequency condition (checked automatically)",
    ];

    /// Bucketed p-value. Degenerate inputs (no participants anywhere, or a
    /// pooled rate of exactly 0 or 1) return `1.0` - there is no evidence
    /// of a difference to weigh.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` keeps the engine's dispatch surface
    /// uniform with the z-test.
    pub fn p_value(&self, experiment: &Experiment) -> Result<f64> {
        let (p, _) = self.p_value_with_assumptions(experiment);
        Ok(p)
    }

    /// As [`Self::p_value`], also reporting whether the expected cell
    /// frequency condition held (every expected cell >= 5).
    #[must_use]
    pub fn p_value_with_assumptions(&self, experiment: &Experiment) -> (f64, bool) {
        let mut assumptions_upheld = true;

        let participants = experiment.participants();
        if participants == 0 {
            return (1.0, assumptions_upheld);
        }

        #[allow(clippy::cast_precision_loss)]
        let total = participants as f64;
        #[allow(clippy::cast_precision_loss)]
        let successes = experiment.conversions() as f64;

        // pooled success/failure proportions across all arms
        let p_hat = successes / total;
        let q_hat = 1.0 - p_hat;
        if p_hat == 0.0 || q_hat == 0.0 {
            return (1.0, assumptions_upheld);
        }

        // chi^2 = sum over all cells of (observed - expected)^2 / expected
        let mut chi_square = 0.0;
        for arm in experiment.alternatives() {
            let n = f64::from(arm.participants());

            let expected_successes = n * p_hat;
            if expected_successes < 5.0 {
                assumptions_upheld = false;
            }
            let observed_successes = f64::from(arm.successes());
            chi_square +=
                (observed_successes - expected_successes).powi(2) / expected_successes;

            let expected_failures = n * q_hat;
            if expected_failures < 5.0 {
                assumptions_upheld = false;
            }
            let observed_failures = f64::from(arm.failures());
            chi_square += (observed_failures - expected_failures).powi(2) / expected_failures;
        }

        (
            Self::lookup_p_value(chi_square, experiment.arm_count()),
            assumptions_upheld,
        )
    }

    /// Whether the arms differ significantly at the default 0.05 level.
    #[must_use]
    pub fn is_significant(&self, experiment: &Experiment) -> bool {
        self.is_significant_at(experiment, DEFAULT_SIGNIFICANCE_LEVEL)
    }

    /// Whether the p-value is at or below `threshold`.
    #[must_use]
    pub fn is_significant_at(&self, experiment: &Experiment, threshold: f64) -> bool {
        self.p_value(experiment).is_ok_and(|p| p <= threshold)
    }

    /// Human-readable outcome summary naming the best arm with raw counts
    /// and formatted rate, with a caution when the expected cell frequency
    /// condition failed.
    #[must_use]
    pub fn result_description(&self, experiment: &Experiment) -> String {
        let (p, assumptions_upheld) = self.p_value_with_assumptions(experiment);

        let mut out = String::new();
        if !assumptions_upheld {
            out.push_str(
                "Caution: the sample did not conform to the expected cell frequency \
                 condition! ",
            );
        }

        let Some(best) = experiment.best_alternative() else {
            return out;
        };

        out.push_str(&format!(
            "The best alternative you have is: [{}], which had {} conversions from {} \
             participants ({}). ",
            best.content(),
            best.conversions(),
            best.participants(),
            best.pretty_conversion_rate(),
        ));

        if (p - 1.0).abs() < f64::EPSILON {
            out.push_str("However, this result is not statistically significant.");
        } else {
            out.push_str(&significance_clause(p));
        }

        out
    }

    fn lookup_p_value(chi_square: f64, arm_count: usize) -> f64 {
        // yes/no outcomes fix the second table dimension at 2, so
        // df = (arms - 1) * (2 - 1)
        let degrees_of_freedom = arm_count
            .saturating_sub(1)
            .clamp(1, MAX_DEGREES_OF_FREEDOM);

        let row = &CHI_TABLE[degrees_of_freedom - 1];
        for &(p, critical) in row.iter().rev() {
            if chi_square > critical {
                return p;
            }
        }

        1.0
    }
}
