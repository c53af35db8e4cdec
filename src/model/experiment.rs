//! Experiment - a named, ordered set of alternatives under trial

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Alternative;
use crate::error::{Error, Result};
use crate::stats::SignificanceTest;

/// Total conversions across all arms at which a trial is considered
/// complete and its winner locked in.
pub const MIN_OBSERVATIONS: u64 = 200;

/// Derived lifecycle state of an experiment. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    /// The trial has gathered enough observations; the winner is locked in.
    Complete,
    /// Still collecting observations.
    Running,
}

/// A named experiment: an ordered sequence of [`Alternative`] arms plus a
/// creation timestamp.
///
/// Arm order is fixed for the experiment's lifetime - visitor assignment is
/// `visitor_key mod arm_count`, so reordering arms would silently reassign
/// every visitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Experiment {
    name: String,
    created_at: DateTime<Utc>,
    alternatives: Vec<Alternative>,
}

impl Experiment {
    /// Create an experiment with one arm per entry of `arm_contents`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `arm_contents` is empty.
    pub fn new<I, S>(name: impl Into<String>, arm_contents: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let alternatives: Vec<Alternative> =
            arm_contents.into_iter().map(Alternative::new).collect();
        if alternatives.is_empty() {
            return Err(Error::Validation(
                "an experiment needs at least one alternative".to_string(),
            ));
        }

        Ok(Self {
            name: name.into(),
            created_at: Utc::now(),
            alternatives,
        })
    }

    /// The experiment's unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When the experiment was first created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The ordered arms of this experiment.
    #[must_use]
    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    /// Number of arms.
    #[must_use]
    pub fn arm_count(&self) -> usize {
        self.alternatives.len()
    }

    /// Total participants across all arms.
    #[must_use]
    pub fn participants(&self) -> u64 {
        self.alternatives
            .iter()
            .map(|a| u64::from(a.participants()))
            .sum()
    }

    /// Total conversions across all arms, regardless of outcome.
    #[must_use]
    pub fn conversions(&self) -> u64 {
        self.alternatives
            .iter()
            .map(|a| u64::from(a.conversions()))
            .sum()
    }

    /// Overall conversion rate across all arms, `0.0` with no participants.
    #[must_use]
    pub fn conversion_rate(&self) -> f64 {
        let participants = self.participants();
        if participants == 0 {
            return 0.0;
        }
        // u64 -> f64 is lossless for any realistic counter value
        #[allow(clippy::cast_precision_loss)]
        let rate = self.conversions() as f64 / participants as f64;
        rate
    }

    /// Overall conversion rate formatted like `"3.22%"`.
    #[must_use]
    pub fn pretty_conversion_rate(&self) -> String {
        super::format_percent(self.conversion_rate())
    }

    /// Whether every arm has at least one participant (a z-test
    /// precondition).
    #[must_use]
    pub fn all_alternatives_have_participants(&self) -> bool {
        self.alternatives.iter().all(|a| a.participants() > 0)
    }

    /// Derived lifecycle state.
    ///
    /// A trial completes once total *conversions* (not participants) reach
    /// [`MIN_OBSERVATIONS`]. Summing conversions undercounts exposure, but
    /// the threshold is kept as-is for compatibility with existing stores.
    #[must_use]
    pub fn status(&self) -> TestStatus {
        if self.conversions() >= MIN_OBSERVATIONS {
            TestStatus::Complete
        } else {
            TestStatus::Running
        }
    }

    /// `true` once [`Self::status`] is [`TestStatus::Complete`].
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status() == TestStatus::Complete
    }

    /// The arm index a visitor key maps to: `visitor_key mod arm_count`,
    /// non-negative even for negative keys. Deterministic for a fixed arm
    /// count.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn assigned_index(&self, visitor_key: i64) -> usize {
        let arms = self.alternatives.len();
        if arms == 0 {
            return 0;
        }
        visitor_key.rem_euclid(arms as i64) as usize
    }

    /// The arm a visitor key maps to, or `None` for an armless experiment
    /// (which [`Self::new`] refuses to construct).
    #[must_use]
    pub fn assigned_alternative(&self, visitor_key: i64) -> Option<&Alternative> {
        self.alternatives.get(self.assigned_index(visitor_key))
    }

    /// The arm with the highest conversion rate. The first arm reaching the
    /// maximum wins ties.
    #[must_use]
    pub fn best_alternative(&self) -> Option<&Alternative> {
        let mut best: Option<&Alternative> = None;
        for arm in &self.alternatives {
            match best {
                Some(b) if arm.conversion_rate() <= b.conversion_rate() => {}
                _ => best = Some(arm),
            }
        }
        best
    }

    /// The arm with the lowest conversion rate. The *last* arm reaching the
    /// minimum wins ties - deliberately asymmetric with
    /// [`Self::best_alternative`], so reports never name the same arm as
    /// both best and worst when all rates are equal.
    #[must_use]
    pub fn worst_alternative(&self) -> Option<&Alternative> {
        let mut worst: Option<&Alternative> = None;
        for arm in &self.alternatives {
            match worst {
                Some(w) if arm.conversion_rate() > w.conversion_rate() => {}
                _ => worst = Some(arm),
            }
        }
        worst
    }

    /// Which hypothesis test applies to this experiment, by arm count.
    #[must_use]
    pub fn significance_test(&self) -> SignificanceTest {
        SignificanceTest::for_arm_count(self.alternatives.len())
    }

    /// Human-readable name of the applicable test.
    #[must_use]
    pub fn significance_test_name(&self) -> &'static str {
        self.significance_test().name()
    }

    /// Bucketed p-value for the difference between this experiment's arms.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the applicable test's
    /// preconditions are not met (fewer than two arms, or a z-test arm
    /// without participants).
    pub fn p_value(&self) -> Result<f64> {
        self.significance_test().p_value(self)
    }

    /// Human-readable summary of the trial's outcome. Precondition failures
    /// are folded into the text rather than returned as errors.
    #[must_use]
    pub fn result_description(&self) -> String {
        self.significance_test().result_description(self)
    }

    /// Assumptions of the applicable test that the experimenter should
    /// verify by hand.
    #[must_use]
    pub fn assumptions_to_check(&self) -> &'static [&'static str] {
        self.significance_test().assumptions()
    }

    /// Mutable access to one arm, for the registry's scoring paths.
    pub(crate) fn alternative_mut(&mut self, index: usize) -> Option<&mut Alternative> {
        self.alternatives.get_mut(index)
    }
}
