//! Alternative - one arm of an experiment with its exposure counters

use serde::{Deserialize, Serialize};

use super::format_percent;

/// One arm of an experiment: the content shown to assigned visitors plus
/// raw participation and conversion counters.
///
/// `conversions <= participants` is a caller responsibility and is not
/// enforced here. All rates are derived on demand, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alternative {
    content: String,
    participants: u32,
    conversions: u32,
}

impl Alternative {
    /// Create a new arm with zeroed counters.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            participants: 0,
            conversions: 0,
        }
    }

    /// The content this arm serves.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Number of visitors counted toward this arm's exposure.
    #[must_use]
    pub const fn participants(&self) -> u32 {
        self.participants
    }

    /// Number of tracked success events attributed to this arm.
    #[must_use]
    pub const fn conversions(&self) -> u32 {
        self.conversions
    }

    /// Alias for `conversions` - the success count in test terminology.
    #[must_use]
    pub const fn successes(&self) -> u32 {
        self.conversions
    }

    /// `participants - conversions`, saturating since the counter invariant
    /// is not enforced.
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.participants.saturating_sub(self.conversions)
    }

    /// The success proportion for this arm, `0.0` when no one has
    /// participated yet.
    #[must_use]
    pub fn conversion_rate(&self) -> f64 {
        if self.participants == 0 {
            0.0
        } else {
            f64::from(self.conversions) / f64::from(self.participants)
        }
    }

    /// Conversion rate formatted like `"3.22%"`.
    #[must_use]
    pub fn pretty_conversion_rate(&self) -> String {
        format_percent(self.conversion_rate())
    }

    /// Whether this sample satisfies the success/failure condition of the
    /// two-proportion z-test: at least 10 successes and 10 failures.
    #[must_use]
    pub const fn meets_sample_assumptions(&self) -> bool {
        self.successes() >= 10 && self.failures() >= 10
    }

    /// Count one more visitor toward this arm's exposure.
    pub fn record_participation(&mut self) {
        self.participants += 1;
    }

    /// Count one more success event for this arm.
    pub fn record_conversion(&mut self) {
        self.conversions += 1;
    }

    #[cfg(test)]
    pub(crate) fn with_counts(content: &str, participants: u32, conversions: u32) -> Self {
        Self {
            content: content.to_string(),
            participants,
            conversions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_arm_is_zeroed() {
        let arm = Alternative::new("green button");
        assert_eq!(arm.content(), "green button");
        assert_eq!(arm.participants(), 0);
        assert_eq!(arm.conversions(), 0);
        assert!((arm.conversion_rate() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_counters_increment_independently() {
        let mut arm = Alternative::new("a");
        arm.record_participation();
        arm.record_participation();
        arm.record_conversion();

        assert_eq!(arm.participants(), 2);
        assert_eq!(arm.conversions(), 1);
        assert_eq!(arm.successes(), 1);
        assert_eq!(arm.failures(), 1);
    }

    #[test]
    fn test_conversion_rate_bounds() {
        let arm = Alternative::with_counts("a", 100, 30);
        assert!((arm.conversion_rate() - 0.3).abs() < 1e-12);
        assert_eq!(arm.pretty_conversion_rate(), "30%");

        let arm = Alternative::with_counts("a", 3, 1);
        assert_eq!(arm.pretty_conversion_rate(), "33.33%");
    }

    #[test]
    fn test_sample_assumptions_require_ten_each() {
        assert!(Alternative::with_counts("a", 20, 10).meets_sample_assumptions());
        assert!(!Alternative::with_counts("a", 19, 10).meets_sample_assumptions());
        assert!(!Alternative::with_counts("a", 20, 9).meets_sample_assumptions());
    }

    #[test]
    fn test_failures_saturate_when_invariant_broken() {
        let arm = Alternative::with_counts("a", 1, 5);
        assert_eq!(arm.failures(), 0);
    }

    #[test]
    fn test_serde_round_trip() {
        let arm = Alternative::with_counts("blue", 42, 7);
        let json = serde_json::to_string(&arm).expect("serialize");
        let back: Alternative = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(arm, back);
    }
}
