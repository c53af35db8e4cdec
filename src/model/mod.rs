//! Experiment data model
//!
//! ```text
//! Experiment (1) ──< Alternative (N) [ordered, index-stable]
//! ```
//!
//! An [`Experiment`] is a named, ordered collection of [`Alternative`] arms.
//! Arm order is fixed for the experiment's lifetime because visitor
//! assignment is index-based.

mod alternative;
mod experiment;

pub use alternative::Alternative;
pub use experiment::{Experiment, TestStatus, MIN_OBSERVATIONS};

/// Format a fractional rate as a percentage with at most two decimals,
/// trailing zeros trimmed: `0.5` → `"50%"`, `0.33333` → `"33.33%"`.
#[must_use]
pub(crate) fn format_percent(fraction: f64) -> String {
    let fixed = format!("{:.2}", fraction * 100.0);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percent_trims_trailing_zeros() {
        assert_eq!(format_percent(0.5), "50%");
        assert_eq!(format_percent(0.0), "0%");
        assert_eq!(format_percent(1.0), "100%");
        assert_eq!(format_percent(1.0 / 3.0), "33.33%");
        assert_eq!(format_percent(0.975), "97.5%");
    }
}
