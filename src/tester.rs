//! Assignment and scoring facade
//!
//! [`SplitTester`] orchestrates one request's worth of A/B work: fetch or
//! create the experiment, pick the visitor's arm, score participation or
//! conversion at most once per visitor, and persist. Rendering the chosen
//! content and carrying the visitor token across requests are the caller's
//! business.

use tracing::debug;

use crate::error::{Error, Result};
use crate::identity::VisitorIdentity;
use crate::model::{Alternative, Experiment};
use crate::registry::{ExperimentRegistry, RegistryStore, SavePolicy};

/// User-agent substrings of known automated crawlers. Requests matching
/// any of these (or carrying no agent string at all) are served their arm
/// but never scored.
pub const BOT_SIGNATURES: [&str; 11] = [
    "Googlebot",
    "Slurp",
    "msnbot",
    "nagios",
    "Baiduspider",
    "Sogou",
    "SiteUptime.com",
    "Python",
    "DotBot",
    "Feedfetcher",
    "Jeeves",
];

/// Whether a request looks like an automated crawler. A missing or empty
/// agent string counts as a bot.
#[must_use]
pub fn is_bot_request(user_agent: Option<&str>) -> bool {
    match user_agent {
        None => true,
        Some(agent) if agent.is_empty() => true,
        Some(agent) => BOT_SIGNATURES.iter().any(|bot| agent.contains(bot)),
    }
}

/// The per-process A/B testing entry point.
///
/// Wraps an [`ExperimentRegistry`] and applies the per-visitor rules:
/// at-most-once participation, at-most-once conversion, no scoring for
/// bots, and a locked-in winner once a trial completes.
#[derive(Debug)]
pub struct SplitTester {
    registry: ExperimentRegistry,
}

impl SplitTester {
    /// Create a tester over `store`, persisting after every mutation.
    pub fn new(store: impl RegistryStore + 'static) -> Self {
        Self {
            registry: ExperimentRegistry::new(store),
        }
    }

    /// Create a tester with an explicit registry save policy.
    pub fn with_policy(store: impl RegistryStore + 'static, policy: SavePolicy) -> Self {
        Self {
            registry: ExperimentRegistry::with_policy(store, policy),
        }
    }

    /// The underlying registry, for reporting UIs that want raw access.
    #[must_use]
    pub const fn registry(&self) -> &ExperimentRegistry {
        &self.registry
    }

    /// Fetch or atomically create the named experiment. Empty entries in
    /// `arm_names` get synthesized `"Alternative N"` names (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when creating with an empty
    /// `arm_names`.
    pub fn get_or_create_experiment(&self, name: &str, arm_names: &[&str]) -> Result<Experiment> {
        let contents = arm_names.iter().enumerate().map(|(i, arm)| {
            if arm.trim().is_empty() {
                format!("Alternative {}", i + 1)
            } else {
                (*arm).to_string()
            }
        });
        self.registry.get_or_create(name, contents)
    }

    /// Fetch or atomically create the named experiment with `arm_count`
    /// synthesized arms named `"Alternative 1"` through `"Alternative N"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `arm_count` is zero.
    pub fn get_or_create_with_count(&self, name: &str, arm_count: usize) -> Result<Experiment> {
        self.registry
            .get_or_create(name, (1..=arm_count).map(|i| format!("Alternative {i}")))
    }

    /// Pick the arm to show this visitor.
    ///
    /// A completed trial always returns its best arm and touches neither
    /// counters nor visitor state - the winner is locked in. Otherwise the
    /// visitor's deterministic arm is returned; on the visitor's first
    /// sighting of this experiment (and only for non-bot requests) the
    /// arm's participation is scored, the visitor is marked as having seen
    /// the experiment, and the registry is persisted. Check
    /// [`VisitorIdentity::is_dirty`] afterwards to know whether the token
    /// needs re-encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an experiment with no arms, which
    /// normal construction paths never produce.
    pub fn pick_alternative(
        &self,
        experiment: &Experiment,
        visitor: &mut VisitorIdentity,
        user_agent: Option<&str>,
    ) -> Result<Alternative> {
        // complete the trial as soon as the sample is in: the winner stays
        // the winner even for visitors originally assigned elsewhere
        if experiment.is_complete() {
            return experiment
                .best_alternative()
                .cloned()
                .ok_or_else(armless);
        }

        let index = experiment.assigned_index(visitor.id());
        let mut choice = experiment
            .alternatives()
            .get(index)
            .cloned()
            .ok_or_else(armless)?;

        if !visitor.has_seen(experiment.name()) && !is_bot_request(user_agent) {
            choice.record_participation();
            visitor.mark_seen(experiment.name());
            self.registry.record_participation(experiment.name(), index);
            debug!(
                experiment = experiment.name(),
                arm = index,
                visitor = visitor.id(),
                "first sighting scored"
            );
        }

        Ok(choice)
    }

    /// Score a conversion for this visitor, at most once per experiment.
    ///
    /// No-op unless the visitor has seen the named experiment and has not
    /// already converted for it. The visitor's arm is re-derived from the
    /// same deterministic formula used at assignment time.
    pub fn score_conversion(&self, name: &str, visitor: &mut VisitorIdentity) {
        if !visitor.has_seen(name) || visitor.has_converted(name) {
            // not part of the test, or already scored
            return;
        }
        let Some(experiment) = self.registry.get(name) else {
            return;
        };

        let index = experiment.assigned_index(visitor.id());
        self.registry.record_conversion(name, index);
        visitor.mark_converted(name);
        debug!(
            experiment = name,
            arm = index,
            visitor = visitor.id(),
            "conversion scored"
        );
    }

    /// Remove the named experiment, persisting the registry. Returns
    /// whether an entry was actually removed.
    pub fn delete_experiment(&self, name: &str) -> bool {
        self.registry.delete(name)
    }

    /// A snapshot of the named experiment, for reporting.
    #[must_use]
    pub fn experiment(&self, name: &str) -> Option<Experiment> {
        self.registry.get(name)
    }

    /// Snapshots of every experiment, ordered by name.
    #[must_use]
    pub fn experiments(&self) -> Vec<Experiment> {
        self.registry.experiments()
    }
}

fn armless() -> Error {
    Error::Validation("experiment has no alternatives".to_string())
}
