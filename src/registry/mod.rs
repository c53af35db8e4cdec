//! Experiment registry - the process-wide persisted experiment map
//!
//! One [`ExperimentRegistry`] per process, shared by reference across
//! request handlers. A single coarse mutex serializes every
//! read-modify-write sequence, so check-construct-insert-persist runs as
//! one atomic unit and concurrent callers can never create two experiments
//! under the same name. Writes are O(1) and rare next to reads; the write
//! contention a coarse lock costs under heavy load is accepted.
//!
//! The registry loads lazily on first access and caches for the process
//! lifetime. A malformed store loads as an empty registry and is
//! immediately re-saved to self-heal; failed saves are logged and
//! swallowed - a lost counter increment is preferable to failing the
//! request that caused it.

mod store;

pub use store::{JsonFileStore, MemoryStore, RegistryStore};

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::Result;
use crate::model::Experiment;

/// When the registry writes its backing store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SavePolicy {
    /// Persist synchronously after every mutation (the default).
    #[default]
    EveryWrite,
    /// Persist at most once per window; mutations inside the window stay
    /// cache-only until the next save. Bounded staleness, less I/O.
    Throttled(Duration),
}

#[derive(Debug)]
struct Inner {
    cache: Option<HashMap<String, Experiment>>,
    last_save: Option<Instant>,
}

/// Lock-guarded, lazily-loaded, persisted mapping of experiment name to
/// [`Experiment`]. Construct one per process and hand it around by
/// reference.
pub struct ExperimentRegistry {
    store: Box<dyn RegistryStore>,
    policy: SavePolicy,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for ExperimentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentRegistry")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ExperimentRegistry {
    /// Create a registry over `store`, persisting on every write.
    pub fn new(store: impl RegistryStore + 'static) -> Self {
        Self::with_policy(store, SavePolicy::EveryWrite)
    }

    /// Create a registry with an explicit [`SavePolicy`].
    pub fn with_policy(store: impl RegistryStore + 'static, policy: SavePolicy) -> Self {
        Self {
            store: Box::new(store),
            policy,
            inner: Mutex::new(Inner {
                cache: None,
                last_save: None,
            }),
        }
    }

    /// A snapshot of the named experiment, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Experiment> {
        let mut inner = self.lock();
        self.loaded(&mut inner).get(name).cloned()
    }

    /// Look up an experiment by name, creating (and persisting) it with the
    /// given arm contents on a miss. Check, construct, insert, and save all
    /// happen under the registry lock.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] when creating with no arms.
    /// Save failures are swallowed, not surfaced.
    pub fn get_or_create<I, S>(&self, name: &str, arm_contents: I) -> Result<Experiment>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.lock();
        let experiments = self.loaded(&mut inner);

        if let Some(existing) = experiments.get(name) {
            return Ok(existing.clone());
        }

        let experiment = Experiment::new(name, arm_contents)?;
        experiments.insert(name.to_string(), experiment.clone());
        debug!(experiment = name, "created experiment");
        self.save_after_write(&mut inner);

        Ok(experiment)
    }

    /// Increment the participant counter of one arm and persist. A missing
    /// experiment or out-of-range index is a no-op.
    pub fn record_participation(&self, name: &str, arm_index: usize) {
        let mut inner = self.lock();
        let experiments = self.loaded(&mut inner);
        let Some(arm) = experiments
            .get_mut(name)
            .and_then(|e| e.alternative_mut(arm_index))
        else {
            return;
        };
        arm.record_participation();
        debug!(experiment = name, arm = arm_index, "scored participation");
        self.save_after_write(&mut inner);
    }

    /// Increment the conversion counter of one arm and persist. A missing
    /// experiment or out-of-range index is a no-op.
    pub fn record_conversion(&self, name: &str, arm_index: usize) {
        let mut inner = self.lock();
        let experiments = self.loaded(&mut inner);
        let Some(arm) = experiments
            .get_mut(name)
            .and_then(|e| e.alternative_mut(arm_index))
        else {
            return;
        };
        arm.record_conversion();
        debug!(experiment = name, arm = arm_index, "scored conversion");
        self.save_after_write(&mut inner);
    }

    /// Remove the named experiment. Persists and returns `true` when an
    /// entry was actually removed.
    pub fn delete(&self, name: &str) -> bool {
        let mut inner = self.lock();
        let removed = self.loaded(&mut inner).remove(name).is_some();
        if removed {
            debug!(experiment = name, "deleted experiment");
            self.save_after_write(&mut inner);
        }
        removed
    }

    /// Snapshots of every experiment, ordered by name for stable reports.
    #[must_use]
    pub fn experiments(&self) -> Vec<Experiment> {
        let mut inner = self.lock();
        let mut all: Vec<Experiment> = self.loaded(&mut inner).values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    /// Number of registered experiments.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut inner = self.lock();
        self.loaded(&mut inner).len()
    }

    /// Whether no experiments are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the backing store now, regardless of save policy. Failures
    /// are logged and swallowed like any other save.
    pub fn flush(&self) {
        let mut inner = self.lock();
        self.loaded(&mut inner);
        self.force_save(&mut inner);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // a panic while holding the lock leaves the cache observable and
        // consistent, so poisoning is recoverable
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn loaded<'a>(&self, inner: &'a mut MutexGuard<'_, Inner>) -> &'a mut HashMap<String, Experiment> {
        if inner.cache.is_none() {
            match self.store.load() {
                Ok(map) => {
                    inner.cache = Some(Self::sanitize(map));
                }
                Err(e) => {
                    // fail open: a corrupt store must not break requests
                    warn!(error = %e, "failed to load experiment registry, starting empty");
                    inner.cache = Some(HashMap::new());
                    // re-save immediately so the store heals itself
                    self.force_save(inner);
                }
            }
        }
        inner
            .cache
            .get_or_insert_with(HashMap::new)
    }

    /// Drop experiments an outside writer left armless; index-based
    /// assignment has nothing to map a visitor onto for them.
    fn sanitize(map: HashMap<String, Experiment>) -> HashMap<String, Experiment> {
        map.into_iter()
            .filter(|(name, experiment)| {
                let keep = !experiment.alternatives().is_empty();
                if !keep {
                    warn!(experiment = %name, "dropping persisted experiment with no alternatives");
                }
                keep
            })
            .collect()
    }

    fn save_after_write(&self, inner: &mut MutexGuard<'_, Inner>) {
        match self.policy {
            SavePolicy::EveryWrite => self.force_save(inner),
            SavePolicy::Throttled(window) => {
                let due = inner.last_save.map_or(true, |at| at.elapsed() >= window);
                if due {
                    self.force_save(inner);
                }
            }
        }
    }

    fn force_save(&self, inner: &mut MutexGuard<'_, Inner>) {
        let Some(experiments) = inner.cache.as_ref() else {
            return;
        };
        match self.store.save(experiments) {
            Ok(()) => inner.last_save = Some(Instant::now()),
            Err(e) => {
                // counters are auxiliary state; losing one increment beats
                // failing the request
                warn!(error = %e, "failed to persist experiment registry");
            }
        }
    }
}
