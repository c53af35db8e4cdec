//! Storage backends for the experiment registry
//!
//! The registry only needs a round-trip-faithful load/save contract over
//! the whole experiment map; where the bytes live is the backend's
//! business. Writes must be atomic: a concurrent reader sees either the
//! previous registry or the new one, never a partial state.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;
use crate::model::Experiment;

/// Load/save contract for the persisted registry.
///
/// Implementations must round-trip every experiment field (name, creation
/// time, arm order, per-arm counters) exactly, and make whole-registry
/// writes atomic.
pub trait RegistryStore: Send + Sync {
    /// Load the full registry. A store that has never been written should
    /// return an empty map, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying medium is unreadable or the
    /// persisted bytes don't decode. The registry fails open on this.
    fn load(&self) -> Result<HashMap<String, Experiment>>;

    /// Replace the full registry atomically.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails. The registry logs and
    /// swallows this.
    fn save(&self, experiments: &HashMap<String, Experiment>) -> Result<()>;
}

/// JSON file backend. Writes go to a sibling temp file first and are
/// renamed into place, so readers never observe a half-written registry.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by the JSON file at `path`. The file doesn't
    /// need to exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> Result<HashMap<String, Experiment>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn save(&self, experiments: &HashMap<String, Experiment>) -> Result<()> {
        let json = serde_json::to_string_pretty(experiments)?;

        let mut tmp = self.path.clone();
        tmp.set_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}

/// In-process backend for tests and demos. Round-trips through the same
/// JSON encoding as [`JsonFileStore`] so it honors the full contract.
#[derive(Debug, Default)]
pub struct MemoryStore {
    serialized: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<HashMap<String, Experiment>> {
        let guard = self
            .serialized
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match guard.as_ref() {
            None => Ok(HashMap::new()),
            Some(json) => Ok(serde_json::from_str(json)?),
        }
    }

    fn save(&self, experiments: &HashMap<String, Experiment>) -> Result<()> {
        let json = serde_json::to_string(experiments)?;
        *self
            .serialized
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HashMap<String, Experiment> {
        let mut map = HashMap::new();
        let exp = Experiment::new("signup-button", ["green", "red"]).expect("arms");
        map.insert(exp.name().to_string(), exp);
        map
    }

    #[test]
    fn test_memory_store_starts_empty() {
        let store = MemoryStore::new();
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        let experiments = sample();
        store.save(&experiments).expect("save");

        let loaded = store.load().expect("load");
        assert_eq!(loaded, experiments);
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("registry.json"));
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("registry.json"));

        let experiments = sample();
        store.save(&experiments).expect("save");

        let loaded = store.load().expect("load");
        assert_eq!(loaded, experiments);
        assert_eq!(
            loaded["signup-button"].alternatives()[0].content(),
            "green"
        );
    }

    #[test]
    fn test_file_store_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("registry.json");
        let store = JsonFileStore::new(&path);
        store.save(&sample()).expect("save");

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_file_store_corrupt_file_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("registry.json");
        fs::write(&path, "{ this is not json").expect("write");

        let store = JsonFileStore::new(&path);
        assert!(store.load().is_err());
    }
}
