//! Serialized search state.
//!
//! A [`SearchSnapshot`] captures everything the search core needs to
//! resume bit-for-bit: per-space definitions, budgets, observation
//! histories, RNG states, and the best score/params. Fitted-model handles
//! are opaque to the engine and deliberately excluded; a restored best
//! carries params and score only.
//!
//! Saves are atomic: the snapshot is written to a sibling temp file and
//! renamed over the target, so a crash mid-write never leaves a truncated
//! snapshot behind.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::space::{Assignment, Space};
use crate::tuner::Observation;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted state of one registered space.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntrySnapshot {
    /// Registered space name.
    pub name: String,
    /// The space definition, for mismatch detection on restore.
    pub space: Space,
    /// Budget the space was registered with.
    pub weight_total: u32,
    /// Budget left at capture time.
    pub weight_remaining: u32,
    /// Exact RNG state at capture time.
    pub rng_state: u64,
    /// Full observation history, oldest first.
    pub observations: Vec<Observation>,
}

/// Persisted state of a whole search.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchSnapshot {
    /// Format version; restores reject anything but [`SNAPSHOT_VERSION`].
    pub version: u32,
    /// Seed all per-space RNGs were derived from.
    pub base_seed: u64,
    /// One entry per registered space, in registration order.
    pub entries: Vec<EntrySnapshot>,
    /// Best mean cross-validation score so far, if any evaluation succeeded.
    pub best_score: Option<f64>,
    /// Assignment that achieved the best score.
    pub best_params: Option<Assignment>,
}

impl SearchSnapshot {
    /// Writes the snapshot as JSON, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Snapshot`] on serialization or I/O failure.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Snapshot(format!("serialize: {e}")))?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|e| Error::Snapshot(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, path)
            .map_err(|e| Error::Snapshot(format!("rename to {}: {e}", path.display())))?;
        Ok(())
    }

    /// Reads a snapshot back from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Snapshot`] on I/O or parse failure.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| Error::Snapshot(format!("read {}: {e}", path.display())))?;
        serde_json::from_str(&json).map_err(|e| Error::Snapshot(format!("parse: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::{Dimension, ParamValue};

    fn sample_snapshot() -> SearchSnapshot {
        let space = Space::new()
            .add("x", Dimension::continuous(0.0, 1.0).unwrap())
            .unwrap();
        let mut params = Assignment::new();
        params.insert("x".to_string(), ParamValue::Float(0.25));
        SearchSnapshot {
            version: SNAPSHOT_VERSION,
            base_seed: 99,
            entries: vec![EntrySnapshot {
                name: "a".to_string(),
                space,
                weight_total: 10,
                weight_remaining: 6,
                rng_state: 0xDEAD_BEEF,
                observations: vec![Observation {
                    vector: vec![0.25],
                    objective: -0.5,
                    params: params.clone(),
                }],
            }],
            best_score: Some(0.5),
            best_params: Some(params),
        }
    }

    #[test]
    fn json_round_trip_preserves_everything() {
        let snapshot = sample_snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: SearchSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(back.version, snapshot.version);
        assert_eq!(back.base_seed, snapshot.base_seed);
        assert_eq!(back.entries.len(), 1);
        assert_eq!(back.entries[0].rng_state, snapshot.entries[0].rng_state);
        assert_eq!(back.entries[0].observations, snapshot.entries[0].observations);
        assert_eq!(back.best_score, snapshot.best_score);
    }

    #[test]
    fn save_and_load_through_the_filesystem() {
        let dir = std::env::temp_dir().join("hypertune-snapshot-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.json");

        let snapshot = sample_snapshot();
        snapshot.save(&path).unwrap();
        let back = SearchSnapshot::load(&path).unwrap();
        assert_eq!(back.entries[0].weight_remaining, 6);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_missing_file_is_a_snapshot_error() {
        let err = SearchSnapshot::load("/nonexistent/state.json").unwrap_err();
        assert!(matches!(err, Error::Snapshot(_)));
    }
}
