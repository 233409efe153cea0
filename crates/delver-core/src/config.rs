//! Floor cache configuration.
//!
//! Plain serde struct with defaults for every field, so a JSON file only
//! needs to name what it changes.

use std::fs;
use std::path::{Path, PathBuf};

use delver_logic::constants::*;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Floors held at once, current one included.
    pub slot_capacity: usize,
    /// Companions carried per transition, mount included.
    pub roster_capacity: usize,
    /// Widest scatter radius when re-placing companions.
    pub placement_radius: i32,
    /// Scatter attempts per radius.
    pub placement_attempts: u32,
    /// Directory for the per-slot scratch files.
    pub save_dir: PathBuf,
    /// Save identity; backing files are named `<save_name>.F<NN>`.
    pub save_name: String,
    /// RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            slot_capacity: DEFAULT_SLOT_CAPACITY,
            roster_capacity: DEFAULT_ROSTER_CAPACITY,
            placement_radius: DEFAULT_PLACEMENT_RADIUS,
            placement_attempts: DEFAULT_PLACEMENT_ATTEMPTS,
            save_dir: PathBuf::from("save"),
            save_name: "delver".to_string(),
            seed: None,
        }
    }
}

impl CacheConfig {
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_slot_capacity(mut self, capacity: usize) -> Self {
        self.slot_capacity = capacity;
        self
    }

    /// Load from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, CacheError> {
        let text = fs::read_to_string(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: CacheConfig = serde_json::from_str(&text)
            .map_err(|e| CacheError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CacheError> {
        if !(2..=MAX_SLOT_CAPACITY).contains(&self.slot_capacity) {
            return Err(CacheError::Config(format!(
                "slot_capacity must be between 2 and {}, got {}",
                MAX_SLOT_CAPACITY, self.slot_capacity
            )));
        }
        if self.roster_capacity == 0 {
            return Err(CacheError::Config("roster_capacity must be at least 1".into()));
        }
        if self.placement_radius < 1 {
            return Err(CacheError::Config("placement_radius must be at least 1".into()));
        }
        if self.placement_attempts == 0 {
            return Err(CacheError::Config("placement_attempts must be at least 1".into()));
        }
        if self.save_name.is_empty() || self.save_name.contains(['/', '\\']) {
            return Err(CacheError::Config(format!(
                "save_name {:?} must be a plain file name",
                self.save_name
            )));
        }
        Ok(())
    }
}
