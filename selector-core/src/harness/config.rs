//! Harness configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! runs the full experiment set with the standard constants.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::state::ItemMode;

use super::HarnessError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Transitions dispatched per re-render case.
    pub rerender_iterations: usize,

    /// Calls per timed loop in the size sweep and the cache-hit statistics.
    pub performance_iterations: usize,

    /// List sizes for the size sweep.
    pub array_sizes: Vec<usize>,

    /// Modes for the mode sweep.
    pub item_modes: Vec<ItemMode>,

    /// List size used by the mode sweep.
    pub mode_array_size: usize,

    /// Calls per timed loop in the mode sweep.
    pub mode_iterations: usize,

    /// List size used by the cache hit/miss statistics.
    pub cache_array_size: usize,

    /// Forced cache misses measured by the cache statistics.
    pub miss_iterations: usize,

    /// Calls per micro-benchmark.
    pub micro_iterations: usize,

    /// Rounds of the mixed-action simulation.
    pub simulation_rounds: usize,

    /// List size used by the simulation.
    pub simulation_array_size: usize,

    /// Seed for the simulation's action sequence.
    pub seed: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            rerender_iterations: 1_000,
            performance_iterations: 10_000,
            array_sizes: vec![100, 500, 1_000, 2_000, 5_000, 10_000],
            item_modes: ItemMode::ALL.to_vec(),
            mode_array_size: 500,
            mode_iterations: 1_000,
            cache_array_size: 1_000,
            miss_iterations: 100,
            micro_iterations: 1_000,
            simulation_rounds: 100,
            simulation_array_size: 500,
            seed: 42,
        }
    }
}

impl HarnessConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, HarnessError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| HarnessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), HarnessError> {
        let counts = [
            ("rerender_iterations", self.rerender_iterations),
            ("performance_iterations", self.performance_iterations),
            ("mode_array_size", self.mode_array_size),
            ("mode_iterations", self.mode_iterations),
            ("cache_array_size", self.cache_array_size),
            ("miss_iterations", self.miss_iterations),
            ("micro_iterations", self.micro_iterations),
            ("simulation_rounds", self.simulation_rounds),
            ("simulation_array_size", self.simulation_array_size),
        ];
        if let Some((name, _)) = counts.iter().find(|(_, value)| *value == 0) {
            return Err(HarnessError::Invalid(format!("{name} must be at least 1")));
        }

        if self.array_sizes.is_empty() {
            return Err(HarnessError::Invalid("array_sizes must not be empty".into()));
        }
        if self.item_modes.is_empty() {
            return Err(HarnessError::Invalid("item_modes must not be empty".into()));
        }
        if let Some(size) = self.array_sizes.iter().find(|size| **size == 0) {
            return Err(HarnessError::Invalid(format!(
                "array size {size} is not a valid list size"
            )));
        }
        Ok(())
    }
}
