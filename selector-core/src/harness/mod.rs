//! Benchmark and Observation Harness
//!
//! Measures what the selector subsystem buys: how often a consumer is
//! notified under each selector/equality formulation, and what each
//! formulation costs per call across list sizes and item complexity modes.
//!
//! # Experiments
//!
//! 1. **Micro-benchmarks**: six timed loops (plain projection, allocating
//!    filter, memoized hit, memoized miss, shallow comparison of a copy and of
//!    the same list).
//!
//! 2. **Re-render cases**: one consumer per selector/equality combination,
//!    repeated tick bumps, notification counts.
//!
//! 3. **Size and mode sweeps**: filter vs memoized hit vs shallow comparison
//!    per list size and per item mode.
//!
//! 4. **Cache statistics**: hit and forced-miss timing distributions on one
//!    selector, with combiner execution counts.
//!
//! 5. **Simulation**: a seeded sequence of mixed actions replayed against the
//!    unmemoized and the memoized consumer.

mod bench;
mod config;
mod report;
mod scenario;
mod stats;

pub use bench::{run_micro_benchmarks, MicroBenchResult, MAX_MISS_VARIANTS};
pub use config::HarnessConfig;
pub use report::{run_all, Report};
pub use scenario::{
    action_sequence, run_cache_statistics, run_mode_sweep, run_rerender_case, run_rerender_cases,
    run_simulation, run_size_sweep, CacheStats, ModeResult, RerenderCase, RerenderResult,
    SimulatedStep, SimulationResult, SizeResult,
};
pub use stats::{sample_us, time_ms, Stats};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::error::SelectorError;

/// Errors raised while configuring or running the harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse harness config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid harness config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Selector(#[from] SelectorError),
}
