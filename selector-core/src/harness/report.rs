//! The full experiment report.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

use crate::state::{Action, DraftProbeLog, Store};

use super::bench::{run_micro_benchmarks, MicroBenchResult};
use super::config::HarnessConfig;
use super::scenario::{
    run_cache_statistics, run_mode_sweep, run_rerender_cases, run_simulation, run_size_sweep,
    CacheStats, ModeResult, RerenderResult, SimulationResult, SizeResult,
};
use super::HarnessError;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub config: HarnessConfig,
    pub micro_benchmarks: Vec<MicroBenchResult>,
    pub rerender: Vec<RerenderResult>,
    pub sizes: Vec<SizeResult>,
    /// Keyed by mode name, in configured order.
    pub modes: IndexMap<String, ModeResult>,
    pub cache: CacheStats,
    pub simulation: SimulationResult,
    pub draft_probe: Arc<DraftProbeLog>,
}

impl Report {
    pub fn to_json(&self) -> Result<String, HarnessError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Run every experiment with `config`.
pub fn run_all(config: &HarnessConfig) -> Result<Report, HarnessError> {
    config.validate()?;

    let store = Store::new()?;
    info!(iterations = config.micro_iterations, "running micro-benchmarks");
    let micro_benchmarks = run_micro_benchmarks(&store.state(), config.micro_iterations)?;

    info!(iterations = config.rerender_iterations, "running re-render cases");
    let rerender = run_rerender_cases(config.rerender_iterations)?;

    info!(sizes = ?config.array_sizes, "running size sweep");
    let sizes = run_size_sweep(config)?;

    info!(modes = ?config.item_modes, "running mode sweep");
    let modes = run_mode_sweep(config)?
        .into_iter()
        .map(|result| (result.mode.to_string(), result))
        .collect();

    info!("running cache statistics");
    let cache = run_cache_statistics(config)?;

    info!(rounds = config.simulation_rounds, seed = config.seed, "running simulation");
    let simulation = run_simulation(config)?;

    let draft_probe = store.dispatch(Action::RunDraftProbe)?.items.draft_probe_log.clone();

    Ok(Report {
        config: config.clone(),
        micro_benchmarks,
        rerender,
        sizes,
        modes,
        cache,
        simulation,
        draft_probe,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> HarnessConfig {
        HarnessConfig {
            rerender_iterations: 10,
            performance_iterations: 10,
            array_sizes: vec![10, 50],
            mode_array_size: 10,
            mode_iterations: 5,
            cache_array_size: 20,
            miss_iterations: 5,
            micro_iterations: 10,
            simulation_rounds: 20,
            simulation_array_size: 20,
            ..HarnessConfig::default()
        }
    }

    #[test]
    fn report_covers_every_experiment() {
        let report = run_all(&small_config()).unwrap();

        assert_eq!(report.micro_benchmarks.len(), 6);
        assert_eq!(report.rerender.len(), 5);
        assert_eq!(report.sizes.len(), 2);
        assert_eq!(
            report.modes.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["simple", "medium", "deep"]
        );
        assert_eq!(report.cache.miss_executions, 5);
        assert_eq!(report.draft_probe.plain_recomputations, 2);
    }

    #[test]
    fn report_serializes_to_json() {
        let report = run_all(&small_config()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["config"]["seed"], 42);
        assert_eq!(json["rerender"][1]["case"], "filter_reference");
        assert_eq!(json["rerender"][1]["renders"], 10);
        assert!(json["modes"]["deep"]["filter"]["mean"].is_number());
    }

    #[test]
    fn invalid_config_is_rejected_before_running() {
        let config = HarnessConfig {
            array_sizes: Vec::new(),
            ..small_config()
        };
        assert!(matches!(run_all(&config), Err(HarnessError::Invalid(_))));
    }
}
