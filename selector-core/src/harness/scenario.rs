//! Re-render experiments.
//!
//! Each experiment builds its own store, subscribes one consumer the way a
//! component would, drives transitions through the store and reads the
//! consumer's notification count. A notification is what a UI would turn
//! into a re-render.

use std::fmt;
use std::hint::black_box;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::equality::{shallow_equal, Equality};
use crate::error::Result;
use crate::selector::{Infallible, MemoizedSelector};
use crate::state::selectors::{memoized_filtered_items, select_items, unmemoized_filtered_items};
use crate::state::{Action, ItemList, ItemMode, RootState, Store};

use super::config::HarnessConfig;
use super::stats::{sample_us, time_ms, Stats};

/// Selector and equality combinations compared by the re-render experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RerenderCase {
    /// The stored list, compared by reference.
    ReferenceItems,
    /// A freshly filtered list, compared by reference.
    FilterReference,
    /// A freshly filtered list, compared shallowly.
    FilterShallow,
    /// The memoized filter, compared by reference.
    Memoized,
    /// The memoized filter, compared shallowly.
    MemoizedShallow,
}

impl RerenderCase {
    pub const ALL: [RerenderCase; 5] = [
        RerenderCase::ReferenceItems,
        RerenderCase::FilterReference,
        RerenderCase::FilterShallow,
        RerenderCase::Memoized,
        RerenderCase::MemoizedShallow,
    ];

    fn equality(&self) -> Equality<ItemList> {
        match self {
            RerenderCase::FilterShallow | RerenderCase::MemoizedShallow => Equality::shallow(),
            _ => Equality::reference(),
        }
    }
}

impl fmt::Display for RerenderCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RerenderCase::ReferenceItems => "reference items",
            RerenderCase::FilterReference => "filter + reference",
            RerenderCase::FilterShallow => "filter + shallow",
            RerenderCase::Memoized => "memoized + reference",
            RerenderCase::MemoizedShallow => "memoized + shallow",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerenderResult {
    pub case: RerenderCase,
    pub transitions: usize,
    /// `on_change` calls after the initial evaluation.
    pub renders: usize,
    /// Combiner runs during the transitions, for memoized cases.
    pub recomputations: Option<usize>,
    pub elapsed_ms: f64,
}

/// Dispatch `iterations` tick bumps with one consumer subscribed per `case`.
pub fn run_rerender_case(case: RerenderCase, iterations: usize) -> Result<RerenderResult> {
    let store = Store::new()?;

    let (subscription, memoized) = match case {
        RerenderCase::ReferenceItems => (
            store.subscribe(Arc::new(select_items), case.equality(), |_| {})?,
            None,
        ),
        RerenderCase::FilterReference | RerenderCase::FilterShallow => (
            store.subscribe(Arc::new(unmemoized_filtered_items), case.equality(), |_| {})?,
            None,
        ),
        RerenderCase::Memoized | RerenderCase::MemoizedShallow => {
            let selector = Arc::new(memoized_filtered_items()?);
            let subscription = store.subscribe(Arc::clone(&selector), case.equality(), |_| {})?;
            selector.reset_recomputations();
            (subscription, Some(selector))
        }
    };

    let (dispatched, elapsed_ms) = time_ms(|| -> Result<()> {
        for _ in 0..iterations {
            store.dispatch(Action::BumpTick)?;
        }
        Ok(())
    });
    dispatched?;

    let result = RerenderResult {
        case,
        transitions: iterations,
        renders: subscription.notify_count(),
        recomputations: memoized.map(|selector| selector.recomputations()),
        elapsed_ms,
    };
    debug!(case = %case, renders = result.renders, "re-render case finished");
    Ok(result)
}

/// Run every re-render case.
pub fn run_rerender_cases(iterations: usize) -> Result<Vec<RerenderResult>> {
    RerenderCase::ALL
        .iter()
        .map(|case| run_rerender_case(*case, iterations))
        .collect()
}

fn store_with(count: usize, mode: ItemMode) -> Result<Store> {
    let store = Store::new()?;
    if mode != ItemMode::Simple {
        store.dispatch(Action::SetItemMode(mode))?;
    }
    store.dispatch(Action::SetItemCount(count))?;
    Ok(store)
}

type EvenItemsSelector =
    MemoizedSelector<RootState, (fn(&RootState) -> ItemList,), Infallible<fn(ItemList) -> ItemList>>;

/// A memoized selector whose combiner always filters, as used by the sweeps.
fn even_items_selector() -> Result<EvenItemsSelector> {
    let inputs: (fn(&RootState) -> ItemList,) = (select_items,);
    let combiner: fn(ItemList) -> ItemList = filter_even;
    MemoizedSelector::new(inputs, combiner)
}

fn total_ms(samples_us: &[f64]) -> f64 {
    samples_us.iter().sum::<f64>() / 1_000.0
}

fn filter_even(items: ItemList) -> ItemList {
    Arc::new(items.iter().filter(|item| item.is_even()).cloned().collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeResult {
    pub size: usize,
    pub filter_ms: f64,
    pub memoized_ms: f64,
    /// How much of the filter time the memoized selector saves, in percent.
    pub improvement_pct: f64,
    pub shallow_equal_ms: f64,
    pub shallow_equal_per_call_us: f64,
}

/// Compare filtering, memoized hits and shallow comparison across list sizes.
pub fn run_size_sweep(config: &HarnessConfig) -> Result<Vec<SizeResult>> {
    let iterations = config.performance_iterations;

    config
        .array_sizes
        .iter()
        .map(|&size| -> Result<SizeResult> {
            let store = store_with(size, ItemMode::Simple)?;
            let state = store.state();
            let items = Arc::clone(&state.items.items);

            let filter_ms = total_ms(&sample_us(iterations, || {
                black_box(filter_even(black_box(Arc::clone(&items))));
            }));

            let selector = even_items_selector()?;
            selector.select(&state)?;
            let memoized_ms = total_ms(&sample_us(iterations, || {
                black_box(selector.select(black_box(&state)).ok());
            }));

            let copy: Vec<_> = items.iter().cloned().collect();
            let shallow_equal_ms = total_ms(&sample_us(iterations, || {
                black_box(shallow_equal(items.as_slice(), copy.as_slice()));
            }));

            let improvement_pct = if filter_ms > 0.0 {
                (filter_ms - memoized_ms) / filter_ms * 100.0
            } else {
                0.0
            };

            Ok(SizeResult {
                size,
                filter_ms,
                memoized_ms,
                improvement_pct,
                shallow_equal_ms,
                shallow_equal_per_call_us: shallow_equal_ms * 1_000.0 / iterations as f64,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeResult {
    pub mode: ItemMode,
    pub size: usize,
    /// Per-call timings in microseconds.
    pub filter: Option<Stats>,
    pub memoized: Option<Stats>,
    pub shallow_equal: Option<Stats>,
}

/// Compare the same three operations across item complexity modes.
pub fn run_mode_sweep(config: &HarnessConfig) -> Result<Vec<ModeResult>> {
    let iterations = config.mode_iterations;
    let size = config.mode_array_size;

    config
        .item_modes
        .iter()
        .map(|&mode| -> Result<ModeResult> {
            let store = store_with(size, mode)?;
            let state = store.state();
            let items = Arc::clone(&state.items.items);

            let filter = sample_us(iterations, || {
                black_box(filter_even(Arc::clone(&items)));
            });

            let selector = even_items_selector()?;
            selector.select(&state)?;
            let memoized = sample_us(iterations, || {
                black_box(selector.select(&state).ok());
            });

            let copy: Vec<_> = items.iter().cloned().collect();
            let shallow = sample_us(iterations, || {
                black_box(shallow_equal(items.as_slice(), copy.as_slice()));
            });

            Ok(ModeResult {
                mode,
                size,
                filter: Stats::from_samples(&filter),
                memoized: Stats::from_samples(&memoized),
                shallow_equal: Stats::from_samples(&shallow),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hit: Option<Stats>,
    pub miss: Option<Stats>,
    /// Combiner runs during the hit loop; expected to be zero.
    pub hit_executions: usize,
    /// Combiner runs during the miss loop; expected to equal the miss count.
    pub miss_executions: usize,
    /// Mean miss time over mean hit time.
    pub miss_to_hit_ratio: f64,
}

/// Time cache hits against forced misses on one selector.
pub fn run_cache_statistics(config: &HarnessConfig) -> Result<CacheStats> {
    let store = store_with(config.cache_array_size, ItemMode::Simple)?;
    let state = store.state();
    let selector = even_items_selector()?;

    selector.select(&state)?;
    selector.reset_recomputations();
    let hit = sample_us(config.performance_iterations, || {
        black_box(selector.select(&state).ok());
    });
    let hit_executions = selector.recomputations();

    // Same data, new list reference every time
    let variants: Vec<RootState> = (0..config.miss_iterations)
        .map(|_| {
            let mut slice = state.items.as_ref().clone();
            slice.items = Arc::new(state.items.items.as_ref().clone());
            RootState::new(slice)
        })
        .collect();

    selector.reset_recomputations();
    let mut variant = variants.iter();
    let miss = sample_us(variants.len(), || {
        if let Some(state) = variant.next() {
            black_box(selector.select(state).ok());
        }
    });
    let miss_executions = selector.recomputations();

    let hit = Stats::from_samples(&hit);
    let miss = Stats::from_samples(&miss);
    let miss_to_hit_ratio = match (hit, miss) {
        (Some(hit), Some(miss)) if hit.mean > 0.0 => miss.mean / hit.mean,
        _ => 0.0,
    };

    Ok(CacheStats {
        size: config.cache_array_size,
        hit,
        miss,
        hit_executions,
        miss_executions,
        miss_to_hit_ratio,
    })
}

/// One step of the mixed-action simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulatedStep {
    BumpTick,
    MutateOneItem,
    ToggleFilter,
    Idle,
}

impl SimulatedStep {
    fn action(&self) -> Option<Action> {
        match self {
            SimulatedStep::BumpTick => Some(Action::BumpTick),
            SimulatedStep::MutateOneItem => Some(Action::MutateOneItem),
            SimulatedStep::ToggleFilter => Some(Action::ToggleFilter),
            SimulatedStep::Idle => None,
        }
    }
}

/// Draw `rounds` steps: 30% tick, 20% item mutation, 10% filter toggle, 40%
/// nothing.
pub fn action_sequence(rounds: usize, seed: u64) -> Vec<SimulatedStep> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..rounds)
        .map(|_| {
            let roll: f64 = rng.gen();
            if roll < 0.3 {
                SimulatedStep::BumpTick
            } else if roll < 0.5 {
                SimulatedStep::MutateOneItem
            } else if roll < 0.6 {
                SimulatedStep::ToggleFilter
            } else {
                SimulatedStep::Idle
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub rounds: usize,
    pub seed: u64,
    pub bump_ticks: usize,
    pub mutations: usize,
    pub toggles: usize,
    pub idle: usize,
    pub unmemoized_renders: usize,
    pub memoized_renders: usize,
    pub unnecessary_renders: usize,
    /// Share of the unmemoized renders the memoized pattern avoids, in percent.
    pub reduction_pct: f64,
}

/// Replay one seeded action sequence against the unmemoized and the
/// memoized consumer.
pub fn run_simulation(config: &HarnessConfig) -> Result<SimulationResult> {
    let steps = action_sequence(config.simulation_rounds, config.seed);

    let replay = |selector_is_memoized: bool| -> Result<usize> {
        let store = store_with(config.simulation_array_size, ItemMode::Simple)?;
        let subscription = if selector_is_memoized {
            let selector = Arc::new(memoized_filtered_items()?);
            store.subscribe(selector, Equality::reference(), |_| {})?
        } else {
            store.subscribe(Arc::new(unmemoized_filtered_items), Equality::reference(), |_| {})?
        };

        for action in steps.iter().filter_map(SimulatedStep::action) {
            store.dispatch(action)?;
        }
        Ok(subscription.notify_count())
    };

    let unmemoized_renders = replay(false)?;
    let memoized_renders = replay(true)?;
    let count = |step: SimulatedStep| steps.iter().filter(|s| **s == step).count();
    let unnecessary_renders = unmemoized_renders.saturating_sub(memoized_renders);

    Ok(SimulationResult {
        rounds: steps.len(),
        seed: config.seed,
        bump_ticks: count(SimulatedStep::BumpTick),
        mutations: count(SimulatedStep::MutateOneItem),
        toggles: count(SimulatedStep::ToggleFilter),
        idle: count(SimulatedStep::Idle),
        unmemoized_renders,
        memoized_renders,
        unnecessary_renders,
        reduction_pct: if unmemoized_renders > 0 {
            unnecessary_renders as f64 / unmemoized_renders as f64 * 100.0
        } else {
            0.0
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rerender_cases_match_expectations() {
        let results = run_rerender_cases(25).unwrap();
        let renders: Vec<usize> = results.iter().map(|r| r.renders).collect();

        assert_eq!(renders, vec![0, 25, 0, 0, 0]);
        assert_eq!(results[3].recomputations, Some(0));
        assert_eq!(results[4].recomputations, Some(0));
        assert_eq!(results[0].recomputations, None);
    }

    #[test]
    fn action_sequence_is_seeded() {
        let a = action_sequence(50, 7);
        let b = action_sequence(50, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
    }

    #[test]
    fn simulation_favours_the_memoized_pattern() {
        let config = HarnessConfig {
            simulation_rounds: 60,
            simulation_array_size: 50,
            ..HarnessConfig::default()
        };
        let result = run_simulation(&config).unwrap();

        let dispatched = result.bump_ticks + result.mutations + result.toggles;
        assert_eq!(result.unmemoized_renders, dispatched);
        assert_eq!(result.memoized_renders, result.mutations + result.toggles);
        assert!(result.unmemoized_renders >= result.memoized_renders);
        assert_eq!(result.bump_ticks + result.mutations + result.toggles + result.idle, 60);
    }

    #[test]
    fn cache_statistics_count_executions() {
        let config = HarnessConfig {
            performance_iterations: 50,
            cache_array_size: 100,
            miss_iterations: 10,
            ..HarnessConfig::default()
        };
        let stats = run_cache_statistics(&config).unwrap();

        assert_eq!(stats.hit_executions, 0);
        assert_eq!(stats.miss_executions, 10);
        assert_eq!(stats.hit.unwrap().count, 50);
    }

    #[test]
    fn sweeps_cover_every_configured_size_and_mode() {
        let config = HarnessConfig {
            performance_iterations: 5,
            array_sizes: vec![10, 20],
            mode_iterations: 5,
            mode_array_size: 20,
            ..HarnessConfig::default()
        };

        let sizes = run_size_sweep(&config).unwrap();
        assert_eq!(sizes.iter().map(|s| s.size).collect::<Vec<_>>(), vec![10, 20]);

        let modes = run_mode_sweep(&config).unwrap();
        assert_eq!(modes.len(), 3);
        assert!(modes.iter().all(|m| m.filter.map(|s| s.count) == Some(5)));
    }
}
