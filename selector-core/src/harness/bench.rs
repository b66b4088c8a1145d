//! Micro-benchmarks.
//!
//! Six timed loops over one state snapshot, comparing the per-call cost of
//! the selector formulations against each other.

use std::hint::black_box;
use std::sync::Arc;

use serde::Serialize;

use crate::equality::shallow_equal;
use crate::error::Result;
use crate::selector::MemoizedSelector;
use crate::state::selectors::{memoized_filtered_items, select_items, unmemoized_filtered_items};
use crate::state::{Item, ItemList, RootState};

use super::stats::time_ms;

/// Upper bound on forced cache misses per run.
pub const MAX_MISS_VARIANTS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MicroBenchResult {
    pub name: &'static str,
    pub description: String,
    pub iterations: usize,
    pub total_ms: f64,
    pub avg_us: f64,
    /// Average time relative to the plain projection.
    pub relative_to_basic: f64,
}

/// Input shape of the forced-miss selector.
struct MissProbe {
    items: ItemList,
    flag: bool,
}

/// Run the six micro-benchmarks against `state`.
pub fn run_micro_benchmarks(state: &RootState, iterations: usize) -> Result<Vec<MicroBenchResult>> {
    let items = Arc::clone(&state.items.items);
    let mut timings: Vec<(&'static str, String, usize, f64)> = Vec::with_capacity(6);

    let (_, total) = time_ms(|| {
        for _ in 0..iterations {
            black_box(select_items(black_box(state)));
        }
    });
    timings.push(("basic selector", "returns the stored list".into(), iterations, total));

    let (_, total) = time_ms(|| {
        for _ in 0..iterations {
            black_box(unmemoized_filtered_items(black_box(state)));
        }
    });
    timings.push(("filter selector", "allocates a new list per call".into(), iterations, total));

    let memoized = memoized_filtered_items()?;
    memoized.select(state)?;
    let (hit, total) = time_ms(|| -> Result<()> {
        for _ in 0..iterations {
            black_box(memoized.select(black_box(state))?);
        }
        Ok(())
    });
    hit?;
    timings.push(("memoized selector (hit)", "returns the cached result".into(), iterations, total));

    let miss_count = iterations.min(MAX_MISS_VARIANTS);
    let variants: Vec<MissProbe> = (0..miss_count)
        .map(|i| MissProbe {
            items: Arc::new(
                items
                    .iter()
                    .map(|item| {
                        Arc::new(Item {
                            value: item.value + i as i64,
                            ..Item::clone(item)
                        })
                    })
                    .collect(),
            ),
            flag: false,
        })
        .collect();
    let miss_selector = MemoizedSelector::new(
        (|probe: &MissProbe| Arc::clone(&probe.items), |probe: &MissProbe| probe.flag),
        |items: ItemList, flag: bool| -> ItemList {
            if flag {
                Arc::new(items.iter().filter(|item| item.is_even()).cloned().collect())
            } else {
                items
            }
        },
    )?;
    let (miss, total) = time_ms(|| -> Result<()> {
        for variant in &variants {
            black_box(miss_selector.select(black_box(variant))?);
        }
        Ok(())
    });
    miss?;
    timings.push(("memoized selector (miss)", "recomputes on a new list".into(), miss_count, total));

    let copy: Vec<Arc<Item>> = items.iter().cloned().collect();
    let (_, total) = time_ms(|| {
        for _ in 0..iterations {
            black_box(shallow_equal(black_box(items.as_slice()), black_box(copy.as_slice())));
        }
    });
    timings.push((
        "shallow equal (different ref)",
        format!("compares {} elements", items.len()),
        iterations,
        total,
    ));

    let (_, total) = time_ms(|| {
        for _ in 0..iterations {
            black_box(shallow_equal(black_box(items.as_slice()), black_box(items.as_slice())));
        }
    });
    timings.push(("shallow equal (same ref)", "returns immediately".into(), iterations, total));

    let avg_us = |total_ms: f64, count: usize| total_ms * 1_000.0 / count.max(1) as f64;
    let basic = avg_us(timings[0].3, timings[0].2);

    Ok(timings
        .into_iter()
        .map(|(name, description, iterations, total_ms)| {
            let avg = avg_us(total_ms, iterations);
            MicroBenchResult {
                name,
                description,
                iterations,
                total_ms,
                avg_us: avg,
                relative_to_basic: if basic > 0.0 { avg / basic } else { 0.0 },
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_six_benchmarks_run() {
        let state = RootState::default();
        let results = run_micro_benchmarks(&state, 20).unwrap();

        let names: Vec<_> = results.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "basic selector",
                "filter selector",
                "memoized selector (hit)",
                "memoized selector (miss)",
                "shallow equal (different ref)",
                "shallow equal (same ref)",
            ]
        );
        assert!(results.iter().all(|r| r.iterations == 20));
        assert!(results[4].description.contains("200"));
    }

    #[test]
    fn miss_variants_are_capped() {
        let state = RootState::default();
        let results = run_micro_benchmarks(&state, 150).unwrap();
        assert_eq!(results[3].iterations, MAX_MISS_VARIANTS);
        assert_eq!(results[0].iterations, 150);
    }
}
