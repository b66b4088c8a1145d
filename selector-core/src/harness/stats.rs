//! Sample statistics and timing helpers.

use std::time::Instant;

use serde::Serialize;

/// Summary of a set of timing samples.
///
/// Percentiles use the nearest-rank-below rule: `p95` is the sorted sample at
/// index `floor(n * 0.95)`. The standard deviation is the population one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub std_dev: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Stats {
    /// Summarize `samples`. Returns `None` for an empty slice.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let rank = |q: f64| sorted[((n as f64 * q).floor() as usize).min(n - 1)];

        Some(Self {
            count: n,
            mean,
            min: sorted[0],
            max: sorted[n - 1],
            median: sorted[n / 2],
            std_dev: variance.sqrt(),
            p95: rank(0.95),
            p99: rank(0.99),
        })
    }
}

/// Run `f` once and return its result with the elapsed time in milliseconds.
pub fn time_ms<R>(f: impl FnOnce() -> R) -> (R, f64) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed().as_secs_f64() * 1_000.0)
}

/// Run `f` `iterations` times, timing each call in microseconds.
pub fn sample_us(iterations: usize, mut f: impl FnMut()) -> Vec<f64> {
    (0..iterations)
        .map(|_| {
            let start = Instant::now();
            f();
            start.elapsed().as_secs_f64() * 1_000_000.0
        })
        .collect()
}
