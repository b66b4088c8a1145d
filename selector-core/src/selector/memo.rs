//! Memoized Selector
//!
//! A memoized selector derives a value from state through a tuple of input
//! selectors and a combiner, and caches the result keyed by the identity of
//! the inputs.
//!
//! # How Memoized Selectors Work
//!
//! 1. Every call runs the input selectors against the state, in declared order.
//!
//! 2. The resulting tuple is compared element-wise, by reference, against the
//!    tuple stored with the cached result.
//!
//! 3. If every element matches, the cached result is returned and the combiner
//!    is not called.
//!
//! 4. Otherwise the combiner runs, its result and the new input tuple replace
//!    the cache entry, and the recomputation counter goes up by one.
//!
//! 5. If the combiner fails, the error propagates and the previous entry stays
//!    exactly as it was.
//!
//! # Thread Safety
//!
//! The cache is protected by a mutex, so a selector can be hoisted into a
//! shared, long-lived scope. The lock is held across the cache check and the
//! combiner call, which makes the miss path atomic per instance. A combiner
//! must therefore never call back into the selector that is running it.

use std::borrow::Cow;
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{Result, SelectorError};

use super::cache::{CachePolicy, SelectorCache};
use super::inputs::{Combiner, Derive, Fallible, Infallible, InputSelectors};
use super::{CachedSelector, Selector};

/// Counter for generating unique selector IDs.
static SELECTOR_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique selector ID.
fn next_selector_id() -> u64 {
    SELECTOR_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Build a memoized selector from input selectors and an infallible combiner.
///
/// Fails with [`SelectorError::Configuration`] when `inputs` is empty.
pub fn create_memoized_selector<S, I, F>(
    inputs: I,
    combiner: F,
) -> Result<MemoizedSelector<S, I, Infallible<F>>>
where
    I: InputSelectors<S>,
    F: Combiner<I::Values>,
    F::Output: Clone + Send + 'static,
{
    MemoizedSelector::new(inputs, combiner)
}

/// A selector that caches its combiner output keyed by input identity.
///
/// # Type Parameters
///
/// - `S`: the state type the input selectors read.
/// - `I`: the tuple of input selectors.
/// - `D`: the derivation step wrapping the combiner ([`Infallible`] or
///   [`Fallible`]).
///
/// Clones share the cache. Separately constructed selectors never do, even
/// when built from the same functions.
pub struct MemoizedSelector<S, I, D>
where
    I: InputSelectors<S>,
    D: Derive<I::Values>,
{
    /// Unique identifier for this selector.
    id: u64,

    /// Name used in trace events.
    name: Option<Cow<'static, str>>,

    /// The input selectors.
    inputs: Arc<I>,

    /// The combiner.
    combiner: Arc<D>,

    /// Cached inputs, results and the recomputation counter.
    cache: Arc<Mutex<SelectorCache<I::Values, D::Value>>>,

    _state: PhantomData<fn(&S)>,
}

impl<S, I, F> MemoizedSelector<S, I, Infallible<F>>
where
    I: InputSelectors<S>,
    F: Combiner<I::Values>,
    F::Output: Clone + Send + 'static,
{
    /// Create a single-slot memoized selector.
    ///
    /// The combiner is not run until the first call.
    pub fn new(inputs: I, combiner: F) -> Result<Self> {
        Self::build(inputs, Infallible(combiner))
    }
}

impl<S, I, F, R, E> MemoizedSelector<S, I, Fallible<F>>
where
    I: InputSelectors<S>,
    F: Combiner<I::Values, Output = std::result::Result<R, E>>,
    E: fmt::Display,
    R: Clone + Send + 'static,
{
    /// Create a memoized selector whose combiner may fail.
    ///
    /// A failure surfaces as [`SelectorError::Combiner`] and leaves the cache
    /// untouched.
    pub fn try_new(inputs: I, combiner: F) -> Result<Self> {
        Self::build(inputs, Fallible(combiner))
    }
}

impl<S, I, D> MemoizedSelector<S, I, D>
where
    I: InputSelectors<S>,
    D: Derive<I::Values>,
    D::Value: Clone + Send + 'static,
{
    fn build(inputs: I, combiner: D) -> Result<Self> {
        if I::ARITY == 0 {
            return Err(SelectorError::Configuration(
                "a memoized selector needs at least one input selector".into(),
            ));
        }

        Ok(Self {
            id: next_selector_id(),
            name: None,
            inputs: Arc::new(inputs),
            combiner: Arc::new(combiner),
            cache: Arc::new(Mutex::new(SelectorCache::new(CachePolicy::SingleSlot))),
            _state: PhantomData,
        })
    }

    /// Replace the cache policy.
    ///
    /// The returned selector starts from a fresh, empty cache of its own;
    /// clones taken earlier keep sharing the previous one. Fails if the
    /// policy keeps zero entries.
    pub fn with_policy(mut self, policy: CachePolicy) -> Result<Self> {
        policy.validate()?;
        self.cache = Arc::new(Mutex::new(SelectorCache::new(policy)));
        Ok(self)
    }

    /// Attach a name to this selector for trace output.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Get the selector's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the selector's name, if one was given.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The active cache policy.
    pub fn policy(&self) -> CachePolicy {
        self.cache.lock().policy()
    }

    /// Evaluate the selector against `state`.
    ///
    /// This is the main entry point; it is also what [`Selector::select`]
    /// calls.
    pub fn select(&self, state: &S) -> Result<D::Value> {
        let inputs = self.inputs.select_all(state);

        let mut cache = self.cache.lock();
        if let Some(hit) = cache.lookup(&inputs) {
            trace!(selector = self.id, name = ?self.name, "cache hit");
            return Ok(hit);
        }

        let result = self.combiner.derive(inputs.clone())?;
        cache.record(inputs, result.clone());

        trace!(
            selector = self.id,
            name = ?self.name,
            recomputations = cache.recomputations(),
            "cache miss, recomputed"
        );
        Ok(result)
    }

    /// Number of combiner invocations since construction or the last reset.
    pub fn recomputations(&self) -> usize {
        self.cache.lock().recomputations()
    }

    /// Reset the recomputation counter without touching the cached entry.
    pub fn reset_recomputations(&self) {
        self.cache.lock().reset_recomputations();
    }

    /// The most recently returned result, or `None` before the first call.
    pub fn last_result(&self) -> Option<D::Value> {
        self.cache.lock().last_result()
    }

    /// Forget every cached entry. The counter is kept.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Number of entries currently cached.
    pub fn cached_entries(&self) -> usize {
        self.cache.lock().len()
    }

    /// The raw combiner.
    pub fn result_func(&self) -> &D::Func {
        self.combiner.func()
    }

    /// The input selectors, in declared order.
    pub fn dependencies(&self) -> &I {
        &self.inputs
    }
}

impl<S, I, D> Selector<S> for MemoizedSelector<S, I, D>
where
    I: InputSelectors<S>,
    D: Derive<I::Values>,
    D::Value: Clone + Send + 'static,
{
    type Output = D::Value;

    fn select(&self, state: &S) -> Result<D::Value> {
        MemoizedSelector::select(self, state)
    }
}

impl<S, I, D> CachedSelector<S> for MemoizedSelector<S, I, D>
where
    I: InputSelectors<S>,
    D: Derive<I::Values>,
    D::Value: Clone + Send + 'static,
{
    fn recomputations(&self) -> usize {
        MemoizedSelector::recomputations(self)
    }

    fn reset_recomputations(&self) {
        MemoizedSelector::reset_recomputations(self)
    }

    fn last_result(&self) -> Option<D::Value> {
        MemoizedSelector::last_result(self)
    }
}

impl<S, I, D> Clone for MemoizedSelector<S, I, D>
where
    I: InputSelectors<S>,
    D: Derive<I::Values>,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            inputs: Arc::clone(&self.inputs),
            combiner: Arc::clone(&self.combiner),
            cache: Arc::clone(&self.cache),
            _state: PhantomData,
        }
    }
}

impl<S, I, D> Debug for MemoizedSelector<S, I, D>
where
    I: InputSelectors<S>,
    D: Derive<I::Values>,
    D::Value: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.cache.lock();
        f.debug_struct("MemoizedSelector")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("arity", &I::ARITY)
            .field("policy", &cache.policy())
            .field("cached_entries", &cache.len())
            .field("recomputations", &cache.recomputations())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[derive(Clone)]
    struct Doc {
        items: Arc<Vec<u32>>,
        flag: bool,
        tick: u64,
    }

    fn doc() -> Doc {
        Doc {
            items: Arc::new(vec![1, 2, 3, 4]),
            flag: false,
            tick: 0,
        }
    }

    #[test]
    fn selector_computes_on_first_call() {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let selector = MemoizedSelector::new(
            (|d: &Doc| d.items.clone(),),
            move |items: Arc<Vec<u32>>| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
                items.iter().sum::<u32>()
            },
        )
        .unwrap();

        // Not computed yet
        assert_eq!(selector.last_result(), None);
        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        // First call triggers computation
        assert_eq!(selector.select(&doc()).unwrap(), 10);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert_eq!(selector.last_result(), Some(10));
    }

    #[test]
    fn selector_hits_when_inputs_are_identical() {
        let selector = MemoizedSelector::new(
            (|d: &Doc| d.items.clone(), |d: &Doc| d.flag),
            |items: Arc<Vec<u32>>, flag: bool| -> Arc<Vec<u32>> {
                Arc::new(items.iter().copied().filter(|v| !flag || v % 2 == 0).collect())
            },
        )
        .unwrap();

        let first = doc();
        // Unrelated field changed, inputs still identical
        let second = Doc {
            tick: 7,
            ..first.clone()
        };

        let a = selector.select(&first).unwrap();
        let b = selector.select(&second).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(selector.recomputations(), 1);
    }

    #[test]
    fn selector_recomputes_when_any_input_changes() {
        let selector = MemoizedSelector::new(
            (|d: &Doc| d.items.clone(), |d: &Doc| d.flag),
            |items: Arc<Vec<u32>>, flag: bool| {
                items.iter().filter(|v| !flag || *v % 2 == 0).count()
            },
        )
        .unwrap();

        let base = doc();
        assert_eq!(selector.select(&base).unwrap(), 4);

        let flagged = Doc {
            flag: true,
            ..base.clone()
        };
        assert_eq!(selector.select(&flagged).unwrap(), 2);

        // Same contents, new reference
        let copied = Doc {
            items: Arc::new(base.items.as_ref().clone()),
            ..flagged.clone()
        };
        assert_eq!(selector.select(&copied).unwrap(), 2);

        assert_eq!(selector.recomputations(), 3);
    }

    #[test]
    fn reset_keeps_the_cached_result() {
        let selector =
            MemoizedSelector::new((|d: &Doc| d.tick,), |tick: u64| tick * 2).unwrap();

        selector.select(&doc()).unwrap();
        selector.reset_recomputations();

        assert_eq!(selector.recomputations(), 0);
        assert_eq!(selector.last_result(), Some(0));

        // Still a hit after the reset
        selector.select(&doc()).unwrap();
        assert_eq!(selector.recomputations(), 0);
    }

    #[test]
    fn failed_combiner_leaves_cache_intact() {
        let selector = MemoizedSelector::try_new((|d: &Doc| d.tick,), |tick: u64| {
            if tick == 13 {
                Err("unlucky tick")
            } else {
                Ok(tick + 1)
            }
        })
        .unwrap();

        let good = doc();
        let bad = Doc {
            tick: 13,
            ..doc()
        };

        assert_eq!(selector.select(&good).unwrap(), 1);
        assert_eq!(
            selector.select(&bad),
            Err(SelectorError::Combiner("unlucky tick".into()))
        );

        assert_eq!(selector.recomputations(), 1);
        assert_eq!(selector.last_result(), Some(1));
        // The last good inputs are still cached
        assert_eq!(selector.select(&good).unwrap(), 1);
        assert_eq!(selector.recomputations(), 1);
    }

    #[test]
    fn separate_constructions_do_not_share_a_cache() {
        let build = || {
            MemoizedSelector::new((|d: &Doc| d.items.clone(),), |items: Arc<Vec<u32>>| items.len())
                .unwrap()
        };

        let state = doc();
        let first = build();
        let second = build();
        first.select(&state).unwrap();
        second.select(&state).unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(first.recomputations(), 1);
        assert_eq!(second.recomputations(), 1);
    }

    #[test]
    fn selector_clone_shares_state() {
        let selector =
            MemoizedSelector::new((|d: &Doc| d.items.clone(),), |items: Arc<Vec<u32>>| items.len())
                .unwrap();
        let clone = selector.clone();

        selector.select(&doc()).unwrap();

        assert_eq!(selector.id(), clone.id());
        assert_eq!(clone.recomputations(), 1);
        assert_eq!(clone.last_result(), Some(4));
    }

    #[test]
    fn lru_policy_remembers_alternating_inputs() {
        let selector =
            MemoizedSelector::new((|d: &Doc| d.items.clone(),), |items: Arc<Vec<u32>>| items.len())
                .unwrap()
                .with_policy(CachePolicy::Lru { capacity: 2 })
                .unwrap();

        let a = doc();
        let b = Doc {
            items: Arc::new(vec![9]),
            ..doc()
        };

        for _ in 0..5 {
            selector.select(&a).unwrap();
            selector.select(&b).unwrap();
        }

        assert_eq!(selector.recomputations(), 2);
        assert_eq!(selector.cached_entries(), 2);
        assert_eq!(selector.last_result(), Some(1));
    }

    #[test]
    fn zero_inputs_are_rejected() {
        let result = MemoizedSelector::<Doc, _, _>::new((), || 1);
        assert!(matches!(result, Err(SelectorError::Configuration(_))));

        let result = MemoizedSelector::new((|d: &Doc| d.tick,), |t: u64| t)
            .unwrap()
            .with_policy(CachePolicy::Lru { capacity: 0 });
        assert!(matches!(result, Err(SelectorError::Configuration(_))));
    }

    #[test]
    fn introspection_exposes_parts() {
        let selector = MemoizedSelector::new(
            (|d: &Doc| d.tick, |d: &Doc| d.flag),
            |tick: u64, flag: bool| if flag { tick } else { 0 },
        )
        .unwrap()
        .named("tick_when_flagged");

        assert_eq!(selector.name(), Some("tick_when_flagged"));
        assert_eq!((selector.result_func())(5, true), 5);

        let (tick_of, flag_of) = selector.dependencies();
        let state = Doc { tick: 3, ..doc() };
        assert_eq!(tick_of(&state), 3);
        assert!(!flag_of(&state));
    }

    #[test]
    fn nan_inputs_hit_the_cache() {
        let selector = MemoizedSelector::new((|x: &f64| *x,), |x: f64| x.is_nan()).unwrap();

        assert!(selector.select(&f64::NAN).unwrap());
        assert!(selector.select(&f64::NAN).unwrap());
        assert_eq!(selector.recomputations(), 1);
    }

    #[test]
    fn changing_the_policy_of_a_clone_leaves_the_original_cache() {
        let original = MemoizedSelector::new((|d: &Doc| d.items.clone(),), |items: Arc<Vec<u32>>| {
            items.len()
        })
        .unwrap();
        let state = doc();
        original.select(&state).unwrap();

        let lru = original
            .clone()
            .with_policy(CachePolicy::Lru { capacity: 2 })
            .unwrap();
        assert_eq!(lru.cached_entries(), 0);
        assert_eq!(original.cached_entries(), 1);

        original.select(&state).unwrap();
        assert_eq!(original.recomputations(), 1);
    }
}
