//! Selectors
//!
//! A selector is a pure read function mapping state to a derived value. This
//! module defines the [`Selector`] trait and the two stateful selector kinds
//! built on it.
//!
//! # Plain Selectors
//!
//! Any `Fn(&S) -> T` is a selector. It re-runs its body on every call and
//! never caches anything. Input selectors are plain selectors.
//!
//! # Memoized Selectors
//!
//! A [`MemoizedSelector`] evaluates a tuple of input selectors, compares the
//! results against the previous tuple by reference, and only runs its
//! combiner when at least one input changed. The comparison is O(1) per input
//! regardless of how large the underlying data is, which is why it relies on
//! the state tree's structural sharing.
//!
//! The cache belongs to the selector *instance*. Building the same selector
//! twice gives two independent caches, so a memoized selector must be
//! constructed once in a long-lived scope and reused. Constructing one inside
//! a per-read path silently defeats memoization.
//!
//! # Draft-Safe Selectors
//!
//! A [`DraftSafeSelector`] wraps a memoized selector and materializes draft
//! state before the input selectors see it, so that two distinct draft
//! wrappers over the same data hit the cache.

mod cache;
mod draft_safe;
mod inputs;
mod memo;

pub use cache::CachePolicy;
pub use draft_safe::{create_draft_safe_selector, DraftSafeSelector, Materialize};
pub use inputs::{Combiner, Derive, Fallible, Infallible, InputSelectors, InputValues};
pub use memo::{create_memoized_selector, MemoizedSelector};

use crate::error::Result;

/// A read function from state `S` to a derived value.
///
/// Implemented for every `Fn(&S) -> T` and for the memoized selector types.
/// Evaluation is fallible only for selectors that own a fallible step (a
/// fallible combiner or draft materialization); plain functions always
/// return `Ok`.
pub trait Selector<S>: Send + Sync {
    /// The derived value.
    type Output;

    /// Evaluate the selector against `state`.
    fn select(&self, state: &S) -> Result<Self::Output>;
}

impl<S, T, F> Selector<S> for F
where
    F: Fn(&S) -> T + Send + Sync,
{
    type Output = T;

    #[inline]
    fn select(&self, state: &S) -> Result<T> {
        Ok(self(state))
    }
}

/// Introspection shared by the selectors that own a cache.
pub trait CachedSelector<S>: Selector<S> {
    /// Number of combiner invocations since construction or the last reset.
    fn recomputations(&self) -> usize;

    /// Reset the recomputation counter. The cached entry is left alone.
    fn reset_recomputations(&self);

    /// The most recently returned result, if any.
    fn last_result(&self) -> Option<Self::Output>;
}
