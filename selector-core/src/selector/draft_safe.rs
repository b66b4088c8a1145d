//! Draft-safe selectors.
//!
//! A draft is a view over state that is still being mutated inside a
//! transition. Its wrapper identity is not stable: two drafts over the very
//! same data are two different objects. A memoized selector keyed on values
//! read through such wrappers misses its cache even though nothing changed.
//!
//! [`DraftSafeSelector`] resolves a draft to its materialized snapshot before
//! the input selectors run, so cache identity is judged on the data rather
//! than on the wrapper. Draft views are live: a view taken before a
//! modification materializes to the modified state.

use std::fmt;

use crate::error::Result;

use super::inputs::{Combiner, Derive, Fallible, Infallible, InputSelectors};
use super::memo::MemoizedSelector;
use super::{CachePolicy, CachedSelector, Selector};

/// State that may be a live draft.
pub trait Materialize: Sized {
    /// `true` if this value is a view over an in-progress mutation.
    fn is_draft(&self) -> bool;

    /// Resolve the value to a stable snapshot.
    ///
    /// Stable values return themselves. Drafts that can no longer be read
    /// (finalized or revoked) fail with
    /// [`SelectorError::StaleDraft`](crate::SelectorError::StaleDraft).
    fn materialize(&self) -> Result<Self>;
}

/// Build a draft-safe memoized selector.
pub fn create_draft_safe_selector<S, I, F>(
    inputs: I,
    combiner: F,
) -> Result<DraftSafeSelector<S, I, Infallible<F>>>
where
    S: Materialize,
    I: InputSelectors<S>,
    F: Combiner<I::Values>,
    F::Output: Clone + Send + 'static,
{
    DraftSafeSelector::new(inputs, combiner)
}

/// A memoized selector that materializes draft state before reading it.
pub struct DraftSafeSelector<S, I, D>
where
    I: InputSelectors<S>,
    D: Derive<I::Values>,
{
    inner: MemoizedSelector<S, I, D>,
}

impl<S, I, F> DraftSafeSelector<S, I, Infallible<F>>
where
    S: Materialize,
    I: InputSelectors<S>,
    F: Combiner<I::Values>,
    F::Output: Clone + Send + 'static,
{
    pub fn new(inputs: I, combiner: F) -> Result<Self> {
        MemoizedSelector::new(inputs, combiner).map(Self::wrap)
    }
}

impl<S, I, F, R, E> DraftSafeSelector<S, I, Fallible<F>>
where
    S: Materialize,
    I: InputSelectors<S>,
    F: Combiner<I::Values, Output = std::result::Result<R, E>>,
    E: fmt::Display,
    R: Clone + Send + 'static,
{
    pub fn try_new(inputs: I, combiner: F) -> Result<Self> {
        MemoizedSelector::try_new(inputs, combiner).map(Self::wrap)
    }
}

impl<S, I, D> DraftSafeSelector<S, I, D>
where
    S: Materialize,
    I: InputSelectors<S>,
    D: Derive<I::Values>,
    D::Value: Clone + Send + 'static,
{
    /// Make an existing memoized selector draft-safe.
    ///
    /// The wrapped selector keeps its cache; plain calls through `inner()`
    /// still see raw draft identities.
    pub fn wrap(inner: MemoizedSelector<S, I, D>) -> Self {
        Self { inner }
    }

    pub fn with_policy(self, policy: CachePolicy) -> Result<Self> {
        self.inner.with_policy(policy).map(Self::wrap)
    }

    pub fn named(self, name: impl Into<std::borrow::Cow<'static, str>>) -> Self {
        Self::wrap(self.inner.named(name))
    }

    /// Evaluate against `state`, materializing it first if it is a draft.
    pub fn select(&self, state: &S) -> Result<D::Value> {
        if state.is_draft() {
            let snapshot = state.materialize()?;
            return self.inner.select(&snapshot);
        }
        self.inner.select(state)
    }

    /// The wrapped memoized selector.
    pub fn inner(&self) -> &MemoizedSelector<S, I, D> {
        &self.inner
    }

    pub fn recomputations(&self) -> usize {
        self.inner.recomputations()
    }

    pub fn reset_recomputations(&self) {
        self.inner.reset_recomputations()
    }

    pub fn last_result(&self) -> Option<D::Value> {
        self.inner.last_result()
    }

    pub fn result_func(&self) -> &D::Func {
        self.inner.result_func()
    }

    pub fn dependencies(&self) -> &I {
        self.inner.dependencies()
    }
}

impl<S, I, D> Selector<S> for DraftSafeSelector<S, I, D>
where
    S: Materialize,
    I: InputSelectors<S>,
    D: Derive<I::Values>,
    D::Value: Clone + Send + 'static,
{
    type Output = D::Value;

    fn select(&self, state: &S) -> Result<D::Value> {
        DraftSafeSelector::select(self, state)
    }
}

impl<S, I, D> CachedSelector<S> for DraftSafeSelector<S, I, D>
where
    S: Materialize,
    I: InputSelectors<S>,
    D: Derive<I::Values>,
    D::Value: Clone + Send + 'static,
{
    fn recomputations(&self) -> usize {
        self.inner.recomputations()
    }

    fn reset_recomputations(&self) {
        self.inner.reset_recomputations()
    }

    fn last_result(&self) -> Option<D::Value> {
        self.inner.last_result()
    }
}

impl<S, I, D> Clone for DraftSafeSelector<S, I, D>
where
    I: InputSelectors<S>,
    D: Derive<I::Values>,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, I, D> fmt::Debug for DraftSafeSelector<S, I, D>
where
    I: InputSelectors<S>,
    D: Derive<I::Values>,
    D::Value: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DraftSafeSelector").field(&self.inner).finish()
    }
}
