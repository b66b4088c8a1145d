//! Notification Layer
//!
//! Decides when a consumer must be told that the value it reads changed.
//! This is the third, independent layer on top of selector caching: a
//! memoized selector can return a cached value and the equality check still
//! decides whether anyone hears about it.
//!
//! # How Notification Works
//!
//! 1. `subscribe` evaluates the selector once against the current state and
//!    stores the result as the last observed value. Nothing is notified.
//!
//! 2. After every transition, each live subscription evaluates its selector
//!    against the new state, in registration order.
//!
//! 3. If the equality function says the candidate differs from the last
//!    observed value, the candidate is stored and `on_change` is called with
//!    it. Otherwise the candidate is discarded.
//!
//! 4. A selector error aborts that subscription's cycle only. The error is
//!    recorded on the subscription and the remaining subscriptions proceed.

mod subscriber;
mod subscription;

pub use subscriber::SubscriberId;
pub use subscription::Subscription;

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::trace;

use crate::equality::Equality;
use crate::error::Result;
use crate::selector::Selector;

use subscriber::{Observer, Watcher};

/// Snapshot of the observers processed for one transition.
type ObserverSnapshot<S> = SmallVec<[Arc<dyn Observer<S>>; 8]>;

/// Registered subscriptions over state `S`, in registration order.
pub struct SubscriberList<S> {
    observers: RwLock<Vec<Arc<dyn Observer<S>>>>,
}

impl<S: 'static> SubscriberList<S> {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register a subscription, evaluating `selector` against `state` once.
    ///
    /// Fails with the selector's error if the initial evaluation fails, in
    /// which case nothing is registered.
    pub fn subscribe<Sel, T, F>(
        &self,
        state: &S,
        selector: Arc<Sel>,
        equality: Equality<T>,
        on_change: F,
    ) -> Result<Subscription<T>>
    where
        Sel: Selector<S, Output = T> + 'static,
        T: Clone + Send + Sync + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let watcher = Watcher::start(state, selector, equality, on_change)?;
        let id = <Watcher<Sel, T> as Observer<S>>::id(&watcher);
        let subscription = Subscription::new(id, Arc::clone(watcher.shared()));

        self.observers.write().push(Arc::new(watcher));
        trace!(subscriber = ?subscription.id(), "subscribed");
        Ok(subscription)
    }

    /// Process a transition to `state` for every live subscription.
    pub fn notify(&self, state: &S) {
        self.notify_until(state, || false);
    }

    /// Like [`notify`](Self::notify), but stops before the next subscription
    /// once `superseded` returns `true`.
    ///
    /// Used when a callback may dispatch a newer transition: that transition
    /// runs its own pass, and the remaining subscriptions skip the stale state.
    pub fn notify_until(&self, state: &S, superseded: impl Fn() -> bool) {
        let snapshot = self.snapshot();

        for observer in &snapshot {
            if superseded() {
                trace!("notification pass superseded by a newer transition");
                break;
            }
            observer.observe(state);
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.observers
            .read()
            .iter()
            .filter(|observer| observer.is_active())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the live observers and drop the ones that unsubscribed.
    fn snapshot(&self) -> ObserverSnapshot<S> {
        let snapshot: ObserverSnapshot<S> = self
            .observers
            .read()
            .iter()
            .filter(|observer| observer.is_active())
            .cloned()
            .collect();

        let mut observers = self.observers.write();
        if observers.len() != snapshot.len() {
            observers.retain(|observer| {
                let keep = observer.is_active();
                if !keep {
                    trace!(subscriber = ?observer.id(), "pruned");
                }
                keep
            });
        }
        snapshot
    }
}

impl<S: 'static> Default for SubscriberList<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for SubscriberList<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberList")
            .field("registered", &self.observers.read().len())
            .finish()
    }
}
