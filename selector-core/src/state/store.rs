//! The store.
//!
//! Holds the current root, applies transitions synchronously and processes
//! every live subscription after each one.
//!
//! # How Dispatch Works
//!
//! 1. Under the state lock, a draft of the current root is created and the
//!    transition is applied to it.
//!
//! 2. The finished draft becomes the new root. The lock is released.
//!
//! 3. Every live subscription is processed against the new root, in
//!    registration order. A callback that dispatches starts a nested
//!    transition; it notifies everyone with its newer state, and the outer
//!    pass stops instead of delivering the stale one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::equality::Equality;
use crate::error::Result;
use crate::notify::{SubscriberList, Subscription};
use crate::selector::Selector;

use super::draft::Draft;
use super::items::RootState;
use super::probe::DraftProbe;
use super::reducer::{reduce, Action};

pub struct Store {
    state: RwLock<Arc<RootState>>,
    subscribers: SubscriberList<RootState>,
    probe: DraftProbe,
    transitions: AtomicU64,
}

impl Store {
    /// A store holding the initial state (200 simple items).
    pub fn new() -> Result<Self> {
        Self::with_state(RootState::default())
    }

    pub fn with_state(state: RootState) -> Result<Self> {
        Ok(Self {
            state: RwLock::new(Arc::new(state)),
            subscribers: SubscriberList::new(),
            probe: DraftProbe::new()?,
            transitions: AtomicU64::new(0),
        })
    }

    /// The current root.
    pub fn state(&self) -> Arc<RootState> {
        Arc::clone(&self.state.read())
    }

    /// Apply `action` and notify subscribers. Returns the new root.
    ///
    /// Fails only if the transition itself fails, in which case the state is
    /// left unchanged and nobody is notified. Subscriber errors are recorded
    /// on the subscriptions and never surface here.
    pub fn dispatch(&self, action: Action) -> Result<Arc<RootState>> {
        let (next, transition) = {
            let mut state = self.state.write();
            let draft = Draft::new(Arc::clone(&state));
            reduce(&draft, action, &self.probe)?;

            let next = draft.finish();
            *state = Arc::clone(&next);
            (next, self.transitions.fetch_add(1, Ordering::AcqRel) + 1)
        };

        debug!(?action, transition, "dispatched");

        self.subscribers.notify_until(&next, || {
            self.transitions.load(Ordering::Acquire) != transition
        });
        Ok(next)
    }

    /// Subscribe to the value `selector` derives from the state.
    ///
    /// The selector is evaluated once right away; `on_change` is only called
    /// for later transitions whose result `equality` considers different.
    pub fn subscribe<Sel, T, F>(
        &self,
        selector: Arc<Sel>,
        equality: Equality<T>,
        on_change: F,
    ) -> Result<Subscription<T>>
    where
        Sel: Selector<RootState, Output = T> + 'static,
        T: Clone + Send + Sync + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        // Holding the read lock keeps a dispatch from slipping in between the
        // initial evaluation and the registration.
        let state = self.state.read();
        self.subscribers
            .subscribe(&state, selector, equality, on_change)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Number of transitions applied so far.
    pub fn transition_count(&self) -> u64 {
        self.transitions.load(Ordering::Acquire)
    }

    /// The selectors exercised by [`Action::RunDraftProbe`].
    pub fn draft_probe(&self) -> &DraftProbe {
        &self.probe
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Store")
            .field("items", &state.items.items.len())
            .field("item_mode", &state.items.item_mode)
            .field("tick", &state.items.tick)
            .field("transitions", &self.transition_count())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    use crate::state::ItemList;

    fn select_tick(state: &RootState) -> u64 {
        state.items.tick
    }

    #[test]
    fn dispatch_replaces_the_root() {
        let store = Store::new().unwrap();
        let before = store.state();

        let after = store.dispatch(Action::BumpTick).unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert!(Arc::ptr_eq(&after, &store.state()));
        assert_eq!(store.transition_count(), 1);
    }

    #[test]
    fn subscribers_see_each_transition() {
        let store = Store::new().unwrap();
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();

        let subscription = store
            .subscribe(Arc::new(select_tick), Equality::reference(), move |_| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        for _ in 0..3 {
            store.dispatch(Action::BumpTick).unwrap();
        }
        store.dispatch(Action::ToggleFilter).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(subscription.current(), 3);
        assert_eq!(subscription.evaluation_count(), 5);
    }

    #[test]
    fn nested_dispatch_supersedes_the_outer_pass() {
        let store = Arc::new(Store::new().unwrap());

        // First subscriber bumps the tick again once, from inside its callback
        let inner = Arc::downgrade(&store);
        let fired = Arc::new(AtomicI32::new(0));
        let fired_clone = fired.clone();
        store
            .subscribe(Arc::new(select_tick), Equality::reference(), move |tick| {
                if *tick == 1 && fired_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                    if let Some(store) = inner.upgrade() {
                        store.dispatch(Action::BumpTick).unwrap();
                    }
                }
            })
            .unwrap();

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        store
            .subscribe(Arc::new(select_tick), Equality::reference(), move |tick| {
                seen_clone.lock().push(*tick);
            })
            .unwrap();

        store.dispatch(Action::BumpTick).unwrap();

        // The second subscriber never sees the superseded tick
        assert_eq!(*seen.lock(), vec![2]);
        assert_eq!(store.state().items.tick, 2);
    }

    #[test]
    fn item_list_keeps_identity_across_unrelated_transitions() {
        let store = Store::new().unwrap();
        let items: ItemList = store.state().items.items.clone();

        store.dispatch(Action::BumpTick).unwrap();
        store.dispatch(Action::ToggleFilter).unwrap();
        store.dispatch(Action::RunDraftProbe).unwrap();

        assert!(Arc::ptr_eq(&items, &store.state().items.items));
    }
}
