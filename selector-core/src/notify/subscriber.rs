//! Subscriber types for the notification layer.
//!
//! A subscriber pairs a selector with an equality function and a change
//! callback. On every transition it evaluates the selector and calls the
//! callback only if the equality function says the derived value changed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::warn;

use crate::equality::Equality;
use crate::error::Result;
use crate::selector::Selector;

use super::subscription::SubscriptionState;

/// Unique identifier for a subscriber.
///
/// IDs are handed out in registration order, so they double as the order in
/// which subscribers are notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Something the notification layer processes on each transition.
pub(crate) trait Observer<S>: Send + Sync {
    fn id(&self) -> SubscriberId;

    fn is_active(&self) -> bool;

    /// Process one transition to `state`.
    fn observe(&self, state: &S);
}

/// The observer behind a [`Subscription`](super::Subscription).
pub(crate) struct Watcher<Sel, T> {
    id: SubscriberId,
    selector: Arc<Sel>,
    equality: Equality<T>,
    on_change: Box<dyn Fn(&T) + Send + Sync>,
    shared: Arc<SubscriptionState<T>>,
}

impl<Sel, T> Watcher<Sel, T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Run the initial evaluation. Nothing is notified.
    pub(crate) fn start<S, F>(
        state: &S,
        selector: Arc<Sel>,
        equality: Equality<T>,
        on_change: F,
    ) -> Result<Self>
    where
        Sel: Selector<S, Output = T>,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let started = Instant::now();
        let initial = selector.select(state)?;
        let elapsed = started.elapsed();

        Ok(Self {
            id: SubscriberId::new(),
            selector,
            equality,
            on_change: Box::new(on_change),
            shared: Arc::new(SubscriptionState::new(initial, elapsed)),
        })
    }

    pub(crate) fn shared(&self) -> &Arc<SubscriptionState<T>> {
        &self.shared
    }
}

impl<S, Sel, T> Observer<S> for Watcher<Sel, T>
where
    Sel: Selector<S, Output = T>,
    T: Clone + Send + Sync + 'static,
{
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    fn observe(&self, state: &S) {
        if !self.shared.is_active() {
            return;
        }

        let started = Instant::now();
        let evaluated = self.selector.select(state);
        self.shared.record_evaluation(started.elapsed());
        let candidate = match evaluated {
            Ok(candidate) => candidate,
            Err(err) => {
                warn!(subscriber = ?self.id, error = %err, "selector failed, skipping notification");
                self.shared.record_error(err);
                return;
            }
        };
        self.shared.clear_error();

        // The callback runs without any lock held, so it may dispatch.
        let changed = self
            .shared
            .replace_if(|last| !self.equality.equals(last, &candidate), &candidate);
        if changed {
            self.shared.record_notification();
            (self.on_change)(&candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
        assert!(id1 < id2 && id2 < id3);
    }

    #[test]
    fn watcher_gates_on_equality() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();

        let watcher = Watcher::start(
            &1u32,
            Arc::new(|n: &u32| n / 10),
            Equality::custom(|a: &u32, b: &u32| a == b),
            move |_| {
                seen_clone.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();

        // 1 / 10 == 5 / 10
        watcher.observe(&5u32);
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        watcher.observe(&25u32);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(watcher.shared().current(), 2);
        assert_eq!(watcher.shared().evaluation_count(), 3);
    }
}
