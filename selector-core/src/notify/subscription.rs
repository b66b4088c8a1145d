//! Subscription handles.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::SelectorError;

use super::subscriber::SubscriberId;

/// State shared between a subscription handle and its watcher.
pub(crate) struct SubscriptionState<T> {
    last_observed: Mutex<T>,
    active: AtomicBool,
    notify_count: AtomicUsize,
    evaluation_count: AtomicUsize,
    /// Duration of the most recent selector evaluation, in nanoseconds.
    last_evaluation_ns: AtomicU64,
    last_error: Mutex<Option<SelectorError>>,
}

impl<T: Clone> SubscriptionState<T> {
    /// State after the initial evaluation produced `initial` in `elapsed`.
    pub(crate) fn new(initial: T, elapsed: Duration) -> Self {
        Self {
            last_observed: Mutex::new(initial),
            active: AtomicBool::new(true),
            notify_count: AtomicUsize::new(0),
            evaluation_count: AtomicUsize::new(1),
            last_evaluation_ns: AtomicU64::new(duration_ns(elapsed)),
            last_error: Mutex::new(None),
        }
    }

    pub(crate) fn current(&self) -> T {
        self.last_observed.lock().clone()
    }

    /// Store `candidate` if `changed` says it differs from the last observed
    /// value. Returns whether it was stored.
    ///
    /// `changed` runs on a copy of the last value with no lock held, so it may
    /// read this subscription.
    pub(crate) fn replace_if(&self, changed: impl FnOnce(&T) -> bool, candidate: &T) -> bool {
        let last = self.current();
        if !changed(&last) {
            return false;
        }
        *self.last_observed.lock() = candidate.clone();
        true
    }
}

impl<T> SubscriptionState<T> {
    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Returns `true` if this call deactivated the subscription.
    pub(crate) fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn record_evaluation(&self, elapsed: Duration) {
        self.evaluation_count.fetch_add(1, Ordering::Relaxed);
        self.last_evaluation_ns
            .store(duration_ns(elapsed), Ordering::Relaxed);
    }

    pub(crate) fn record_notification(&self) {
        self.notify_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self, err: SelectorError) {
        *self.last_error.lock() = Some(err);
    }

    pub(crate) fn clear_error(&self) {
        self.last_error.lock().take();
    }

    pub(crate) fn evaluation_count(&self) -> usize {
        self.evaluation_count.load(Ordering::Relaxed)
    }

    pub(crate) fn last_evaluation_time(&self) -> Duration {
        Duration::from_nanos(self.last_evaluation_ns.load(Ordering::Relaxed))
    }

    pub(crate) fn notify_count(&self) -> usize {
        self.notify_count.load(Ordering::Relaxed)
    }

    pub(crate) fn last_error(&self) -> Option<SelectorError> {
        self.last_error.lock().clone()
    }
}

fn duration_ns(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
}

/// Handle to a live subscription.
///
/// The handle observes the subscription; it does not own it. Dropping the
/// handle leaves the subscription running, and [`unsubscribe`] must be called
/// explicitly to stop it.
///
/// [`unsubscribe`]: Subscription::unsubscribe
pub struct Subscription<T> {
    id: SubscriberId,
    shared: Arc<SubscriptionState<T>>,
}

impl<T: Clone> Subscription<T> {
    pub(crate) fn new(id: SubscriberId, shared: Arc<SubscriptionState<T>>) -> Self {
        Self { id, shared }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// The last value delivered (or the initial value).
    pub fn current(&self) -> T {
        self.shared.current()
    }

    /// How many times `on_change` has been called.
    pub fn notify_count(&self) -> usize {
        self.shared.notify_count()
    }

    /// How many times the selector has been evaluated, including the initial
    /// evaluation.
    pub fn evaluation_count(&self) -> usize {
        self.shared.evaluation_count()
    }

    /// How long the most recent selector evaluation took, failed or not.
    pub fn last_evaluation_time(&self) -> Duration {
        self.shared.last_evaluation_time()
    }

    /// The error raised by the most recent evaluation, if it failed.
    pub fn last_error(&self) -> Option<SelectorError> {
        self.shared.last_error()
    }

    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    /// Stop receiving notifications.
    ///
    /// Returns `true` the first time; later calls are no-ops returning
    /// `false`.
    pub fn unsubscribe(&self) -> bool {
        self.shared.deactivate()
    }
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.shared.is_active())
            .field("notify_count", &self.shared.notify_count())
            .field("evaluation_count", &self.shared.evaluation_count())
            .field("last_evaluation_time", &self.shared.last_evaluation_time())
            .finish()
    }
}
