//! Drafts
//!
//! A draft is a copy-on-write handle over a base state, used while a
//! transition is in progress. Reading through a draft yields [`StateView`]s
//! that carry the identity of the draft they came from; finishing the draft
//! produces the next immutable state and revokes every view taken from it.
//!
//! # How Draft Views Work
//!
//! 1. A view does not copy anything. It holds the draft's token and a
//!    resolver that reads the draft's working state (falling back to the
//!    base) and applies every [`lens`](StateView::lens) projection on top.
//!
//! 2. Every read through the view resolves again, so a view taken before a
//!    [`modify`](Draft::modify) sees the modification.
//!
//! 3. Views taken from two different drafts never compare reference-equal,
//!    even when they resolve to the same data. [`StateView::materialize`]
//!    strips the draft identity and returns the current snapshot; an
//!    unmodified draft materializes to its base reference.
//!
//! A view must not be read from inside the closure passed to `modify`: the
//! working slot is write-locked for the duration of the call.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::equality::RefEq;
use crate::error::{Result, SelectorError};
use crate::selector::Materialize;

/// Unique identifier for a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DraftId(u64);

impl DraftId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared between a draft and every view taken from it.
#[derive(Debug)]
struct DraftToken {
    id: DraftId,
    revoked: AtomicBool,
}

impl DraftToken {
    fn check(&self) -> Result<()> {
        if self.revoked.load(Ordering::Acquire) {
            return Err(SelectorError::StaleDraft { draft: self.id });
        }
        Ok(())
    }
}

/// The base and working state of a draft, shared with its views.
struct DraftSlot<T> {
    base: Arc<T>,
    /// `None` until the first modification.
    working: RwLock<Option<Arc<T>>>,
}

impl<T> DraftSlot<T> {
    fn current(&self) -> Arc<T> {
        self.working
            .read()
            .as_ref()
            .map_or_else(|| Arc::clone(&self.base), Arc::clone)
    }
}

/// Reads the current value behind a view.
type Resolver<T> = Arc<dyn Fn() -> Arc<T> + Send + Sync>;

/// A copy-on-write handle over state being mutated inside a transition.
///
/// The draft is revoked when it is finished or dropped; views taken from it
/// can still be held, but no longer materialize.
pub struct Draft<T> {
    token: Arc<DraftToken>,
    slot: Arc<DraftSlot<T>>,
}

impl<T> Draft<T> {
    /// Start a draft over `base`.
    pub fn new(base: Arc<T>) -> Self {
        Self {
            token: Arc::new(DraftToken {
                id: DraftId::next(),
                revoked: AtomicBool::new(false),
            }),
            slot: Arc::new(DraftSlot {
                base,
                working: RwLock::new(None),
            }),
        }
    }

    pub fn id(&self) -> DraftId {
        self.token.id
    }

    /// The state this draft started from.
    pub fn base(&self) -> &Arc<T> {
        &self.slot.base
    }

    /// Whether [`modify`](Self::modify) has been called.
    pub fn is_modified(&self) -> bool {
        self.slot.working.read().is_some()
    }

    pub fn is_revoked(&self) -> bool {
        self.token.revoked.load(Ordering::Acquire)
    }

    /// The current state of the draft.
    ///
    /// Returns the base reference while the draft is unmodified.
    pub fn current(&self) -> Result<Arc<T>> {
        self.token.check()?;
        Ok(self.slot.current())
    }

    /// Read the current state.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.token.check()?;
        Ok(f(&self.slot.current()))
    }

    /// Finalize the draft and return the resulting state.
    ///
    /// An unmodified draft returns its base reference. Every view taken from
    /// the draft is revoked.
    pub fn finish(self) -> Arc<T> {
        self.revoke();
        self.slot.current()
    }

    fn revoke(&self) {
        self.token.revoked.store(true, Ordering::Release);
    }
}

impl<T: Send + Sync + 'static> Draft<T> {
    /// Take a live view of the draft that carries this draft's identity.
    pub fn view(&self) -> Result<StateView<T>> {
        self.token.check()?;
        let slot = Arc::clone(&self.slot);
        Ok(StateView::InProgress(DraftRef {
            token: Arc::clone(&self.token),
            resolve: Arc::new(move || slot.current()),
        }))
    }
}

impl<T: Clone> Draft<T> {
    /// Mutate the draft.
    ///
    /// The first modification copies the root; nested `Arc`s are shared until
    /// the closure calls `Arc::make_mut` on them.
    pub fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        self.token.check()?;
        let mut working = self.slot.working.write();
        let slot = working.get_or_insert_with(|| Arc::clone(&self.slot.base));
        Ok(f(Arc::make_mut(slot)))
    }
}

impl<T> Drop for Draft<T> {
    fn drop(&mut self) {
        self.revoke();
    }
}

impl<T> fmt::Debug for Draft<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Draft")
            .field("id", &self.token.id)
            .field("modified", &self.is_modified())
            .field("revoked", &self.is_revoked())
            .finish()
    }
}

/// A read taken through a draft.
pub struct DraftRef<T> {
    token: Arc<DraftToken>,
    resolve: Resolver<T>,
}

impl<T> DraftRef<T> {
    /// The draft this read was taken from.
    pub fn draft_id(&self) -> DraftId {
        self.token.id
    }

    pub fn is_revoked(&self) -> bool {
        self.token.revoked.load(Ordering::Acquire)
    }

    fn current(&self) -> Arc<T> {
        (self.resolve)()
    }
}

impl<T> Clone for DraftRef<T> {
    fn clone(&self) -> Self {
        Self {
            token: Arc::clone(&self.token),
            resolve: Arc::clone(&self.resolve),
        }
    }
}

/// State handed to a selector: either settled or read through a draft.
pub enum StateView<T> {
    /// Immutable state; identity is the `Arc` pointer.
    Stable(Arc<T>),

    /// A read through a live draft; identity includes the draft.
    InProgress(DraftRef<T>),
}

impl<T: 'static> StateView<T> {
    /// Project a shared child out of the view.
    ///
    /// A stable view yields a stable child with the child's own identity. A
    /// draft view yields a child that still belongs to the same draft and
    /// re-applies `f` on every read.
    pub fn lens<C, F>(&self, f: F) -> StateView<C>
    where
        C: 'static,
        F: Fn(&T) -> Arc<C> + Send + Sync + 'static,
    {
        match self {
            StateView::Stable(value) => StateView::Stable(f(value)),
            StateView::InProgress(draft) => {
                let parent = Arc::clone(&draft.resolve);
                StateView::InProgress(DraftRef {
                    token: Arc::clone(&draft.token),
                    resolve: Arc::new(move || f(&parent())),
                })
            }
        }
    }
}

impl<T> StateView<T> {
    pub fn stable(value: Arc<T>) -> Self {
        StateView::Stable(value)
    }

    /// Read a plain value out of the view.
    ///
    /// A draft view reads the draft's current state, even once revoked.
    pub fn get<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self {
            StateView::Stable(value) => f(value),
            StateView::InProgress(draft) => f(&draft.current()),
        }
    }

    /// The draft this view was read through, if any.
    pub fn draft_id(&self) -> Option<DraftId> {
        match self {
            StateView::Stable(_) => None,
            StateView::InProgress(draft) => Some(draft.token.id),
        }
    }

    /// Resolve the view to the current underlying snapshot.
    pub fn snapshot(&self) -> Result<Arc<T>> {
        match self {
            StateView::Stable(value) => Ok(Arc::clone(value)),
            StateView::InProgress(draft) => {
                draft.token.check()?;
                Ok(draft.current())
            }
        }
    }
}

impl<T> Materialize for StateView<T> {
    fn is_draft(&self) -> bool {
        matches!(self, StateView::InProgress(_))
    }

    fn materialize(&self) -> Result<Self> {
        self.snapshot().map(StateView::Stable)
    }
}

impl<T> RefEq for StateView<T> {
    /// Two draft views match when they come from the same draft and
    /// currently resolve to the same node.
    fn ref_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StateView::Stable(a), StateView::Stable(b)) => Arc::ptr_eq(a, b),
            (StateView::InProgress(a), StateView::InProgress(b)) => {
                Arc::ptr_eq(&a.token, &b.token) && Arc::ptr_eq(&a.current(), &b.current())
            }
            _ => false,
        }
    }
}

impl<T> Clone for StateView<T> {
    fn clone(&self) -> Self {
        match self {
            StateView::Stable(value) => StateView::Stable(Arc::clone(value)),
            StateView::InProgress(draft) => StateView::InProgress(draft.clone()),
        }
    }
}

impl<T> From<Arc<T>> for StateView<T> {
    fn from(value: Arc<T>) -> Self {
        StateView::Stable(value)
    }
}

impl<T> fmt::Debug for StateView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateView::Stable(value) => f
                .debug_tuple("Stable")
                .field(&Arc::as_ptr(value))
                .finish(),
            StateView::InProgress(draft) => f
                .debug_struct("InProgress")
                .field("draft", &draft.token.id)
                .field("revoked", &draft.is_revoked())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        shared: Arc<Vec<u8>>,
        count: u32,
    }

    fn counter() -> Arc<Counter> {
        Arc::new(Counter {
            shared: Arc::new(vec![1, 2]),
            count: 0,
        })
    }

    #[test]
    fn unmodified_draft_finishes_to_its_base() {
        let base = counter();
        let draft = Draft::new(Arc::clone(&base));

        assert!(!draft.is_modified());
        assert!(Arc::ptr_eq(&draft.current().unwrap(), &base));
        assert!(Arc::ptr_eq(&draft.finish(), &base));
    }

    #[test]
    fn modification_preserves_untouched_children() {
        let base = counter();
        let draft = Draft::new(Arc::clone(&base));

        draft.modify(|c| c.count += 1).unwrap();
        let next = draft.finish();

        assert!(!Arc::ptr_eq(&next, &base));
        assert!(Arc::ptr_eq(&next.shared, &base.shared));
        assert_eq!(next.count, 1);
        assert_eq!(base.count, 0);
    }

    #[test]
    fn views_from_different_drafts_never_match() {
        let base = counter();
        let first = Draft::new(Arc::clone(&base));
        let second = Draft::new(Arc::clone(&base));

        let a = first.view().unwrap();
        let b = second.view().unwrap();
        assert!(!a.ref_eq(&b));
        assert!(!a.lens(|c| c.shared.clone()).ref_eq(&b.lens(|c| c.shared.clone())));

        // Reads through the same draft are stable
        assert!(a.ref_eq(&first.view().unwrap()));

        // Materialized, both resolve to the same base
        let a = a.materialize().unwrap();
        let b = b.materialize().unwrap();
        assert!(a.ref_eq(&b));
        assert!(!a.is_draft());
    }

    #[test]
    fn views_follow_later_modifications() {
        let draft = Draft::new(counter());
        let before = draft.view().unwrap();
        let shared = before.lens(|c| c.shared.clone());

        draft.modify(|c| c.count = 5).unwrap();
        assert_eq!(before.get(|c| c.count), 5);
        assert_eq!(before.materialize().unwrap().get(|c| c.count), 5);
        assert!(Arc::ptr_eq(&before.snapshot().unwrap(), &draft.current().unwrap()));

        draft
            .modify(|c| Arc::make_mut(&mut c.shared).push(3))
            .unwrap();
        assert_eq!(shared.snapshot().unwrap().as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn views_of_one_draft_stay_equal_across_modifications() {
        let draft = Draft::new(counter());
        let first = draft.view().unwrap().lens(|c| c.shared.clone());
        let second = draft.view().unwrap().lens(|c| c.shared.clone());
        let snapshot = first.materialize().unwrap();

        assert!(first.ref_eq(&second));

        draft
            .modify(|c| Arc::make_mut(&mut c.shared).push(3))
            .unwrap();
        assert!(first.ref_eq(&second));
        assert!(!snapshot.ref_eq(&first.materialize().unwrap()));
    }

    #[test]
    fn finished_drafts_revoke_their_views() {
        let draft = Draft::new(counter());
        let id = draft.id();
        let view = draft.view().unwrap();
        let child = view.lens(|c| c.shared.clone());

        let _ = draft.finish();

        assert_eq!(
            view.materialize().unwrap_err(),
            SelectorError::StaleDraft { draft: id }
        );
        assert!(child.snapshot().is_err());
        assert_eq!(child.draft_id(), Some(id));
    }

    #[test]
    fn dropped_drafts_are_revoked() {
        let view = {
            let draft = Draft::new(counter());
            draft.view().unwrap()
        };
        assert!(view.materialize().is_err());
    }
}
