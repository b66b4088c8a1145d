//! Selector Core
//!
//! This crate provides the selector subsystem for a Redux-style store and a
//! small harness that measures how selector formulations affect notification
//! frequency and CPU cost. It implements:
//!
//! - Equality functions (reference, shallow, custom)
//! - Memoized selectors with a single-slot (or opt-in LRU) cache
//! - A draft-safe selector adapter for state that is still being mutated
//! - A notification layer that gates consumer updates with an equality function
//! - A structurally shared item store used to drive all of the above
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `equality`: reference / shallow / custom equality predicates
//! - `selector`: the `Selector` trait, memoized and draft-safe selectors
//! - `state`: the item store, its transitions and copy-on-write drafts
//! - `notify`: subscriptions that decide when a consumer must update
//! - `harness`: timing, statistics and re-render experiments
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use selector_core::equality::Equality;
//! use selector_core::selector::MemoizedSelector;
//! use selector_core::state::{Action, ItemList, RootState, Store};
//!
//! # fn main() -> Result<(), selector_core::SelectorError> {
//! let store = Store::new()?;
//!
//! // Hoist the selector: its cache lives as long as this value.
//! let visible = Arc::new(MemoizedSelector::new(
//!     (
//!         |s: &RootState| s.items.items.clone(),
//!         |s: &RootState| s.items.filter_even_only,
//!     ),
//!     |items: ItemList, even_only: bool| -> ItemList {
//!         if !even_only {
//!             return items;
//!         }
//!         Arc::new(items.iter().filter(|item| item.value % 2 == 0).cloned().collect())
//!     },
//! )?);
//!
//! let subscription = store.subscribe(visible.clone(), Equality::reference(), |_items| {})?;
//!
//! // Unrelated transitions neither recompute nor notify.
//! store.dispatch(Action::BumpTick)?;
//! assert_eq!(visible.recomputations(), 1);
//! assert_eq!(subscription.notify_count(), 0);
//!
//! store.dispatch(Action::ToggleFilter)?;
//! assert_eq!(subscription.notify_count(), 1);
//! # Ok(())
//! # }
//! ```

pub mod equality;
pub mod error;
pub mod harness;
pub mod notify;
pub mod selector;
pub mod state;

pub use error::{Result, SelectorError};
