//! State
//!
//! The store that drives the selector subsystem: an immutable, structurally
//! shared state tree, the transitions that replace it, and the copy-on-write
//! drafts those transitions run against.
//!
//! # Structural Sharing
//!
//! Every node is held behind an `Arc`. A transition copies exactly the nodes
//! on the path to what it writes; every sibling keeps its reference. That is
//! what lets a memoized selector treat "same pointer" as "same data" in O(1).

mod draft;
mod items;
mod probe;
mod reducer;
mod store;

pub mod selectors;

pub use draft::{Draft, DraftId, DraftRef, StateView};
pub use items::{
    create_items, ActionType, Analytics, DeepDetail, DraftProbeLog, HistoryEntry, Item,
    ItemConfig, ItemDetail, ItemList, ItemMode, ItemStatus, ItemsState, Metadata, NestedLevel,
    Permissions, Relationships, RootState, INITIAL_ITEM_COUNT, MAX_ITEM_COUNT, MIN_ITEM_COUNT,
};
pub use probe::{DraftProbe, ItemsView};
pub use reducer::{reduce, Action};
pub use store::Store;
