//! Selectors over the store.
//!
//! Plain field projections, the unmemoized filter that always allocates a
//! new list, and the memoized filter built from the two projections it
//! depends on.

use std::sync::Arc;

use crate::error::Result;
use crate::selector::{Infallible, MemoizedSelector};

use super::items::{ActionType, DraftProbeLog, ItemList, ItemMode, RootState};

pub fn select_items(state: &RootState) -> ItemList {
    Arc::clone(&state.items.items)
}

pub fn select_filter_even_only(state: &RootState) -> bool {
    state.items.filter_even_only
}

pub fn select_tick(state: &RootState) -> u64 {
    state.items.tick
}

pub fn select_last_action(state: &RootState) -> ActionType {
    state.items.last_action
}

pub fn select_item_mode(state: &RootState) -> ItemMode {
    state.items.item_mode
}

pub fn select_draft_probe_log(state: &RootState) -> Arc<DraftProbeLog> {
    Arc::clone(&state.items.draft_probe_log)
}

/// Filtered list without memoization.
///
/// Returns a freshly allocated list on every call, even when the filter is
/// off, so its result is never reference-equal to the previous one.
pub fn unmemoized_filtered_items(state: &RootState) -> ItemList {
    let items = &state.items.items;
    let even_only = state.items.filter_even_only;
    Arc::new(
        items
            .iter()
            .filter(|item| !even_only || item.is_even())
            .cloned()
            .collect(),
    )
}

/// Combiner of [`memoized_filtered_items`].
///
/// With the filter off the input list is returned as is.
pub fn filter_items(items: ItemList, even_only: bool) -> ItemList {
    if !even_only {
        return items;
    }
    Arc::new(items.iter().filter(|item| item.is_even()).cloned().collect())
}

type FilterInputs = (fn(&RootState) -> ItemList, fn(&RootState) -> bool);

/// The selector type returned by [`memoized_filtered_items`].
pub type FilteredItemsSelector =
    MemoizedSelector<RootState, FilterInputs, Infallible<fn(ItemList, bool) -> ItemList>>;

/// Build a memoized filtered-items selector keyed on the item list and the
/// filter flag.
///
/// Each call builds an independent cache; build it once and keep it.
pub fn memoized_filtered_items() -> Result<FilteredItemsSelector> {
    let inputs: FilterInputs = (select_items, select_filter_even_only);
    let combiner: fn(ItemList, bool) -> ItemList = filter_items;
    Ok(MemoizedSelector::new(inputs, combiner)?.named("memoized_filtered_items"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::items::ItemsState;

    fn filtered_state() -> RootState {
        RootState::new(ItemsState {
            filter_even_only: true,
            ..ItemsState::with_items(10, ItemMode::Simple)
        })
    }

    #[test]
    fn unmemoized_filter_always_allocates() {
        let state = RootState::default();
        let a = unmemoized_filtered_items(&state);
        let b = unmemoized_filtered_items(&state);

        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &state.items.items));
        assert_eq!(a.len(), state.items.items.len());
    }

    #[test]
    fn memoized_filter_returns_the_list_when_unfiltered() {
        let selector = memoized_filtered_items().unwrap();
        let state = RootState::default();

        let result = selector.select(&state).unwrap();
        assert!(Arc::ptr_eq(&result, &state.items.items));
    }

    #[test]
    fn memoized_filter_keeps_even_values() {
        let selector = memoized_filtered_items().unwrap();
        let state = filtered_state();

        let values: Vec<i64> = selector
            .select(&state)
            .unwrap()
            .iter()
            .map(|item| item.value)
            .collect();
        assert_eq!(values, vec![0, 2, 4, 6, 8]);

        // Filtered items are shared with the source list
        let filtered = selector.select(&state).unwrap();
        assert!(Arc::ptr_eq(&filtered[1], &state.items.items[2]));
        assert_eq!(selector.recomputations(), 1);
    }

    #[test]
    fn projections_read_their_field() {
        let state = filtered_state();
        assert!(select_filter_even_only(&state));
        assert_eq!(select_tick(&state), 0);
        assert_eq!(select_last_action(&state), ActionType::None);
        assert_eq!(select_item_mode(&state), ItemMode::Simple);
        assert!(select_draft_probe_log(&state).notes.is_empty());
    }
}
