//! Store transitions.
//!
//! Every transition runs against a [`Draft`] of the root and only copies the
//! nodes it writes to: the root, the items slice, and for item mutations the
//! item list plus the touched item. Everything else keeps its identity.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

use super::draft::Draft;
use super::items::{create_items, ActionType, ItemMode, RootState, MAX_ITEM_COUNT, MIN_ITEM_COUNT};
use super::probe::DraftProbe;

/// A transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Action {
    /// Regenerate the list with this many items (clamped to `1..=10000`).
    SetItemCount(usize),

    /// Regenerate the list in a new mode; resets the tick and the filter.
    SetItemMode(ItemMode),

    /// `tick += 1`. The item list keeps its reference.
    BumpTick,

    /// `items[0].value += 1`. Only the list and the first item are replaced.
    MutateOneItem,

    /// Flip `filter_even_only`. The item list keeps its reference.
    ToggleFilter,

    /// Compare plain and draft-safe selectors against drafts of the current
    /// state and store the outcome in the probe log.
    RunDraftProbe,
}

impl Action {
    /// The value recorded as `last_action`.
    pub fn kind(&self) -> ActionType {
        match self {
            Action::SetItemCount(_) => ActionType::SetItemCount,
            Action::SetItemMode(_) => ActionType::SetItemMode,
            Action::BumpTick => ActionType::BumpTick,
            Action::MutateOneItem => ActionType::MutateOneItem,
            Action::ToggleFilter => ActionType::ToggleFilter,
            Action::RunDraftProbe => ActionType::RunDraftProbe,
        }
    }
}

/// Apply `action` to `draft`.
pub fn reduce(draft: &Draft<RootState>, action: Action, probe: &DraftProbe) -> Result<()> {
    // The probe reads the untouched base, before this transition writes.
    let probe_log = match action {
        Action::RunDraftProbe => Some(Arc::new(probe.run(draft.base())?)),
        _ => None,
    };

    draft.modify(|root| {
        let slice = Arc::make_mut(&mut root.items);
        slice.last_action = action.kind();

        match action {
            Action::SetItemCount(requested) => {
                let count = requested.clamp(MIN_ITEM_COUNT, MAX_ITEM_COUNT);
                slice.items = create_items(count, slice.item_mode);
                debug!(count, mode = %slice.item_mode, "set item count");
            }
            Action::SetItemMode(mode) => {
                let count = slice.items.len();
                slice.item_mode = mode;
                slice.items = create_items(count, mode);
                slice.tick = 0;
                slice.filter_even_only = false;
                debug!(count, %mode, "set item mode");
            }
            Action::BumpTick => {
                slice.tick += 1;
                debug!(tick = slice.tick, "bump tick");
            }
            Action::MutateOneItem => {
                if slice.items.is_empty() {
                    debug!("mutate one item: list is empty");
                } else {
                    let items = Arc::make_mut(&mut slice.items);
                    let first = Arc::make_mut(&mut items[0]);
                    first.value += 1;
                    debug!(value = first.value, "mutate one item");
                }
            }
            Action::ToggleFilter => {
                slice.filter_even_only = !slice.filter_even_only;
                debug!(filter_even_only = slice.filter_even_only, "toggle filter");
            }
            Action::RunDraftProbe => {
                if let Some(log) = probe_log {
                    slice.draft_probe_log = log;
                }
            }
        }
    })
}
