//! Draft probe.
//!
//! Runs a plain memoized selector and a draft-safe selector side by side
//! against two distinct drafts of the same, unchanged state. The plain
//! selector keys its cache on the draft views and recomputes for each draft;
//! the draft-safe selector materializes them first and recomputes once.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::Result;
use crate::selector::{DraftSafeSelector, Infallible, MemoizedSelector};

use super::draft::{Draft, StateView};
use super::items::{DraftProbeLog, Item, RootState};

/// The item list as read through a root view.
pub type ItemsView = StateView<Vec<Arc<Item>>>;

type ProbeInputs = (fn(&StateView<RootState>) -> ItemsView,);
type ProbeCombiner = Infallible<fn(ItemsView) -> usize>;

fn select_items_view(root: &StateView<RootState>) -> ItemsView {
    root.lens(|root| Arc::clone(&root.items))
        .lens(|slice| Arc::clone(&slice.items))
}

fn count_items(items: ItemsView) -> usize {
    items.get(|items| items.len())
}

/// The pair of hoisted selectors exercised by
/// [`Action::RunDraftProbe`](super::Action::RunDraftProbe).
#[derive(Debug, Clone)]
pub struct DraftProbe {
    plain: MemoizedSelector<StateView<RootState>, ProbeInputs, ProbeCombiner>,
    draft_safe: DraftSafeSelector<StateView<RootState>, ProbeInputs, ProbeCombiner>,
}

impl DraftProbe {
    pub fn new() -> Result<Self> {
        let inputs: ProbeInputs = (select_items_view,);
        let combiner: fn(ItemsView) -> usize = count_items;

        Ok(Self {
            plain: MemoizedSelector::new(inputs, combiner)?.named("probe.plain"),
            draft_safe: DraftSafeSelector::new(inputs, combiner)?.named("probe.draft_safe"),
        })
    }

    /// Evaluate both selectors once against each of two fresh drafts over
    /// `base` and describe what happened.
    ///
    /// Both caches are cleared first, so the recorded counts only reflect this
    /// run.
    pub fn run(&self, base: &Arc<RootState>) -> Result<DraftProbeLog> {
        self.plain.clear_cache();
        self.plain.reset_recomputations();
        self.draft_safe.inner().clear_cache();
        self.draft_safe.reset_recomputations();

        let first = Draft::new(Arc::clone(base));
        let second = Draft::new(Arc::clone(base));

        let mut notes = Vec::with_capacity(4);
        for draft in [&first, &second] {
            let view = draft.view()?;
            let plain = self.plain.select(&view)?;
            let safe = self.draft_safe.select(&view)?;
            notes.push(format!(
                "draft {}: plain selector saw {plain} items, draft-safe selector saw {safe} items",
                draft.id()
            ));
        }

        let plain_recomputations = self.plain.recomputations();
        let draft_safe_recomputations = self.draft_safe.recomputations();
        notes.push(format!(
            "plain memoized selector recomputed {plain_recomputations} time(s)"
        ));
        notes.push(format!(
            "draft-safe selector recomputed {draft_safe_recomputations} time(s)"
        ));

        debug!(
            plain = plain_recomputations,
            draft_safe = draft_safe_recomputations,
            "draft probe finished"
        );

        Ok(DraftProbeLog {
            notes,
            plain_recomputations,
            draft_safe_recomputations,
            last_run_at: now_ms(),
        })
    }

    pub fn plain(&self) -> &MemoizedSelector<StateView<RootState>, ProbeInputs, ProbeCombiner> {
        &self.plain
    }

    pub fn draft_safe(
        &self,
    ) -> &DraftSafeSelector<StateView<RootState>, ProbeInputs, ProbeCombiner> {
        &self.draft_safe
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}
