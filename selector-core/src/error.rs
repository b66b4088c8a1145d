//! Error types shared by selectors, drafts and subscriptions.

use thiserror::Error;

use crate::state::DraftId;

/// Errors surfaced by selector evaluation and construction.
///
/// The core never swallows these: they propagate to whoever called the
/// selector. The notification layer is the only place that catches them, and
/// it does so per subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// A user-supplied combiner failed. The cache keeps its last good entry.
    #[error("combiner failed: {0}")]
    Combiner(String),

    /// A draft view was read after its draft had been finalized.
    #[error("draft {draft} was finalized and can no longer be materialized")]
    StaleDraft { draft: DraftId },

    /// A selector was built with an unusable configuration.
    #[error("invalid selector configuration: {0}")]
    Configuration(String),
}

/// Result alias used throughout the crate.
pub type Result<T, E = SelectorError> = std::result::Result<T, E>;
