//! Selector cache storage.
//!
//! The default cache holds exactly one entry: the last input tuple and the
//! result the combiner produced for it. An LRU policy can be opted into; it
//! keeps several entries ordered most-recently-used first and looks them up by
//! element-wise reference equality over the full input tuple.

use smallvec::SmallVec;

use crate::error::{Result, SelectorError};

use super::inputs::InputValues;

/// How many input tuples a memoized selector remembers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Remember only the last input tuple.
    #[default]
    SingleSlot,

    /// Remember up to `capacity` input tuples, evicting the least recently
    /// used one.
    Lru { capacity: usize },
}

impl CachePolicy {
    /// Number of entries this policy keeps.
    pub fn capacity(&self) -> usize {
        match self {
            CachePolicy::SingleSlot => 1,
            CachePolicy::Lru { capacity } => *capacity,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.capacity() == 0 {
            return Err(SelectorError::Configuration(
                "LRU cache capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// One remembered computation.
#[derive(Debug, Clone)]
struct CacheEntry<K, V> {
    inputs: K,
    result: V,
}

/// The cache owned by one memoized selector instance.
///
/// Invariant: every entry's `result` is the combiner output for exactly its
/// `inputs`, and `recomputations` counts combiner invocations.
#[derive(Debug)]
pub(crate) struct SelectorCache<K, V> {
    policy: CachePolicy,
    /// Most recently used first.
    entries: SmallVec<[CacheEntry<K, V>; 1]>,
    recomputations: usize,
}

impl<K, V> SelectorCache<K, V>
where
    K: InputValues,
    V: Clone,
{
    pub(crate) fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: SmallVec::new(),
            recomputations: 0,
        }
    }

    pub(crate) fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Find the entry for `inputs` and promote it to most recently used.
    pub(crate) fn lookup(&mut self, inputs: &K) -> Option<V> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.inputs.ref_eq_all(inputs))?;

        if position != 0 {
            let entry = self.entries.remove(position);
            self.entries.insert(0, entry);
        }
        Some(self.entries[0].result.clone())
    }

    /// Record a fresh combiner result for `inputs`.
    pub(crate) fn record(&mut self, inputs: K, result: V) {
        self.entries.insert(0, CacheEntry { inputs, result });
        self.entries.truncate(self.policy.capacity());
        self.recomputations += 1;
    }

    pub(crate) fn last_result(&self) -> Option<V> {
        self.entries.first().map(|entry| entry.result.clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn recomputations(&self) -> usize {
        self.recomputations
    }

    pub(crate) fn reset_recomputations(&mut self) {
        self.recomputations = 0;
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(value: &Arc<u32>) -> (Arc<u32>,) {
        (Arc::clone(value),)
    }

    #[test]
    fn single_slot_keeps_only_the_last_entry() {
        let a = Arc::new(1);
        let b = Arc::new(2);
        let mut cache = SelectorCache::new(CachePolicy::SingleSlot);

        cache.record(key(&a), "a");
        cache.record(key(&b), "b");

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(&key(&a)), None);
        assert_eq!(cache.lookup(&key(&b)), Some("b"));
        assert_eq!(cache.recomputations(), 2);
    }

    #[test]
    fn lru_promotes_hits_and_evicts_the_oldest() {
        let a = Arc::new(1);
        let b = Arc::new(2);
        let c = Arc::new(3);
        let mut cache = SelectorCache::new(CachePolicy::Lru { capacity: 2 });

        cache.record(key(&a), "a");
        cache.record(key(&b), "b");
        assert_eq!(cache.lookup(&key(&a)), Some("a"));
        assert_eq!(cache.last_result(), Some("a"));

        // `b` is now the least recently used entry.
        cache.record(key(&c), "c");
        assert_eq!(cache.lookup(&key(&b)), None);
        assert_eq!(cache.lookup(&key(&a)), Some("a"));
        assert_eq!(cache.lookup(&key(&c)), Some("c"));
    }

    #[test]
    fn reset_keeps_entries() {
        let a = Arc::new(1);
        let mut cache = SelectorCache::new(CachePolicy::default());
        cache.record(key(&a), 10);
        cache.reset_recomputations();

        assert_eq!(cache.recomputations(), 0);
        assert_eq!(cache.last_result(), Some(10));

        cache.clear();
        assert_eq!(cache.last_result(), None);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(CachePolicy::Lru { capacity: 0 }.validate().is_err());
        assert!(CachePolicy::Lru { capacity: 3 }.validate().is_ok());
        assert_eq!(CachePolicy::SingleSlot.capacity(), 1);
    }
}
