//! Sequence-number history for duplicate command detection

use std::collections::{HashSet, VecDeque};

/// Remembers the most recent sequence numbers, evicting the oldest once
/// full.
#[derive(Debug, Clone)]
pub struct SequenceHistory {
    seen: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SequenceHistory {
    /// History of `capacity` sequence numbers.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record `seq`; returns `false` if it is already in the history.
    pub fn record(&mut self, seq: &str) -> bool {
        if self.seen.contains(seq) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.seen.remove(&old);
            }
        }
        self.seen.insert(seq.to_owned());
        self.order.push_back(seq.to_owned());
        true
    }

    /// Whether `seq` is remembered.
    #[must_use]
    pub fn contains(&self, seq: &str) -> bool {
        self.seen.contains(seq)
    }

    /// Number of remembered sequence numbers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.seen.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_refused() {
        let mut history = SequenceHistory::new(4);
        assert!(history.record("1"));
        assert!(!history.record("1"));
        assert!(history.record("2"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn oldest_entry_is_evicted_when_full() {
        let mut history = SequenceHistory::new(2);
        assert!(history.record("a"));
        assert!(history.record("b"));
        assert!(history.record("c"));
        assert!(!history.contains("a"));
        assert!(history.record("a"));
        assert!(!history.record("c"));
        assert_eq!(history.len(), 2);
        history.clear();
        assert!(history.is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn history_never_exceeds_capacity(
                capacity in 1usize..8,
                seqs in proptest::collection::vec("[0-9]{1,2}", 0..64),
            ) {
                let mut history = SequenceHistory::new(capacity);
                for seq in &seqs {
                    history.record(seq);
                    prop_assert!(history.len() <= capacity);
                    prop_assert!(history.contains(seq));
                }
            }
        }
    }
}
