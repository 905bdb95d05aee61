//! Fingerprint deduplication
//!
//! [`DedupeIndex`] remembers the most recent fingerprints in insertion order.
//! Eviction is FIFO: seeing a fingerprint again does not refresh it.

use std::collections::{HashSet, VecDeque};

use faultline_core::Fingerprint;

/// Default number of fingerprints remembered.
pub const DEFAULT_DEDUPE_CAPACITY: usize = 100;

/// Bounded, insertion-ordered set of recently captured fingerprints
#[derive(Debug)]
pub struct DedupeIndex {
    order: VecDeque<Fingerprint>,
    members: HashSet<Fingerprint>,
    capacity: usize,
}

impl DedupeIndex {
    /// Creates an empty index holding at most `capacity` fingerprints.
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity.min(1024) + 1),
            members: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    /// Whether `fingerprint` was recorded and not yet evicted.
    pub fn seen(&self, fingerprint: &Fingerprint) -> bool {
        self.members.contains(fingerprint)
    }

    /// Records `fingerprint`. Already-present fingerprints keep their position.
    ///
    /// When the index grows past its capacity, the oldest entry is evicted.
    pub fn record(&mut self, fingerprint: Fingerprint) {
        if self.members.contains(&fingerprint) {
            return;
        }

        self.members.insert(fingerprint.clone());
        self.order.push_back(fingerprint);

        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}

impl Default for DedupeIndex {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUPE_CAPACITY)
    }
}
