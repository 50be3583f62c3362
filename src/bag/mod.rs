//! Bags: bounded, priority-weighted probabilistic collections
//!
//! Memory stays finite because every collection of links, concepts and
//! questions is a bag: at most `capacity` entries, sampled in proportion
//! to priority, forgetting applied uniformly.
//!
//! ```text
//! ┌──────────────┬────────────────────────────┬─────────────────────────────┐
//! │ Policy       │ Structure                  │ Used for                    │
//! ├──────────────┼────────────────────────────┼─────────────────────────────┤
//! │ CurveBag     │ sorted array + key map,    │ concept index, question     │
//! │              │ single mutex               │ tables                      │
//! │ HijackBag    │ hash table, bounded probe  │ task-links, term-links      │
//! │              │ window, per-slot atomics   │ (high write concurrency)    │
//! └──────────────┴────────────────────────────┴─────────────────────────────┘
//! ```
//!
//! Losing an insertion is a normal outcome ([`PutOutcome::Rejected`]),
//! visible only through [`BagStats`].

mod curve;
mod hijack;

pub use curve::CurveBag;
pub use hijack::HijackBag;

use rand::Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Result of [`Bag::put`].
#[derive(Debug, PartialEq)]
pub enum PutOutcome<K, V> {
    /// New entry stored in free space.
    Inserted,
    /// Key already present; priority merged, value replaced.
    Merged,
    /// New entry stored by evicting this weaker one.
    Replaced(K, V),
    /// Incoming entry was weaker than everything it competed with.
    Rejected,
}

impl<K, V> PutOutcome<K, V> {
    /// Whether the incoming entry is now in the bag.
    pub fn is_stored(&self) -> bool {
        !matches!(self, PutOutcome::Rejected)
    }
}

/// Common bag interface.
///
/// All methods take `&self`: bags synchronize internally so that a
/// concept's link bags can be fed from many derivation threads.
pub trait Bag<K, V> {
    /// Insert or merge. Never an error: losing is [`PutOutcome::Rejected`].
    fn put(&self, key: K, value: V, priority: f32) -> PutOutcome<K, V>;

    fn get(&self, key: &K) -> Option<V>;

    fn priority(&self, key: &K) -> Option<f32>;

    /// Add `delta` (may be negative) to an entry's priority.
    fn adjust(&self, key: &K, delta: f32) -> bool;

    fn remove(&self, key: &K) -> Option<V>;

    /// Draw one entry, biased toward high priority.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(K, V, f32)>;

    /// Draw up to `n` entries (with replacement).
    fn sample_n<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<(K, V, f32)> {
        (0..n).filter_map(|_| self.sample(rng)).collect()
    }

    /// Uniform decay: every priority is multiplied by `(1 - rate)`.
    fn forget(&self, rate: f32);

    /// Resize; returns the entries that no longer fit (weakest first out).
    fn set_capacity(&self, capacity: usize) -> Vec<(K, V)>;

    /// Drop every entry for which `keep` returns false; returns them.
    fn retain(&self, keep: impl FnMut(&K, &V) -> bool) -> Vec<(K, V)>;

    /// Snapshot of all entries with their priorities.
    fn items(&self) -> Vec<(K, V, f32)>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    fn stats(&self) -> BagStatsSnapshot;
}

// =============================================================================
// COUNTERS
// =============================================================================

/// Tuning counters. Relaxed atomics: totals, not a synchronization point.
#[derive(Debug, Default)]
pub struct BagStats {
    hit: AtomicU64,
    miss: AtomicU64,
    insert: AtomicU64,
    merge: AtomicU64,
    reject: AtomicU64,
    evict: AtomicU64,
    contention: AtomicU64,
}

impl BagStats {
    pub(crate) fn hit(&self) {
        self.hit.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn miss(&self) {
        self.miss.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn insert(&self) {
        self.insert.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn merge(&self) {
        self.merge.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn reject(&self) {
        self.reject.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn evict(&self) {
        self.evict.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn contention(&self) {
        self.contention.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BagStatsSnapshot {
        BagStatsSnapshot {
            hit: self.hit.load(Ordering::Relaxed),
            miss: self.miss.load(Ordering::Relaxed),
            insert: self.insert.load(Ordering::Relaxed),
            merge: self.merge.load(Ordering::Relaxed),
            reject: self.reject.load(Ordering::Relaxed),
            evict: self.evict.load(Ordering::Relaxed),
            contention: self.contention.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BagStatsSnapshot {
    pub hit: u64,
    pub miss: u64,
    pub insert: u64,
    pub merge: u64,
    pub reject: u64,
    pub evict: u64,
    pub contention: u64,
}
