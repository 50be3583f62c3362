//! Evidential stamps: which input events a truth value is built from.
//!
//! Two stamps that share any id overlap. Overlapping evidence must never
//! be combined: doing so would count the same observation twice.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of evidence ids a stamp retains.
pub const STAMP_CAPACITY: usize = 16;

/// Bounded evidential base, newest id first.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Stamp {
    ids: Vec<u64>,
}

impl Stamp {
    /// Build from ids (newest first). Duplicates are dropped, length is capped.
    pub fn new(ids: impl IntoIterator<Item = u64>) -> Self {
        let mut out: Vec<u64> = Vec::with_capacity(STAMP_CAPACITY);
        for id in ids {
            if out.len() >= STAMP_CAPACITY {
                break;
            }
            if !out.contains(&id) {
                out.push(id);
            }
        }
        Self { ids: out }
    }

    /// Stamp of a fresh input event.
    pub fn input(serial: u64) -> Self {
        Self { ids: vec![serial] }
    }

    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    /// True if the two stamps share any evidence id.
    pub fn overlaps(&self, other: &Stamp) -> bool {
        self.ids.iter().any(|id| other.ids.contains(id))
    }

    /// Same evidence set regardless of order.
    pub fn same_evidence(&self, other: &Stamp) -> bool {
        if self.ids.len() != other.ids.len() {
            return false;
        }
        let mut a = self.ids.clone();
        let mut b = other.ids.clone();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }

    /// Merge two stamps by interleaving from the newest end.
    ///
    /// Truncation drops the oldest evidence of both parents evenly.
    pub fn zip(a: &Stamp, b: &Stamp) -> Stamp {
        let mut merged = Vec::with_capacity((a.len() + b.len()).min(STAMP_CAPACITY));
        let n = a.len().max(b.len());
        for i in 0..n {
            for side in [a, b] {
                if let Some(&id) = side.ids.get(i) {
                    if merged.len() < STAMP_CAPACITY && !merged.contains(&id) {
                        merged.push(id);
                    }
                }
            }
        }
        Stamp { ids: merged }
    }

    /// Originality in (0.5, 1]: long derivation chains are less original.
    pub fn originality(&self) -> f32 {
        let extra = self.ids.len().saturating_sub(1) as f32;
        1.0 - extra / (2.0 * STAMP_CAPACITY as f32)
    }

    /// Whether the stamp is at capacity (older evidence was discarded).
    pub fn is_saturated(&self) -> bool {
        self.ids.len() >= STAMP_CAPACITY
    }
}

impl fmt::Debug for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, id) in self.ids.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", id)?;
        }
        write!(f, "}}")
    }
}
