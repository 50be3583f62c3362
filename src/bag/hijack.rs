//! Hijack bag: hash-addressed slots with a bounded probe window.
//!
//! ```text
//!   hash(key) ──► start
//!   slots:  [ s0 | s1 | s2 | s3 | s4 | s5 | s6 | s7 ]
//!                        └── probe window (reprobes) ──┘
//! ```
//!
//! Insertion looks only inside the key's probe window: it merges into the
//! key's own slot, else fills an empty slot, else hijacks the weakest
//! occupant whose priority is not higher than the incoming one.
//!
//! Each slot is guarded by its own mutex, which acts as the compare-and-set
//! on the slot's contents; the slot priority is an atomic `f32`. Empty
//! slots hold NaN priority.
//!
//! A put first scans the window with `try_lock` and merges if it finds its
//! key. A writer that finds a slot held by another writer does not wait
//! there: it charges the occupant a small atomic priority penalty and moves
//! on. Only a key that is not yet present takes the admission lock, under
//! which the window is rescanned and the key placed. Admission is the only
//! path that adds keys, so a key occupies at most one slot.
//!
//! Eviction is window-local, so the bag approximates "keep the globally
//! strongest": with `reprobes == capacity` it is exact.

use super::{Bag, BagStats, BagStatsSnapshot, PutOutcome};
use crate::budget::{AtomicF32, Merge};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

struct Slot<K, V> {
    pri: AtomicF32,
    entry: Mutex<Option<(K, V)>>,
}

impl<K, V> Slot<K, V> {
    fn empty() -> Self {
        Self {
            pri: AtomicF32::new(f32::NAN),
            entry: Mutex::new(None),
        }
    }
}

fn table<K, V>(n: usize) -> Box<[Slot<K, V>]> {
    (0..n).map(|_| Slot::empty()).collect()
}

pub struct HijackBag<K, V> {
    slots: RwLock<Box<[Slot<K, V>]>>,
    reprobes: usize,
    merge: Merge,
    penalty: f32,
    /// Held while a new key is placed.
    admit: Mutex<()>,
    len: AtomicUsize,
    stats: BagStats,
}

impl<K, V> fmt::Debug for HijackBag<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HijackBag")
            .field("len", &self.len.load(Ordering::Relaxed))
            .field("capacity", &self.slots.read().len())
            .field("reprobes", &self.reprobes)
            .finish()
    }
}

impl<K: Eq + Hash + Clone, V: Clone> HijackBag<K, V> {
    /// `penalty` is charged to an occupant each time a writer finds its slot busy.
    pub fn new(capacity: usize, reprobes: usize, merge: Merge, penalty: f32) -> Self {
        Self {
            slots: RwLock::new(table(capacity)),
            reprobes: reprobes.max(1),
            merge,
            penalty: penalty.max(0.0),
            admit: Mutex::new(()),
            len: AtomicUsize::new(0),
            stats: BagStats::default(),
        }
    }

    fn start(key: &K, n: usize) -> usize {
        let mut h = DefaultHasher::new();
        key.hash(&mut h);
        (h.finish() % n as u64) as usize
    }

    fn window(&self, key: &K, n: usize) -> impl Iterator<Item = usize> {
        let start = Self::start(key, n);
        (0..self.reprobes.min(n)).map(move |i| (start + i) % n)
    }

    fn merge_into(&self, slot: &Slot<K, V>, v: &mut V, value: V, pri: f32) -> PutOutcome<K, V> {
        let merge = self.merge;
        slot.pri.update(|old| {
            let old = if old.is_nan() { 0.0 } else { old };
            Some(merge.priority(old, pri, 1.0))
        });
        *v = value;
        self.stats.merge();
        PutOutcome::Merged
    }

    fn try_put(&self, slots: &[Slot<K, V>], key: K, value: V, pri: f32) -> PutOutcome<K, V> {
        let n = slots.len();
        for idx in self.window(&key, n) {
            let slot = &slots[idx];
            let Some(mut guard) = slot.entry.try_lock() else {
                slot.pri.add_clamped(-self.penalty);
                self.stats.contention();
                continue;
            };
            if let Some((k, v)) = guard.as_mut() {
                if *k == key {
                    return self.merge_into(slot, v, value, pri);
                }
            }
        }
        let _admit = self.admit.lock();
        self.admit_new(slots, key, value, pri)
    }

    /// Place a key under the admission lock. The rescan waits on busy
    /// slots, so a copy of `key` placed since the lock-free scan is found.
    fn admit_new(&self, slots: &[Slot<K, V>], key: K, value: V, pri: f32) -> PutOutcome<K, V> {
        let n = slots.len();
        let mut empty = None;
        let mut weakest: Option<(usize, f32)> = None;
        for idx in self.window(&key, n) {
            let slot = &slots[idx];
            let mut guard = slot.entry.lock();
            match guard.as_mut() {
                Some((k, v)) if *k == key => return self.merge_into(slot, v, value, pri),
                Some(_) => {
                    let p = slot.pri.load();
                    if weakest.map_or(true, |(_, w)| p < w) {
                        weakest = Some((idx, p));
                    }
                }
                None => {
                    if empty.is_none() {
                        empty = Some(idx);
                    }
                }
            }
        }

        if let Some(idx) = empty {
            let slot = &slots[idx];
            let mut guard = slot.entry.lock();
            // only admission fills slots, so it is still empty
            if guard.is_none() {
                *guard = Some((key, value));
                slot.pri.store(pri);
                self.len.fetch_add(1, Ordering::AcqRel);
                self.stats.insert();
                return PutOutcome::Inserted;
            }
        } else if let Some((idx, w)) = weakest {
            if pri >= w {
                let slot = &slots[idx];
                let mut guard = slot.entry.lock();
                let current = slot.pri.load();
                if guard.is_some() && (current.is_nan() || current <= pri) {
                    let old = guard.replace((key, value));
                    slot.pri.store(pri);
                    self.stats.evict();
                    return match old {
                        Some((k, v)) => PutOutcome::Replaced(k, v),
                        None => PutOutcome::Inserted,
                    };
                }
            }
        }
        self.stats.reject();
        PutOutcome::Rejected
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Bag<K, V> for HijackBag<K, V> {
    fn put(&self, key: K, value: V, priority: f32) -> PutOutcome<K, V> {
        if priority.is_nan() {
            self.stats.reject();
            return PutOutcome::Rejected;
        }
        let slots = self.slots.read();
        if slots.is_empty() {
            self.stats.reject();
            return PutOutcome::Rejected;
        }
        self.try_put(&slots, key, value, priority.clamp(0.0, 1.0))
    }

    fn get(&self, key: &K) -> Option<V> {
        let slots = self.slots.read();
        let n = slots.len();
        if n == 0 {
            return None;
        }
        for idx in self.window(key, n) {
            if let Some((k, v)) = slots[idx].entry.lock().as_ref() {
                if k == key {
                    self.stats.hit();
                    return Some(v.clone());
                }
            }
        }
        self.stats.miss();
        None
    }

    fn priority(&self, key: &K) -> Option<f32> {
        let slots = self.slots.read();
        let n = slots.len();
        if n == 0 {
            return None;
        }
        self.window(key, n).find_map(|idx| {
            let g = slots[idx].entry.lock();
            match g.as_ref() {
                Some((k, _)) if k == key => Some(slots[idx].pri.load()),
                _ => None,
            }
        })
    }

    fn adjust(&self, key: &K, delta: f32) -> bool {
        let slots = self.slots.read();
        let n = slots.len();
        if n == 0 {
            return false;
        }
        for idx in self.window(key, n) {
            let g = slots[idx].entry.lock();
            if matches!(g.as_ref(), Some((k, _)) if k == key) {
                return slots[idx].pri.add_clamped(delta);
            }
        }
        false
    }

    fn remove(&self, key: &K) -> Option<V> {
        let slots = self.slots.read();
        let n = slots.len();
        if n == 0 {
            return None;
        }
        for idx in self.window(key, n) {
            let mut g = slots[idx].entry.lock();
            if matches!(g.as_ref(), Some((k, _)) if k == key) {
                slots[idx].pri.store(f32::NAN);
                self.len.fetch_sub(1, Ordering::AcqRel);
                return g.take().map(|(_, v)| v);
            }
        }
        None
    }

    /// Roulette over slot priorities. A slot locked by a writer is skipped.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(K, V, f32)> {
        let slots = self.slots.read();
        let pris: Vec<f32> = slots.iter().map(|s| s.pri.load()).collect();
        let occupied = pris.iter().filter(|p| !p.is_nan()).count();
        if occupied == 0 {
            return None;
        }
        let total: f32 = pris.iter().filter(|p| !p.is_nan()).sum();
        let start = if total > 0.0 {
            let mut r = rng.gen::<f32>() * total;
            let mut chosen = 0;
            for (i, p) in pris.iter().enumerate() {
                if p.is_nan() {
                    continue;
                }
                chosen = i;
                if r < *p {
                    break;
                }
                r -= p;
            }
            chosen
        } else {
            rng.gen_range(0..slots.len())
        };
        let n = slots.len();
        for i in 0..n {
            let idx = (start + i) % n;
            if let Some(g) = slots[idx].entry.try_lock() {
                if let Some((k, v)) = g.as_ref() {
                    return Some((k.clone(), v.clone(), slots[idx].pri.load()));
                }
            }
        }
        None
    }

    fn forget(&self, rate: f32) {
        let keep = 1.0 - rate.clamp(0.0, 1.0);
        for s in self.slots.read().iter() {
            s.pri
                .update(|p| if p.is_nan() { None } else { Some(p * keep) });
        }
    }

    /// Rebuilds the table; survivors are re-inserted strongest first.
    fn set_capacity(&self, capacity: usize) -> Vec<(K, V)> {
        let mut slots = self.slots.write();
        let mut all: Vec<(K, V, f32)> = slots
            .iter()
            .filter_map(|s| {
                let p = s.pri.load();
                s.entry.lock().take().map(|(k, v)| (k, v, p))
            })
            .collect();
        all.sort_by(|a, b| b.2.total_cmp(&a.2));
        *slots = table(capacity);
        self.len.store(0, Ordering::Release);
        let mut evicted = Vec::new();
        for (k, v, p) in all {
            if capacity == 0 {
                evicted.push((k, v));
                continue;
            }
            match self.try_put(&slots, k.clone(), v.clone(), p) {
                PutOutcome::Replaced(ek, ev) => evicted.push((ek, ev)),
                PutOutcome::Rejected => evicted.push((k, v)),
                _ => {}
            }
        }
        evicted
    }

    fn retain(&self, mut keep: impl FnMut(&K, &V) -> bool) -> Vec<(K, V)> {
        let slots = self.slots.read();
        let mut out = Vec::new();
        for s in slots.iter() {
            let mut g = s.entry.lock();
            let doomed = matches!(g.as_ref(), Some((k, v)) if !keep(k, v));
            if doomed {
                s.pri.store(f32::NAN);
                self.len.fetch_sub(1, Ordering::AcqRel);
                if let Some(e) = g.take() {
                    out.push(e);
                }
            }
        }
        out
    }

    fn items(&self) -> Vec<(K, V, f32)> {
        let slots = self.slots.read();
        let mut out: Vec<(K, V, f32)> = slots
            .iter()
            .filter_map(|s| {
                let g = s.entry.lock();
                g.as_ref().map(|(k, v)| (k.clone(), v.clone(), s.pri.load()))
            })
            .collect();
        out.sort_by(|a, b| b.2.total_cmp(&a.2));
        out
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    fn capacity(&self) -> usize {
        self.slots.read().len()
    }

    fn stats(&self) -> BagStatsSnapshot {
        self.stats.snapshot()
    }
}
