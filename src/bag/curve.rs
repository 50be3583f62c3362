//! Sorted bag with curve-biased sampling.
//!
//! Entries are kept in descending priority order. Sampling draws a rank
//! `floor(n · u^sharpness)` for uniform `u`, so the strongest entries are
//! picked most often while every entry keeps a nonzero chance.

use super::{Bag, BagStats, BagStatsSnapshot, PutOutcome};
use crate::budget::Merge;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

struct Inner<K, V> {
    capacity: usize,
    map: HashMap<K, (V, f32)>,
    /// Keys, strongest first.
    order: Vec<K>,
}

impl<K: Eq + Hash + Clone, V> Inner<K, V> {
    fn pri(&self, k: &K) -> f32 {
        self.map.get(k).map_or(0.0, |e| e.1)
    }

    fn position(&self, key: &K) -> Option<usize> {
        let p = self.map.get(key)?.1;
        let start = self.order.partition_point(|k| self.pri(k) > p);
        self.order[start..]
            .iter()
            .take_while(|k| self.pri(k) >= p)
            .position(|k| k == key)
            .map(|i| start + i)
    }

    /// Place `key` (already in `map`) after every entry of equal or higher priority.
    fn insert_sorted(&mut self, key: K) {
        let p = self.pri(&key);
        let at = self.order.partition_point(|k| self.pri(k) >= p);
        self.order.insert(at, key);
    }

    fn unlink(&mut self, key: &K) -> Option<(V, f32)> {
        let at = self.position(key)?;
        self.order.remove(at);
        self.map.remove(key)
    }

    fn pop_weakest(&mut self) -> Option<(K, V)> {
        let k = self.order.pop()?;
        let (v, _) = self.map.remove(&k)?;
        Some((k, v))
    }
}

pub struct CurveBag<K, V> {
    inner: Mutex<Inner<K, V>>,
    merge: Merge,
    sharpness: f32,
    stats: BagStats,
}

impl<K, V> fmt::Debug for CurveBag<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = self.inner.lock();
        f.debug_struct("CurveBag")
            .field("len", &g.order.len())
            .field("capacity", &g.capacity)
            .finish()
    }
}

impl<K: Eq + Hash + Clone, V: Clone> CurveBag<K, V> {
    pub fn new(capacity: usize, merge: Merge) -> Self {
        Self::with_sharpness(capacity, merge, 2.0)
    }

    /// `sharpness` 1.0 samples ranks uniformly; larger favors the head.
    pub fn with_sharpness(capacity: usize, merge: Merge, sharpness: f32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                capacity,
                map: HashMap::with_capacity(capacity),
                order: Vec::with_capacity(capacity),
            }),
            merge,
            sharpness: sharpness.max(1.0),
            stats: BagStats::default(),
        }
    }

    pub fn strongest(&self) -> Option<(K, V, f32)> {
        let g = self.inner.lock();
        let k = g.order.first()?;
        let (v, p) = g.map.get(k)?;
        Some((k.clone(), v.clone(), *p))
    }

    pub fn weakest(&self) -> Option<(K, V, f32)> {
        let g = self.inner.lock();
        let k = g.order.last()?;
        let (v, p) = g.map.get(k)?;
        Some((k.clone(), v.clone(), *p))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().map.contains_key(key)
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Bag<K, V> for CurveBag<K, V> {
    fn put(&self, key: K, value: V, priority: f32) -> PutOutcome<K, V> {
        if priority.is_nan() {
            self.stats.reject();
            return PutOutcome::Rejected;
        }
        let priority = priority.clamp(0.0, 1.0);
        let mut g = self.inner.lock();
        if let Some((_, old)) = g.unlink(&key) {
            let merged = self.merge.priority(old, priority, 1.0);
            g.map.insert(key.clone(), (value, merged));
            g.insert_sorted(key);
            self.stats.merge();
            return PutOutcome::Merged;
        }
        if g.map.len() < g.capacity {
            g.map.insert(key.clone(), (value, priority));
            g.insert_sorted(key);
            self.stats.insert();
            return PutOutcome::Inserted;
        }
        let weakest = match g.order.last() {
            Some(k) => g.pri(k),
            None => {
                // capacity 0
                self.stats.reject();
                return PutOutcome::Rejected;
            }
        };
        if priority < weakest {
            self.stats.reject();
            return PutOutcome::Rejected;
        }
        let evicted = g.pop_weakest();
        g.map.insert(key.clone(), (value, priority));
        g.insert_sorted(key);
        self.stats.evict();
        match evicted {
            Some((k, v)) => PutOutcome::Replaced(k, v),
            None => PutOutcome::Inserted,
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        let g = self.inner.lock();
        match g.map.get(key) {
            Some((v, _)) => {
                self.stats.hit();
                Some(v.clone())
            }
            None => {
                self.stats.miss();
                None
            }
        }
    }

    fn priority(&self, key: &K) -> Option<f32> {
        self.inner.lock().map.get(key).map(|e| e.1)
    }

    fn adjust(&self, key: &K, delta: f32) -> bool {
        let mut g = self.inner.lock();
        match g.unlink(key) {
            Some((v, p)) => {
                g.map.insert(key.clone(), (v, (p + delta).clamp(0.0, 1.0)));
                g.insert_sorted(key.clone());
                true
            }
            None => false,
        }
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().unlink(key).map(|(v, _)| v)
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(K, V, f32)> {
        let g = self.inner.lock();
        let n = g.order.len();
        if n == 0 {
            return None;
        }
        let u: f32 = rng.gen();
        let rank = ((u.powf(self.sharpness) * n as f32) as usize).min(n - 1);
        let k = &g.order[rank];
        let (v, p) = g.map.get(k)?;
        Some((k.clone(), v.clone(), *p))
    }

    fn forget(&self, rate: f32) {
        let keep = 1.0 - rate.clamp(0.0, 1.0);
        let mut g = self.inner.lock();
        // scaling preserves the order
        for (_, p) in g.map.values_mut() {
            *p *= keep;
        }
    }

    fn set_capacity(&self, capacity: usize) -> Vec<(K, V)> {
        let mut g = self.inner.lock();
        g.capacity = capacity;
        let mut out = Vec::new();
        while g.order.len() > capacity {
            if let Some(e) = g.pop_weakest() {
                self.stats.evict();
                out.push(e);
            }
        }
        out
    }

    fn retain(&self, mut keep: impl FnMut(&K, &V) -> bool) -> Vec<(K, V)> {
        let mut g = self.inner.lock();
        let doomed: Vec<K> = g
            .order
            .iter()
            .filter(|k| g.map.get(*k).map_or(true, |(v, _)| !keep(*k, v)))
            .cloned()
            .collect();
        let mut out = Vec::with_capacity(doomed.len());
        for k in doomed {
            if let Some((v, _)) = g.unlink(&k) {
                out.push((k, v));
            }
        }
        out
    }

    fn items(&self) -> Vec<(K, V, f32)> {
        let g = self.inner.lock();
        g.order
            .iter()
            .filter_map(|k| g.map.get(k).map(|(v, p)| (k.clone(), v.clone(), *p)))
            .collect()
    }

    fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    fn stats(&self) -> BagStatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_evicts_weakest_only_when_not_lower() {
        let bag: CurveBag<&str, ()> = CurveBag::new(2, Merge::Plus);
        assert_eq!(bag.put("a", (), 0.5), PutOutcome::Inserted);
        assert_eq!(bag.put("b", (), 0.3), PutOutcome::Inserted);
        assert_eq!(bag.put("c", (), 0.2), PutOutcome::Rejected);
        assert_eq!(bag.put("d", (), 0.3), PutOutcome::Replaced("b", ()));
        assert_eq!(bag.len(), 2);
        assert_eq!(bag.stats().reject, 1);
        assert_eq!(bag.stats().evict, 1);
    }

    #[test]
    fn test_order_and_merge() {
        let bag: CurveBag<u32, ()> = CurveBag::new(4, Merge::Plus);
        bag.put(1, (), 0.1);
        bag.put(2, (), 0.5);
        bag.put(3, (), 0.3);
        assert_eq!(bag.strongest().unwrap().0, 2);
        assert_eq!(bag.weakest().unwrap().0, 1);
        assert_eq!(bag.put(1, (), 0.6), PutOutcome::Merged);
        assert_eq!(bag.strongest().unwrap().0, 1);
        assert!((bag.priority(&1).unwrap() - 0.7).abs() < 1e-6);
        let keys: Vec<u32> = bag.items().into_iter().map(|e| e.0).collect();
        assert_eq!(keys, vec![1, 2, 3]);
    }

    #[test]
    fn test_adjust_and_remove() {
        let bag: CurveBag<u32, &str> = CurveBag::new(4, Merge::Max);
        bag.put(1, "one", 0.8);
        bag.put(2, "two", 0.4);
        assert!(bag.adjust(&1, -0.7));
        assert_eq!(bag.weakest().unwrap().0, 1);
        assert_eq!(bag.remove(&1), Some("one"));
        assert!(!bag.adjust(&1, 0.1));
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn test_sampling_favors_head() {
        let bag: CurveBag<u32, ()> = CurveBag::new(10, Merge::Plus);
        for i in 0..10 {
            bag.put(i, (), i as f32 / 10.0);
        }
        let mut rng = StdRng::seed_from_u64(7);
        let mut head = 0;
        for _ in 0..1000 {
            if bag.sample(&mut rng).unwrap().0 >= 7 {
                head += 1;
            }
        }
        assert!(head > 400, "top 3 of 10 drawn {} / 1000 times", head);
    }

    #[test]
    fn test_shrink_and_retain() {
        let bag: CurveBag<u32, ()> = CurveBag::new(5, Merge::Plus);
        for i in 0..5 {
            bag.put(i, (), 0.1 * (i + 1) as f32);
        }
        let evicted = bag.set_capacity(3);
        let mut keys: Vec<u32> = evicted.into_iter().map(|e| e.0).collect();
        keys.sort();
        assert_eq!(keys, vec![0, 1]);
        let dropped = bag.retain(|k, _| k % 2 == 0);
        assert_eq!(dropped.len(), 1);
        assert_eq!(bag.len(), 2);
        assert!(bag.put(9, (), 0.01).is_stored(), "free space after retain");
    }

    #[test]
    fn test_forget_keeps_order() {
        let bag: CurveBag<u32, ()> = CurveBag::new(3, Merge::Plus);
        bag.put(1, (), 0.8);
        bag.put(2, (), 0.4);
        bag.forget(0.5);
        assert!((bag.priority(&1).unwrap() - 0.4).abs() < 1e-6);
        assert_eq!(bag.strongest().unwrap().0, 1);
    }
}
