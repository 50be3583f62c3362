//! Lock-free budget storage shared between threads.

use super::{Budget, Merge};
use std::sync::atomic::{AtomicU32, Ordering};

/// `f32` stored as its bit pattern in an `AtomicU32`.
#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(v: f32) -> Self {
        Self(AtomicU32::new(v.to_bits()))
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, v: f32) {
        self.0.store(v.to_bits(), Ordering::Release)
    }

    /// Apply `f` atomically. Returns the previous value, or `None` if `f`
    /// declined (returned `None`) for the value it saw.
    pub fn update(&self, mut f: impl FnMut(f32) -> Option<f32>) -> Option<f32> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                f(f32::from_bits(bits)).map(f32::to_bits)
            })
            .ok()
            .map(f32::from_bits)
    }

    /// Atomically add `delta`, clamping into [0, 1]. NaN is left untouched.
    pub fn add_clamped(&self, delta: f32) -> bool {
        self.update(|p| {
            if p.is_nan() {
                None
            } else {
                Some((p + delta).clamp(0.0, 1.0))
            }
        })
        .is_some()
    }
}

/// A task's mutable budget.
///
/// Priority is atomic and doubles as the deletion flag: once it is NaN the
/// owner is deleted and every mutation reports `false`.
#[derive(Debug)]
pub struct PriCell {
    priority: AtomicF32,
    durability: AtomicF32,
    quality: f32,
}

impl PriCell {
    pub fn new(b: Budget) -> Self {
        Self {
            priority: AtomicF32::new(b.priority),
            durability: AtomicF32::new(b.durability),
            quality: b.quality,
        }
    }

    /// Current priority; 0 when deleted.
    pub fn priority(&self) -> f32 {
        let p = self.priority.load();
        if p.is_nan() {
            0.0
        } else {
            p
        }
    }

    pub fn durability(&self) -> f32 {
        self.durability.load()
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    pub fn is_deleted(&self) -> bool {
        self.priority.load().is_nan()
    }

    /// Mark deleted. Returns `true` only for the call that performed the deletion.
    pub fn delete(&self) -> bool {
        self.priority
            .update(|p| if p.is_nan() { None } else { Some(f32::NAN) })
            .is_some()
    }

    /// `None` once deleted.
    pub fn snapshot(&self) -> Option<Budget> {
        let p = self.priority.load();
        if p.is_nan() {
            return None;
        }
        Some(Budget {
            priority: p,
            durability: self.durability.load(),
            quality: self.quality,
        })
    }

    /// Merge an incoming claim. `false` (and no effect) when deleted.
    pub fn merge(&self, incoming: &Budget, scale: f32, policy: Merge) -> bool {
        let q = self.quality;
        let merged = self.priority.update(|p| {
            if p.is_nan() {
                return None;
            }
            let mut b = Budget {
                priority: p,
                durability: 0.0,
                quality: q,
            };
            b.merge(incoming, scale, policy);
            Some(b.priority)
        });
        if merged.is_none() {
            return false;
        }
        let d = incoming.durability;
        self.durability.update(|old| Some(old.max(d)));
        true
    }

    /// Multiply priority by `(1 - rate)`. `false` when deleted.
    pub fn decay(&self, rate: f32) -> bool {
        let keep = 1.0 - rate.clamp(0.0, 1.0);
        self.priority
            .update(|p| if p.is_nan() { None } else { Some(p * keep) })
            .is_some()
    }

    /// Add `delta` (may be negative). `false` when deleted.
    pub fn add(&self, delta: f32) -> bool {
        self.priority.add_clamped(delta)
    }
}

impl Clone for PriCell {
    fn clone(&self) -> Self {
        Self {
            priority: AtomicF32::new(self.priority.load()),
            durability: AtomicF32::new(self.durability.load()),
            quality: self.quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deleted_cell_rejects_mutation() {
        let c = PriCell::new(Budget::new(0.5, 0.5, 0.5));
        assert!(c.merge(&Budget::new(0.2, 0.5, 0.5), 1.0, Merge::Plus));
        assert!((c.priority() - 0.7).abs() < 1e-6);
        assert!(c.delete());
        assert!(!c.delete(), "second delete is a no-op");
        assert!(c.is_deleted());
        assert!(!c.merge(&Budget::new(0.2, 0.5, 0.5), 1.0, Merge::Plus));
        assert!(!c.decay(0.1));
        assert!(!c.add(0.1));
        assert_eq!(c.priority(), 0.0);
        assert!(c.snapshot().is_none());
    }

    #[test]
    fn test_concurrent_penalties_are_not_lost() {
        let cell = AtomicF32::new(1.0);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..100 {
                        cell.add_clamped(-0.001);
                    }
                });
            }
        });
        assert!((cell.load() - 0.6).abs() < 1e-3);
    }
}
