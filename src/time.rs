//! Clock and temporal projection.
//!
//! Time is a discrete cycle counter driven from outside. One duration
//! (`dur`) is the window within which two events count as simultaneous
//! and the scale on which confidence fades with temporal distance.

use nars_contract::{TruthValue, ETERNAL};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of "now" for the engine.
pub trait Clock: Send + Sync {
    fn time(&self) -> i64;

    fn dur(&self) -> u32;

    /// Advance one step; returns the new time.
    fn tick(&self) -> i64;
}

/// Cycle counter with a fixed duration.
#[derive(Debug)]
pub struct CycleClock {
    now: AtomicI64,
    dur: u32,
}

impl CycleClock {
    pub fn new(dur: u32) -> Self {
        Self {
            now: AtomicI64::new(0),
            dur: dur.max(1),
        }
    }

    /// Jump to an explicit time (tests, replay).
    pub fn set(&self, t: i64) {
        self.now.store(t, Ordering::Release);
    }
}

impl Default for CycleClock {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Clock for CycleClock {
    fn time(&self) -> i64 {
        self.now.load(Ordering::Acquire)
    }

    fn dur(&self) -> u32 {
        self.dur
    }

    fn tick(&self) -> i64 {
        self.now.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Confidence retention factor for moving evidence from `from` to `to`.
///
/// `dur / (dur + distance)`: 1 at zero distance, 1/2 one duration away.
/// Eternal endpoints project without loss.
pub fn projection_factor(from: i64, to: i64, dur: u32) -> f32 {
    if from == ETERNAL || to == ETERNAL {
        return 1.0;
    }
    let d = dur.max(1) as f64;
    let dist = (from - to).unsigned_abs() as f64;
    (d / (d + dist)) as f32
}

/// Truth of an event at `from`, seen from `to`. Never raises confidence.
pub fn project(truth: &TruthValue, from: i64, to: i64, dur: u32) -> TruthValue {
    truth.project(projection_factor(from, to, dur))
}

/// Whether two occurrences fall within one duration of each other.
pub fn coincident(a: i64, b: i64, dur: u32) -> bool {
    if a == ETERNAL || b == ETERNAL {
        return a == b;
    }
    (a - b).unsigned_abs() <= dur as u64
}
