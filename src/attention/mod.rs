//! Attention: the meta-goal economy.
//!
//! Every internal process that can produce tasks owns a [`CauseId`]. When a
//! task it contributed to achieves something the system values (a new
//! belief, an answer, an accurate prediction) the cause is credited
//! against one of seven fixed [`MetaGoal`]s. Periodically each goal's
//! accumulated credit is normalized against its own running magnitude,
//! weighted, summed, and folded into the cause's value with momentum.
//! The [`Focus`] scheduler spends iterations in proportion to value per
//! unit of time.
//!
//! ```text
//!  credit(causes, goal, x) ─► acc[cause][goal] += x / |causes|
//!                                  │ update()
//!                                  ▼
//!  value' = m·value + (1-m)·Σ_g w_g · acc[g] / ema(max |acc[g]|)
//! ```

mod focus;

pub use focus::{Causable, FnCausable, Focus, FocusEntry, FocusParams};

use crate::budget::AtomicF32;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a registered cause.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CauseId(pub u32);

impl fmt::Display for CauseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// System-level value signals. The sign of the default weight says
/// whether a goal is rewarded or charged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetaGoal {
    /// Input absorbed; a cost.
    Perceive,
    Believe,
    Desire,
    Answer,
    Action,
    Accurate,
    /// Predictions contradicted by later input; a cost.
    Inaccurate,
}

impl MetaGoal {
    pub const COUNT: usize = 7;

    pub const ALL: [MetaGoal; Self::COUNT] = [
        MetaGoal::Perceive,
        MetaGoal::Believe,
        MetaGoal::Desire,
        MetaGoal::Answer,
        MetaGoal::Action,
        MetaGoal::Accurate,
        MetaGoal::Inaccurate,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn default_weights() -> [f32; Self::COUNT] {
        [-0.05, 0.1, 0.15, 0.3, 0.3, 0.2, -0.3]
    }
}

struct Cause {
    name: String,
    acc: [AtomicF32; MetaGoal::COUNT],
    value: AtomicF32,
}

/// Per-cause value summary.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CauseValue {
    pub id: CauseId,
    pub name: String,
    pub value: f32,
}

/// Registry of causes and their learned values.
pub struct Causes {
    causes: RwLock<Vec<Cause>>,
    /// Running magnitude per goal, for normalization.
    magnitude: Mutex<[f32; MetaGoal::COUNT]>,
}

impl Default for Causes {
    fn default() -> Self {
        Self::new()
    }
}

impl Causes {
    pub fn new() -> Self {
        Self {
            causes: RwLock::new(Vec::new()),
            magnitude: Mutex::new([0.0; MetaGoal::COUNT]),
        }
    }

    pub fn register(&self, name: impl Into<String>) -> CauseId {
        let mut causes = self.causes.write();
        let id = CauseId(causes.len() as u32);
        causes.push(Cause {
            name: name.into(),
            acc: std::array::from_fn(|_| AtomicF32::new(0.0)),
            value: AtomicF32::new(0.0),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.causes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn name(&self, id: CauseId) -> Option<String> {
        self.causes.read().get(id.0 as usize).map(|c| c.name.clone())
    }

    /// Split `strength` evenly over `causes` under `goal`.
    pub fn credit(&self, causes: &[CauseId], goal: MetaGoal, strength: f32) {
        if causes.is_empty() || !strength.is_finite() {
            return;
        }
        let share = strength / causes.len() as f32;
        let registry = self.causes.read();
        for id in causes {
            if let Some(c) = registry.get(id.0 as usize) {
                c.acc[goal.index()].update(|v| Some(v + share));
            }
        }
    }

    /// Fold accumulated credit into values and reset the accumulators.
    pub fn update(&self, weights: &[f32; MetaGoal::COUNT], momentum: f32) {
        let registry = self.causes.read();
        if registry.is_empty() {
            return;
        }
        let drained: Vec<[f32; MetaGoal::COUNT]> = registry
            .iter()
            .map(|c| std::array::from_fn(|g| c.acc[g].update(|_| Some(0.0)).unwrap_or(0.0)))
            .collect();

        let mut mag = self.magnitude.lock();
        for g in 0..MetaGoal::COUNT {
            let peak = drained.iter().map(|a| a[g].abs()).fold(0.0f32, f32::max);
            mag[g] = 0.9 * mag[g] + 0.1 * peak;
        }
        let momentum = momentum.clamp(0.0, 1.0);
        for (cause, acc) in registry.iter().zip(&drained) {
            let fresh: f32 = (0..MetaGoal::COUNT)
                .filter(|&g| mag[g] > f32::EPSILON)
                .map(|g| weights[g] * acc[g] / mag[g])
                .sum();
            cause
                .value
                .update(|v| Some(momentum * v + (1.0 - momentum) * fresh));
        }
    }

    pub fn value(&self, id: CauseId) -> f32 {
        self.causes
            .read()
            .get(id.0 as usize)
            .map_or(0.0, |c| c.value.load())
    }

    pub fn values(&self) -> Vec<CauseValue> {
        self.causes
            .read()
            .iter()
            .enumerate()
            .map(|(i, c)| CauseValue {
                id: CauseId(i as u32),
                name: c.name.clone(),
                value: c.value.load(),
            })
            .collect()
    }
}

impl fmt::Debug for Causes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Causes").field("len", &self.len()).finish()
    }
}
