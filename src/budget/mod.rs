//! Budget: (priority, durability, quality) resource claims
//!
//! Every task and link competes for processing through its budget:
//!
//! ```text
//! ┌────────────┬──────────────────────────────────────────────────────┐
//! │ priority   │ current claim; decays every forgetting pass          │
//! │ durability │ how slowly priority decays; scales deletion feedback │
//! │ quality    │ stable intrinsic value; caps re-boosting             │
//! └────────────┴──────────────────────────────────────────────────────┘
//! ```
//!
//! All operations clamp to [0, 1]. Shared budgets live in [`PriCell`],
//! where a NaN priority marks the owner as deleted.

mod cell;
pub mod functions;

pub use cell::{AtomicF32, PriCell};
pub use functions::{
    activation, and, ave_ari, ave_geo, deletion_penalty, derived_budget, or, truth_to_quality,
};

use serde::{Deserialize, Serialize};

// =============================================================================
// MERGE POLICY
// =============================================================================

/// How an incoming claim combines with an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Merge {
    /// Keep the larger of the two (incoming scaled).
    Max,
    /// Add, clamped to 1.
    Plus,
    /// Quality-weighted average.
    Blend,
}

impl Merge {
    /// Combine two bare priorities (no quality available: blend is a plain mean).
    pub fn priority(self, existing: f32, incoming: f32, scale: f32) -> f32 {
        let incoming = incoming * scale;
        let p = match self {
            Merge::Max => existing.max(incoming),
            Merge::Plus => existing + incoming,
            Merge::Blend => (existing + incoming) / 2.0,
        };
        p.clamp(0.0, 1.0)
    }
}

impl Default for Merge {
    fn default() -> Self {
        Merge::Plus
    }
}

// =============================================================================
// BUDGET
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub priority: f32,
    pub durability: f32,
    pub quality: f32,
}

impl Budget {
    pub fn new(priority: f32, durability: f32, quality: f32) -> Self {
        Self {
            priority: unit(priority),
            durability: unit(durability),
            quality: unit(quality),
        }
    }

    /// Combine `incoming` (scaled) into `self`.
    ///
    /// Durability and quality follow the same policy as priority, except
    /// that `Plus` keeps the larger durability/quality instead of summing:
    /// repetition makes a claim louder, not more durable.
    pub fn merge(&mut self, incoming: &Budget, scale: f32, policy: Merge) {
        match policy {
            Merge::Max => {
                self.priority = self.priority.max(incoming.priority * scale);
                self.durability = self.durability.max(incoming.durability);
                self.quality = self.quality.max(incoming.quality);
            }
            Merge::Plus => {
                self.priority += incoming.priority * scale;
                self.durability = self.durability.max(incoming.durability);
                self.quality = self.quality.max(incoming.quality);
            }
            Merge::Blend => {
                let (q1, q2) = (self.quality, incoming.quality);
                let wsum = q1 + q2;
                let w = if wsum > 0.0 { q2 / wsum } else { 0.5 };
                self.priority = lerp(self.priority, incoming.priority * scale, w);
                self.durability = lerp(self.durability, incoming.durability, w);
                self.quality = lerp(q1, q2, w);
            }
        }
        self.clamp();
    }

    /// Multiply priority by `(1 - rate)`; durability decays too when `with_durability`.
    pub fn decay(&mut self, rate: f32, with_durability: bool) {
        let keep = 1.0 - rate.clamp(0.0, 1.0);
        self.priority *= keep;
        if with_durability {
            self.durability *= keep;
        }
    }

    /// Raise priority by `amount`, capped at `max(quality, current priority)`.
    pub fn boost(&mut self, amount: f32) {
        let ceiling = self.quality.max(self.priority);
        self.priority = unit((self.priority + amount.max(0.0)).min(ceiling));
    }

    /// Single-number summary used where one ranking value is needed.
    pub fn summary(&self) -> f32 {
        ave_geo(&[self.priority, self.durability, self.quality])
    }

    fn clamp(&mut self) {
        self.priority = unit(self.priority);
        self.durability = unit(self.durability);
        self.quality = unit(self.quality);
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            priority: 0.5,
            durability: 0.5,
            quality: 0.5,
        }
    }
}

fn lerp(a: f32, b: f32, w: f32) -> f32 {
    a + (b - a) * w
}

fn unit(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}
