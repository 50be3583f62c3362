//! NARS Truth Values: <frequency, confidence>
//!
//! Based on NAL (Non-Axiomatic Logic) truth functions.
//! Pure arithmetic: no I/O, no storage dependencies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// NARS truth value: <frequency, confidence>
///
/// - **frequency** (f): Proportion of positive evidence (0.0 - 1.0)
/// - **confidence** (c): Reliability of the frequency (0.0 - [`MAX_CONF`])
///
/// Can also be viewed as evidence counts:
/// - w+ = positive evidence
/// - w- = negative evidence
/// - w = w+ + w- = total evidence
/// - f = w+ / w
/// - c = w / (w + k) where k is the "evidential horizon"
///
/// Confidence never reaches 1.0: certainty is only approached asymptotically.
///
/// [`MAX_CONF`]: TruthValue::MAX_CONF
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruthValue {
    pub frequency: f32,
    pub confidence: f32,
}

impl TruthValue {
    /// Evidential horizon parameter (controls confidence scaling).
    pub const HORIZON: f32 = 1.0;

    /// Upper bound on confidence.
    pub const MAX_CONF: f32 = 0.99;

    /// Resolution at which two truth values are considered the same.
    pub const EPSILON: f32 = 0.01;

    /// Create truth value from frequency and confidence.
    ///
    /// Out-of-range inputs are clamped; confidence is held below [`Self::MAX_CONF`].
    pub fn new(frequency: f32, confidence: f32) -> Self {
        debug_assert!(frequency.is_finite() && confidence.is_finite());
        Self {
            frequency: frequency.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, Self::MAX_CONF),
        }
    }

    /// Create from positive/negative evidence counts.
    pub fn from_evidence(positive: f32, negative: f32) -> Self {
        let total = positive + negative;
        if total <= 0.0 {
            return Self::unknown();
        }
        Self::new(positive / total, w2c(total))
    }

    /// Create from a frequency and a total evidence weight.
    pub fn from_weight(frequency: f32, weight: f32) -> Self {
        Self::new(frequency, w2c(weight))
    }

    /// Default input truth for beliefs and goals: <1.0, 0.9>
    pub fn certain_true() -> Self {
        Self {
            frequency: 1.0,
            confidence: 0.9,
        }
    }

    /// Certain false: <0.0, 0.9>
    pub fn certain_false() -> Self {
        Self {
            frequency: 0.0,
            confidence: 0.9,
        }
    }

    /// Unknown: <0.5, 0.0>
    pub fn unknown() -> Self {
        Self {
            frequency: 0.5,
            confidence: 0.0,
        }
    }

    /// Total evidence weight.
    pub fn weight(&self) -> f32 {
        c2w(self.confidence)
    }

    /// Convert to evidence counts (w+, w-).
    pub fn to_evidence(&self) -> (f32, f32) {
        let w = self.weight();
        (w * self.frequency, w * (1.0 - self.frequency))
    }

    /// Expected value (decision-making utility).
    ///
    /// e = c * (f - 0.5) + 0.5
    pub fn expectation(&self) -> f32 {
        self.confidence * (self.frequency - 0.5) + 0.5
    }

    /// Is this truth value "positive" (expectation > 0.5)?
    pub fn is_positive(&self) -> bool {
        self.expectation() > 0.5
    }

    /// Is this highly confident?
    pub fn is_confident(&self) -> bool {
        self.confidence > 0.7
    }

    /// Quantize frequency and confidence to `resolution`.
    pub fn dither(&self, resolution: f32) -> TruthValue {
        let q = |x: f32| (x / resolution).round() * resolution;
        TruthValue::new(q(self.frequency), q(self.confidence).max(0.0))
    }

    /// Whether the two values differ by at least `resolution` in either component.
    pub fn differs_from(&self, other: &TruthValue, resolution: f32) -> bool {
        (self.frequency - other.frequency).abs() >= resolution
            || (self.confidence - other.confidence).abs() >= resolution
    }

    /// Scale confidence by a projection factor in [0, 1].
    ///
    /// Projection can only lose confidence, never gain it.
    pub fn project(&self, factor: f32) -> TruthValue {
        let factor = factor.clamp(0.0, 1.0);
        TruthValue::new(self.frequency, self.confidence * factor)
    }

    /// Confidence of the same evidence viewed as timeless.
    pub fn eternalize(&self) -> TruthValue {
        TruthValue::new(self.frequency, w2c(self.confidence))
    }

    // === Truth Functions ===

    /// Revision: Combine two truth values with independent evidence.
    ///
    /// Used when: Two independent sources provide evidence for same statement
    pub fn revision(&self, other: &TruthValue) -> TruthValue {
        let w1 = self.weight();
        let w2 = other.weight();
        let w = w1 + w2;
        if w <= 0.0 {
            return Self::unknown();
        }
        let f = (w1 * self.frequency + w2 * other.frequency) / w;
        TruthValue::new(f, w2c(w))
    }

    /// Negation: NOT operation
    pub fn negation(&self) -> TruthValue {
        TruthValue {
            frequency: 1.0 - self.frequency,
            confidence: self.confidence,
        }
    }

    /// Deduction: A→B, B→C ⊢ A→C
    ///
    /// Forward chaining through implications
    pub fn deduction(&self, other: &TruthValue) -> TruthValue {
        let f = self.frequency * other.frequency;
        let c = self.confidence * other.confidence * f;
        TruthValue::new(f, c)
    }

    /// Induction: A→B, A→C ⊢ B→C
    ///
    /// Generalizing from shared premise. Weak: confidence is evidence-limited.
    pub fn induction(&self, other: &TruthValue) -> TruthValue {
        other.abduction(self)
    }

    /// Abduction: A→B, C→B ⊢ A→C
    ///
    /// Inferring cause from shared effect.
    pub fn abduction(&self, other: &TruthValue) -> TruthValue {
        let w = self.frequency * self.confidence * other.confidence;
        TruthValue::new(other.frequency, w2c(w))
    }

    /// Exemplification: A→B, B→C ⊢ C→A
    pub fn exemplification(&self, other: &TruthValue) -> TruthValue {
        let w = self.frequency * other.frequency * self.confidence * other.confidence;
        TruthValue::new(1.0, w2c(w))
    }

    /// Conversion: A→B ⊢ B→A
    pub fn conversion(&self) -> TruthValue {
        TruthValue::new(1.0, w2c(self.frequency * self.confidence))
    }

    /// Contraposition: (A⇒B) ⊢ (¬B⇒¬A)
    pub fn contraposition(&self) -> TruthValue {
        TruthValue::new(0.0, w2c((1.0 - self.frequency) * self.confidence))
    }

    /// Analogy: A→B, A↔C ⊢ C→B
    ///
    /// Transferring relation via similarity
    pub fn analogy(&self, other: &TruthValue) -> TruthValue {
        let f = self.frequency * other.frequency;
        let c = self.confidence * other.confidence * other.frequency;
        TruthValue::new(f, c)
    }

    /// Resemblance: A↔B, B↔C ⊢ A↔C
    pub fn resemblance(&self, other: &TruthValue) -> TruthValue {
        let f = self.frequency * other.frequency;
        let c = self.confidence * other.confidence * or(self.frequency, other.frequency);
        TruthValue::new(f, c)
    }

    /// Comparison: A→B, C→B ⊢ A↔C
    ///
    /// NAL standard: AND/OR ratio: f = (f1*f2) / (f1+f2 - f1*f2)
    pub fn comparison(&self, other: &TruthValue) -> TruthValue {
        let f0 = or(self.frequency, other.frequency);
        let f = if f0 <= 0.0 {
            0.0
        } else {
            self.frequency * other.frequency / f0
        };
        let w = f0 * self.confidence * other.confidence;
        TruthValue::new(f, w2c(w))
    }

    /// Intersection: A, B ⊢ A ∧ B
    pub fn intersection(&self, other: &TruthValue) -> TruthValue {
        let f = self.frequency * other.frequency;
        let c = self.confidence * other.confidence;
        TruthValue::new(f, c)
    }

    /// Union: A, B ⊢ A ∨ B
    pub fn union(&self, other: &TruthValue) -> TruthValue {
        let f = or(self.frequency, other.frequency);
        let c = self.confidence * other.confidence;
        TruthValue::new(f, c)
    }

    /// Difference: A, B ⊢ A − B
    pub fn difference(&self, other: &TruthValue) -> TruthValue {
        let f = self.frequency * (1.0 - other.frequency);
        let c = self.confidence * other.confidence;
        TruthValue::new(f, c)
    }

    /// Decompose a conjunction: (A ∧ B), A ⊢ B
    pub fn decompose_positive(&self, other: &TruthValue) -> TruthValue {
        let f = self.frequency * other.frequency;
        TruthValue::new(f, f * self.confidence * other.confidence)
    }

    /// Decompose a conjunction: (A ∧ B), ¬A ⊢ ¬B  (negated result)
    pub fn decompose_negative(&self, other: &TruthValue) -> TruthValue {
        let v0 = self.negation().intersection(other);
        TruthValue::new(1.0 - v0.frequency, v0.frequency * v0.confidence)
    }

    /// Structural deduction against an implicit certain premise.
    pub fn structural_deduction(&self) -> TruthValue {
        self.deduction(&TruthValue::new(1.0, 0.9))
    }

    // === Desire Functions (goals) ===

    /// Strong desire transfer: goal B, belief (A⇒B) ⊢ goal A
    pub fn desire_strong(&self, other: &TruthValue) -> TruthValue {
        let f = self.frequency * other.frequency;
        let c = self.confidence * other.confidence * other.frequency;
        TruthValue::new(f, c)
    }

    /// Weak desire transfer, discounted by one unit of evidence.
    pub fn desire_weak(&self, other: &TruthValue) -> TruthValue {
        let f = self.frequency * other.frequency;
        let c = self.confidence * other.confidence * other.frequency * w2c(1.0);
        TruthValue::new(f, c)
    }

    /// Deductive desire.
    pub fn desire_deduction(&self, other: &TruthValue) -> TruthValue {
        let f = self.frequency * other.frequency;
        let c = self.confidence * other.confidence;
        TruthValue::new(f, c)
    }

    /// Inductive desire.
    pub fn desire_induction(&self, other: &TruthValue) -> TruthValue {
        let w = other.frequency * self.confidence * other.confidence;
        TruthValue::new(self.frequency, w2c(w))
    }
}

/// Evidence weight → confidence.
pub fn w2c(w: f32) -> f32 {
    if w <= 0.0 {
        return 0.0;
    }
    (w / (w + TruthValue::HORIZON)).min(TruthValue::MAX_CONF)
}

/// Confidence → evidence weight.
pub fn c2w(c: f32) -> f32 {
    let c = c.clamp(0.0, TruthValue::MAX_CONF);
    TruthValue::HORIZON * c / (1.0 - c)
}

/// Probabilistic OR.
pub fn or(a: f32, b: f32) -> f32 {
    1.0 - (1.0 - a) * (1.0 - b)
}

impl fmt::Debug for TruthValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{:.2}, {:.2}>", self.frequency, self.confidence)
    }
}

impl fmt::Display for TruthValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{:.2};{:.2}%", self.frequency, self.confidence)
    }
}

impl Default for TruthValue {
    fn default() -> Self {
        Self::unknown()
    }
}
