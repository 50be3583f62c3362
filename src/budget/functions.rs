//! Budget arithmetic: fuzzy connectives, quality of truth, derived and
//! deletion budgets.

use super::Budget;
use nars_contract::TruthValue;

/// Fuzzy AND (product).
pub fn and(xs: &[f32]) -> f32 {
    xs.iter().product()
}

/// Fuzzy OR: `1 - Π(1 - x)`.
pub fn or(xs: &[f32]) -> f32 {
    1.0 - xs.iter().map(|x| 1.0 - x).product::<f32>()
}

/// Arithmetic mean; 0 for an empty slice.
pub fn ave_ari(xs: &[f32]) -> f32 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f32>() / xs.len() as f32
}

/// Geometric mean; 0 for an empty slice.
pub fn ave_geo(xs: &[f32]) -> f32 {
    if xs.is_empty() {
        return 0.0;
    }
    and(xs).max(0.0).powf(1.0 / xs.len() as f32)
}

/// Quality of a judgement: confident, decisive truth is worth keeping.
///
/// Negative evidence is discounted but not worthless.
pub fn truth_to_quality(t: &TruthValue) -> f32 {
    let e = t.expectation();
    e.max((1.0 - e) * 0.75)
}

/// Budget of a derived task.
///
/// `priority` and `durability` come from the premise (task-link and
/// term-link combined). Priority is further discounted by the
/// conclusion's quality, its complexity and the rule's cost factor
/// `cost ∈ (0, 1]`. Questions (no truth) get a neutral quality.
pub fn derived_budget(
    priority: f32,
    durability: f32,
    truth: Option<&TruthValue>,
    volume: u32,
    cost: f32,
) -> Budget {
    let quality = truth.map(truth_to_quality).unwrap_or(0.5);
    let simplicity = 1.0 / (1.0 + volume.saturating_sub(1) as f32 / 16.0);
    Budget::new(
        priority * quality * simplicity * cost.clamp(0.0, 1.0),
        durability * simplicity.sqrt(),
        quality,
    )
}

/// Priority penalty applied to the links that produced a task which was
/// later evicted unused.
pub fn deletion_penalty(strength: f32, durability: f32, scale: f32) -> f32 {
    (strength * durability * scale).clamp(0.0, 1.0)
}

/// How strongly a task activates the concepts it is linked into.
pub fn activation(budget: &Budget) -> f32 {
    budget.priority * or(&[budget.durability, budget.quality])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.001
    }

    #[test]
    fn test_connectives() {
        assert!(approx_eq(and(&[0.5, 0.5]), 0.25));
        assert!(approx_eq(or(&[0.5, 0.5]), 0.75));
        assert!(approx_eq(ave_ari(&[0.2, 0.4]), 0.3));
        assert!(approx_eq(ave_geo(&[0.25, 1.0]), 0.5));
        assert_eq!(ave_geo(&[]), 0.0);
    }

    #[test]
    fn test_quality_prefers_decisive_truth() {
        let strong = truth_to_quality(&TruthValue::new(1.0, 0.9));
        let weak = truth_to_quality(&TruthValue::new(0.5, 0.9));
        let negative = truth_to_quality(&TruthValue::new(0.0, 0.9));
        assert!(strong > negative && negative > weak);
        assert!(approx_eq(negative, 0.95 * 0.75));
    }

    #[test]
    fn test_derived_budget_penalizes_volume() {
        let t = TruthValue::new(1.0, 0.8);
        let small = derived_budget(0.8, 0.5, Some(&t), 3, 1.0);
        let big = derived_budget(0.8, 0.5, Some(&t), 30, 1.0);
        assert!(small.priority > big.priority);
        assert!(small.priority <= 0.8);
    }

    #[test]
    fn test_deletion_penalty_bounded() {
        assert!(approx_eq(deletion_penalty(0.9, 0.5, 0.5), 0.225));
        assert_eq!(deletion_penalty(1.0, 1.0, 10.0), 1.0);
    }
}
