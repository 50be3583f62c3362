//! Truth functions a rule can name.
//!
//! Each function takes the task's truth and, unless it is single-premise,
//! the belief's truth (already projected to the task's time).

use nars_contract::TruthValue;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TruthFn {
    /// A→B, B→C ⊢ A→C (forward chaining)
    Deduction,
    /// A→B, A→C ⊢ C→B (generalization)
    Induction,
    /// A→C, B→C ⊢ B→A (cause inference)
    Abduction,
    /// A→B, B→C ⊢ C→A
    Exemplification,
    /// A→B ⊢ B→A
    Conversion,
    /// (A⇒B) ⊢ (¬B⇒¬A)
    Contraposition,
    /// A→B, C↔A ⊢ C→B (similarity transfer)
    Analogy,
    /// A↔B, B↔C ⊢ A↔C
    Resemblance,
    /// A→C, B→C ⊢ A↔B (similarity from shared property)
    Comparison,
    Intersection,
    Union,
    Difference,
    DecomposePositive,
    DecomposeNegative,
    /// Truth passes through unchanged.
    Identity,
    /// Single-premise deduction against an implicit `<1, 0.9>`.
    StructuralDeduction,
    Negation,
    DesireStrong,
    DesireWeak,
    DesireDeduction,
    DesireInduction,
}

impl TruthFn {
    /// Every function with the name rules use for it.
    pub const ALL: &'static [(&'static str, TruthFn)] = &[
        ("Deduction", TruthFn::Deduction),
        ("Induction", TruthFn::Induction),
        ("Abduction", TruthFn::Abduction),
        ("Exemplification", TruthFn::Exemplification),
        ("Conversion", TruthFn::Conversion),
        ("Contraposition", TruthFn::Contraposition),
        ("Analogy", TruthFn::Analogy),
        ("Resemblance", TruthFn::Resemblance),
        ("Comparison", TruthFn::Comparison),
        ("Intersection", TruthFn::Intersection),
        ("Union", TruthFn::Union),
        ("Difference", TruthFn::Difference),
        ("DecomposePositive", TruthFn::DecomposePositive),
        ("DecomposeNegative", TruthFn::DecomposeNegative),
        ("Identity", TruthFn::Identity),
        ("StructuralDeduction", TruthFn::StructuralDeduction),
        ("Negation", TruthFn::Negation),
        ("DesireStrong", TruthFn::DesireStrong),
        ("DesireWeak", TruthFn::DesireWeak),
        ("DesireDeduction", TruthFn::DesireDeduction),
        ("DesireInduction", TruthFn::DesireInduction),
    ];

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<TruthFn> {
        Self::ALL
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, f)| *f)
    }

    pub fn name(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(_, f)| *f == self)
            .map_or("?", |(n, _)| n)
    }

    /// Whether the function reads only the task's truth.
    pub fn is_single(self) -> bool {
        matches!(
            self,
            TruthFn::Conversion
                | TruthFn::Contraposition
                | TruthFn::Identity
                | TruthFn::StructuralDeduction
                | TruthFn::Negation
        )
    }

    /// `None` when a two-premise function gets no belief.
    pub fn apply(self, task: &TruthValue, belief: Option<&TruthValue>) -> Option<TruthValue> {
        let single = match self {
            TruthFn::Conversion => Some(task.conversion()),
            TruthFn::Contraposition => Some(task.contraposition()),
            TruthFn::Identity => Some(*task),
            TruthFn::StructuralDeduction => Some(task.structural_deduction()),
            TruthFn::Negation => Some(task.negation()),
            _ => None,
        };
        if single.is_some() {
            return single;
        }
        let b = belief?;
        Some(match self {
            TruthFn::Deduction => task.deduction(b),
            TruthFn::Induction => task.induction(b),
            TruthFn::Abduction => task.abduction(b),
            TruthFn::Exemplification => task.exemplification(b),
            TruthFn::Analogy => task.analogy(b),
            TruthFn::Resemblance => task.resemblance(b),
            TruthFn::Comparison => task.comparison(b),
            TruthFn::Intersection => task.intersection(b),
            TruthFn::Union => task.union(b),
            TruthFn::Difference => task.difference(b),
            TruthFn::DecomposePositive => task.decompose_positive(b),
            TruthFn::DecomposeNegative => task.decompose_negative(b),
            TruthFn::DesireStrong => task.desire_strong(b),
            TruthFn::DesireWeak => task.desire_weak(b),
            TruthFn::DesireDeduction => task.desire_deduction(b),
            TruthFn::DesireInduction => task.desire_induction(b),
            TruthFn::Conversion
            | TruthFn::Contraposition
            | TruthFn::Identity
            | TruthFn::StructuralDeduction
            | TruthFn::Negation => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(TruthFn::from_name("deduction"), Some(TruthFn::Deduction));
        assert_eq!(TruthFn::from_name("DesireWeak"), Some(TruthFn::DesireWeak));
        assert_eq!(TruthFn::from_name("nonsense"), None);
        for (name, f) in TruthFn::ALL {
            assert_eq!(f.name(), *name);
        }
    }

    #[test]
    fn test_binary_needs_belief() {
        let t = TruthValue::new(0.9, 0.9);
        assert!(TruthFn::Deduction.apply(&t, None).is_none());
        assert!(TruthFn::Conversion.apply(&t, None).is_some());
        assert_eq!(TruthFn::Identity.apply(&t, None), Some(t));
    }

    #[test]
    fn test_deduction_reduces_confidence() {
        let p = TruthValue::new(0.9, 0.9);
        let c = TruthFn::Deduction.apply(&p, Some(&p)).unwrap();
        assert!(c.confidence < p.confidence);
    }
}
