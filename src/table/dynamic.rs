//! Structural truth models.
//!
//! Some compounds never need their own evidence: the truth of
//! `(M --> (&,A,B))` follows from `(M --> A)` and `(M --> B)`. Such terms
//! get a model instead of a stored value and are evaluated on demand.
//!
//! | Shape | Model |
//! |-------|-------|
//! | `(M-->(&,..))`, `((|,..)-->M)`, `(&&,..)` | Intersection |
//! | `(M-->(|,..))`, `((&,..)-->M)` | Union |
//! | `(M-->(-,A,B))`, `((~,A,B)-->M)` | Difference |
//! | `(A-->(/,R,_,B))`, `((\,R,_,B)-->A)` | Identity |

use nars_contract::{Op, Term, TruthValue, DTERNAL};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DynamicModel {
    Intersection,
    Union,
    Difference,
    Identity,
}

impl DynamicModel {
    /// Model implied by the shape of `term`, if any.
    pub fn of(term: &Term) -> Option<DynamicModel> {
        match term.op() {
            Op::Conj if matches!(term.dt(), DTERNAL | 0) => Some(Self::Intersection),
            Op::Inh => {
                let (s, p) = (term.subject()?, term.predicate()?);
                match (s.op(), p.op()) {
                    (_, Op::SectExt) | (Op::SectInt, _) => Some(Self::Intersection),
                    (_, Op::SectInt) | (Op::SectExt, _) => Some(Self::Union),
                    (_, Op::DiffExt) | (Op::DiffInt, _) => Some(Self::Difference),
                    (_, Op::ImgExt) | (Op::ImgInt, _) => Some(Self::Identity),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Statements whose truths determine `term`'s.
    pub fn components(self, term: &Term) -> Vec<Term> {
        if term.op() == Op::Conj {
            return term.subs().to_vec();
        }
        let (Some(s), Some(p)) = (term.subject(), term.predicate()) else {
            return Vec::new();
        };
        if self == Self::Identity {
            return product_form(s, p).into_iter().collect();
        }
        let inh = |a: &Term, b: &Term| Term::statement(Op::Inh, a.clone(), b.clone()).ok();
        let out: Option<Vec<Term>> = if matches!(p.op(), Op::SectExt | Op::SectInt | Op::DiffExt) {
            p.subs().iter().map(|x| inh(s, x)).collect()
        } else {
            s.subs().iter().map(|x| inh(x, p)).collect()
        };
        out.unwrap_or_default()
    }

    /// Evaluate at `when` from component truths supplied by `resolve`.
    /// Negated components resolve through their positive form.
    pub fn truth(
        self,
        term: &Term,
        when: i64,
        resolve: &dyn Fn(&Term, i64) -> Option<TruthValue>,
    ) -> Option<TruthValue> {
        let components = self.components(term);
        if components.is_empty() {
            return None;
        }
        let truths = components
            .iter()
            .map(|c| {
                if c.is_neg() {
                    resolve(&c.unneg(), when).map(|t| t.negation())
                } else {
                    resolve(c, when)
                }
            })
            .collect::<Option<Vec<_>>>()?;
        match self {
            Self::Intersection => truths.into_iter().reduce(|a, b| a.intersection(&b)),
            Self::Union => truths.into_iter().reduce(|a, b| a.union(&b)),
            Self::Difference => match truths.as_slice() {
                [a, b] => Some(a.difference(b)),
                _ => None,
            },
            Self::Identity => truths.first().copied(),
        }
    }
}

/// `(A --> (/,R,_,B))` ⇔ `((*,A,B) --> R)`; `((\,R,_,B) --> A)` ⇔ `(R --> (*,A,B))`.
fn product_form(s: &Term, p: &Term) -> Option<Term> {
    let fill = |img: &Term, with: &Term| -> Option<(Term, Term)> {
        let (rel, rest) = img.subs().split_first()?;
        let items = rest
            .iter()
            .map(|x| if x.is_placeholder() { with.clone() } else { x.clone() })
            .collect();
        Some((rel.clone(), Term::compound(Op::Prod, items, DTERNAL).ok()?))
    };
    match (s.op(), p.op()) {
        (_, Op::ImgExt) => {
            let (rel, prod) = fill(p, s)?;
            Term::statement(Op::Inh, prod, rel).ok()
        }
        (Op::ImgInt, _) => {
            let (rel, prod) = fill(s, p)?;
            Term::statement(Op::Inh, rel, prod).ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn t(s: &str) -> Term {
        Term::parse(s).unwrap()
    }

    #[test]
    fn test_model_from_shape() {
        assert_eq!(DynamicModel::of(&t("(m-->(&,a,b))")), Some(DynamicModel::Intersection));
        assert_eq!(DynamicModel::of(&t("((&,a,b)-->m)")), Some(DynamicModel::Union));
        assert_eq!(DynamicModel::of(&t("(m-->(-,a,b))")), Some(DynamicModel::Difference));
        assert_eq!(DynamicModel::of(&t("(a-->(/,r,_,b))")), Some(DynamicModel::Identity));
        assert_eq!(DynamicModel::of(&t("(a-->b)")), None);
    }

    #[test]
    fn test_intersection_from_components() {
        let mut known = HashMap::new();
        known.insert(t("(m-->a)"), TruthValue::new(1.0, 0.9));
        known.insert(t("(m-->b)"), TruthValue::new(0.5, 0.9));
        let resolve = |x: &Term, _: i64| known.get(x).copied();
        let term = t("(m-->(&,a,b))");
        let v = DynamicModel::Intersection.truth(&term, 0, &resolve).unwrap();
        assert!((v.frequency - 0.5).abs() < 1e-6);
        let missing = t("(m-->(&,a,c))");
        assert!(DynamicModel::Intersection.truth(&missing, 0, &resolve).is_none());
    }

    #[test]
    fn test_image_identity() {
        let term = t("(a-->(/,r,_,b))");
        let comps = DynamicModel::Identity.components(&term);
        assert_eq!(comps, vec![t("((*,a,b)-->r)")]);
    }
}
