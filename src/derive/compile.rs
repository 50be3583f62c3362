//! Compiled rule set with an index by premise shape.

use super::rule::{Rule, RuleError};
use crate::attention::CauseId;
use nars_contract::{Op, Term, VarKind};
use std::collections::HashMap;

/// Operator a pattern requires at its root; `None` accepts anything.
type Shape = (Option<Op>, Option<Op>);

fn root(pattern: &Term) -> Option<Op> {
    match pattern.op() {
        Op::Var(VarKind::Pattern) => None,
        op => Some(op),
    }
}

/// Rules in declaration order plus a lookup by (task op, belief op).
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    index: HashMap<Shape, Vec<usize>>,
}

impl RuleSet {
    /// Parse and index. Any malformed rule fails the whole set.
    ///
    /// Rule `i` is given cause id `i`; the engine registers causes in the
    /// same order.
    pub fn compile<S: AsRef<str>>(sources: &[S]) -> Result<RuleSet, RuleError> {
        let mut rules = Vec::with_capacity(sources.len());
        let mut index: HashMap<Shape, Vec<usize>> = HashMap::new();
        for (i, src) in sources.iter().enumerate() {
            let mut rule = Rule::parse(src.as_ref())?;
            rule.id = CauseId(i as u32);
            index
                .entry((root(&rule.task), root(&rule.belief)))
                .or_default()
                .push(i);
            rules.push(rule);
        }
        Ok(RuleSet { rules, index })
    }

    /// The built-in NAL-1 to NAL-7 table.
    pub fn standard() -> Result<RuleSet, RuleError> {
        Self::compile(STANDARD)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, i: usize) -> Option<&Rule> {
        self.rules.get(i)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules whose root operators fit a premise, in declaration order.
    pub fn candidates(&self, task: &Term, belief: &Term) -> Vec<&Rule> {
        let (t, b) = (Some(task.op()), Some(belief.op()));
        let mut ids: Vec<usize> = [(t, b), (t, None), (None, b), (None, None)]
            .iter()
            .filter_map(|k| self.index.get(k))
            .flatten()
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().map(|i| &self.rules[i]).collect()
    }
}

const STANDARD: &[&str] = &[
    // NAL-1/2 syllogisms
    "(A-->B), (B-->C), neqRCom(A,C) |- (A-->C), (Belief:Deduction, Goal:DesireWeak, Punctuation:Question)",
    "(A-->B), (C-->A), neqRCom(B,C) |- (C-->B), (Belief:Deduction, Punctuation:Question)",
    "(A-->B), (B-->C), neqRCom(A,C) |- (C-->A), (Belief:Exemplification)",
    "(A-->B), (A-->C), neqRCom(B,C) |- (C-->B), (Belief:Induction)",
    "(A-->B), (C-->B), neqRCom(A,C) |- (A-->C), (Belief:Abduction, Punctuation:Question)",
    "(A-->C), (B-->C), neqRCom(A,B) |- (A<->B), (Belief:Comparison)",
    "(C-->A), (C-->B), neqRCom(A,B) |- (A<->B), (Belief:Comparison)",
    "(A-->B), (C<->A), neqRCom(B,C) |- (C-->B), (Belief:Analogy, Goal:DesireStrong)",
    "(A<->B), (B<->C), neqRCom(A,C) |- (A<->C), (Belief:Resemblance)",
    "(A-->B), B |- (B-->A), (Belief:Conversion, Single)",
    // NAL-3 composition
    "(C-->A), (C-->B), neqRCom(A,B) |- (C-->(&,A,B)), (Belief:Intersection)",
    "(C-->A), (C-->B), neqRCom(A,B) |- (C-->(|,A,B)), (Belief:Union)",
    "(C-->A), (C-->B), neqRCom(A,B) |- (C-->(-,A,B)), (Belief:Difference)",
    "(A-->C), (B-->C), neqRCom(A,B) |- ((|,A,B)-->C), (Belief:Intersection)",
    "(A-->C), (B-->C), neqRCom(A,B) |- ((&,A,B)-->C), (Belief:Union)",
    // NAL-3 decomposition
    "(C-->(&,A,B)), C |- (C-->A), (Belief:StructuralDeduction, Goal:StructuralDeduction, Single)",
    "(C-->(&,A,B)), C |- (C-->B), (Belief:StructuralDeduction, Goal:StructuralDeduction, Single)",
    "((|,A,B)-->C), C |- (A-->C), (Belief:StructuralDeduction, Single)",
    "((|,A,B)-->C), C |- (B-->C), (Belief:StructuralDeduction, Single)",
    "(C-->(|,A,B)), (C-->A), neqRCom(A,B) |- (C-->B), (Belief:DecomposeNegative)",
    "(C-->(&,A,B)), (C-->A), neqRCom(A,B) |- (C-->B), (Belief:DecomposePositive)",
    // NAL-4 images
    "((*,A,B)-->R), R |- (A-->(/,R,_,B)), (Belief:Identity, Goal:Identity, Single)",
    "((*,A,B)-->R), R |- (B-->(/,R,A,_)), (Belief:Identity, Goal:Identity, Single)",
    "(A-->(/,R,_,B)), R |- ((*,A,B)-->R), (Belief:Identity, Goal:Identity, Single)",
    // NAL-5/6 implication
    "(A==>B), A |- B, (Belief:Deduction, Time:Forward)",
    "A, (A==>B) |- B, (Belief:Deduction, Time:Forward, Punctuation:Question)",
    "B, (A==>B) |- A, (Belief:Abduction, Goal:DesireDeduction, Time:Backward, Punctuation:Same)",
    "(A==>B), B |- A, (Belief:Abduction, Time:Backward)",
    "(A==>B), (B==>C), neqRCom(A,C) |- (A==>C), (Belief:Deduction)",
    "(A==>B), B |- ((--,B)==>(--,A)), (Belief:Contraposition, Single)",
    // conjunction decomposition
    "(&&,A,B), A |- B, (Belief:DecomposePositive, Goal:DesireStrong)",
    "(&&,A,B), A |- A, (Belief:StructuralDeduction, Goal:StructuralDeduction, Single)",
    // NAL-7 temporal induction and composition
    "A, B, neqRCom(A,B), notImpl(A), notImpl(B) |- (A ==>+- B), (Belief:Induction, Time:Dt)",
    "A, B, neqRCom(A,B), notImpl(A), notImpl(B) |- (A &&+- B), (Belief:Intersection, Goal:DesireStrong, Time:Dt)",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Term {
        Term::parse(s).unwrap()
    }

    #[test]
    fn test_standard_compiles() {
        let set = RuleSet::standard().expect("standard rules must compile");
        assert_eq!(set.len(), STANDARD.len());
        for (i, r) in set.rules().iter().enumerate() {
            assert_eq!(r.id, CauseId(i as u32));
        }
    }

    #[test]
    fn test_index_includes_wildcards() {
        let set = RuleSet::compile(&[
            "(A-->B), (B-->C) |- (A-->C), (Belief:Deduction)",
            "A, B, neqRCom(A,B) |- (A &&+- B), (Belief:Intersection, Time:Dt)",
            "(A==>B), A |- B, (Belief:Deduction, Time:Forward)",
        ])
        .unwrap();
        let inh = set.candidates(&t("(x-->y)"), &t("(y-->z)"));
        assert_eq!(inh.len(), 2);
        let imp = set.candidates(&t("(x==>y)"), &t("x"));
        assert_eq!(imp.len(), 2);
        assert_eq!(imp[0].id, CauseId(1), "declaration order is kept");
    }

    #[test]
    fn test_bad_rule_fails_the_set() {
        let err = RuleSet::compile(&["(A-->B), B |- (B-->A), (Belief:Nope)"]).unwrap_err();
        assert_eq!(err, RuleError::UnknownTruthFn("Nope".into()));
    }
}
