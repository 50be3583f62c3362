//! Tasks: the unit of work and of stored knowledge.
//!
//! A task is immutable after creation except for its budget, which decays
//! and is boosted in place through a [`PriCell`]. Deletion is a flag on
//! that cell: a deleted task stays readable by whoever still holds an
//! `Arc` to it, but every component must treat it as absent.

use crate::attention::CauseId;
use crate::budget::{Budget, PriCell};
use nars_contract::{Op, Punctuation, Stamp, Term, TruthValue, VarKind, ETERNAL};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle of a task in the engine's task store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id source. Used for task ids and for evidence serials.
#[derive(Debug)]
pub struct Serials(AtomicU64);

impl Serials {
    pub fn new(first: u64) -> Self {
        Self(AtomicU64::new(first))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for Serials {
    fn default() -> Self {
        Self::new(1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    Input,
    Revision,
    Derived,
}

/// The links a derived task came from, for deletion feedback.
#[derive(Clone, Debug, PartialEq)]
pub struct PremiseSource {
    /// Concept the premise was formed in.
    pub concept: Term,
    /// Its task-link.
    pub task_link: TaskId,
    /// Its term-link.
    pub term_link: Term,
}

// =============================================================================
// DRAFT
// =============================================================================

/// Everything needed to create a task except its id.
#[derive(Clone, Debug)]
pub struct TaskDraft {
    pub term: Term,
    pub punctuation: Punctuation,
    pub truth: Option<TruthValue>,
    pub occurrence: i64,
    pub stamp: Stamp,
    pub budget: Budget,
    pub origin: Origin,
    pub causes: Vec<CauseId>,
    pub source: Option<PremiseSource>,
}

/// Causes remembered per task; older contributors fall off.
pub const MAX_CAUSES: usize = 8;

impl TaskDraft {
    /// Canonical form, or `None` if the term cannot carry this punctuation.
    ///
    /// A negated term is stored unwrapped with negated truth. Beliefs and
    /// goals must be statements or conjunctions without query variables;
    /// no task may sit on a bare variable.
    pub fn normalized(mut self) -> Option<TaskDraft> {
        if self.term.is_neg() {
            self.term = self.term.unneg();
            self.truth = self.truth.map(|t| t.negation());
        }
        if matches!(self.term.op(), Op::Var(_)) {
            return None;
        }
        if self.punctuation.has_truth() {
            if self.truth.is_none() {
                return None;
            }
            if self.term.has_var(VarKind::Query) || self.term.has_var(VarKind::Pattern) {
                return None;
            }
            if !(self.term.is_statement() || self.term.op() == Op::Conj) {
                return None;
            }
        } else {
            self.truth = None;
        }
        self.causes.truncate(MAX_CAUSES);
        Some(self)
    }

    pub fn build(self, id: TaskId, creation: i64) -> Task {
        Task {
            id,
            term: self.term,
            punctuation: self.punctuation,
            truth: self.truth,
            occurrence: self.occurrence,
            stamp: self.stamp,
            budget: PriCell::new(self.budget),
            creation,
            origin: self.origin,
            causes: self.causes,
            source: self.source,
        }
    }
}

// =============================================================================
// TASK
// =============================================================================

#[derive(Debug)]
pub struct Task {
    id: TaskId,
    term: Term,
    punctuation: Punctuation,
    truth: Option<TruthValue>,
    occurrence: i64,
    stamp: Stamp,
    budget: PriCell,
    creation: i64,
    origin: Origin,
    causes: Vec<CauseId>,
    source: Option<PremiseSource>,
}

impl Task {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn term(&self) -> &Term {
        &self.term
    }

    pub fn punctuation(&self) -> Punctuation {
        self.punctuation
    }

    pub fn truth(&self) -> Option<TruthValue> {
        self.truth
    }

    /// Confidence, 0 for questions.
    pub fn conf(&self) -> f32 {
        self.truth.map_or(0.0, |t| t.confidence)
    }

    pub fn occurrence(&self) -> i64 {
        self.occurrence
    }

    pub fn is_eternal(&self) -> bool {
        self.occurrence == ETERNAL
    }

    pub fn stamp(&self) -> &Stamp {
        &self.stamp
    }

    pub fn budget(&self) -> &PriCell {
        &self.budget
    }

    pub fn priority(&self) -> f32 {
        self.budget.priority()
    }

    pub fn creation(&self) -> i64 {
        self.creation
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn causes(&self) -> &[CauseId] {
        &self.causes
    }

    pub fn source(&self) -> Option<&PremiseSource> {
        self.source.as_ref()
    }

    pub fn is_belief(&self) -> bool {
        self.punctuation == Punctuation::Belief
    }

    pub fn is_goal(&self) -> bool {
        self.punctuation == Punctuation::Goal
    }

    pub fn is_query(&self) -> bool {
        self.punctuation.is_query()
    }

    pub fn is_input(&self) -> bool {
        self.origin == Origin::Input
    }

    pub fn is_deleted(&self) -> bool {
        self.budget.is_deleted()
    }

    /// Returns `true` only for the call that performed the deletion.
    pub fn delete(&self) -> bool {
        self.budget.delete()
    }

    /// Truth seen from `when` (see [`crate::time::project`]).
    pub fn truth_at(&self, when: i64, dur: u32) -> Option<TruthValue> {
        self.truth
            .map(|t| crate::time::project(&t, self.occurrence, when, dur))
    }

    /// Strength used to scale deletion feedback: confidence for
    /// judgements, quality for queries.
    pub fn strength(&self) -> f32 {
        match self.truth {
            Some(t) => t.confidence,
            None => self.budget.quality(),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2} {}{}", self.priority(), self.term, self.punctuation)?;
        if self.occurrence != ETERNAL {
            write!(f, " @{}", self.occurrence)?;
        }
        if let Some(t) = self.truth {
            write!(f, " {}", t)?;
        }
        write!(f, " {:?}", self.stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(term: &str, punct: Punctuation, truth: Option<TruthValue>) -> TaskDraft {
        TaskDraft {
            term: Term::parse(term).unwrap(),
            punctuation: punct,
            truth,
            occurrence: ETERNAL,
            stamp: Stamp::input(1),
            budget: Budget::default(),
            origin: Origin::Input,
            causes: vec![],
            source: None,
        }
    }

    #[test]
    fn test_negation_is_unwrapped() {
        let d = draft("(--,(a-->b))", Punctuation::Belief, Some(TruthValue::new(0.9, 0.9)))
            .normalized()
            .unwrap();
        assert_eq!(d.term.to_string(), "(a-->b)");
        assert!((d.truth.unwrap().frequency - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_unbelievable_terms() {
        let t = Some(TruthValue::certain_true());
        assert!(draft("a", Punctuation::Belief, t).normalized().is_none());
        assert!(draft("(?x-->b)", Punctuation::Belief, t).normalized().is_none());
        assert!(draft("(?x-->b)", Punctuation::Question, None).normalized().is_some());
        assert!(draft("a", Punctuation::Question, None).normalized().is_some());
    }

    #[test]
    fn test_delete_flag() {
        let task = draft("(a-->b)", Punctuation::Belief, Some(TruthValue::certain_true()))
            .build(TaskId(1), 0);
        assert!(!task.is_deleted());
        assert!(task.delete());
        assert!(task.is_deleted());
        assert_eq!(task.priority(), 0.0);
        assert!(task.to_string().contains("(a-->b)."));
    }
}
