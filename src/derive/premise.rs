//! Premise: one (task, belief) pairing considered for derivation.
//!
//! Built from a snapshot: the task and belief are shared immutable
//! `Arc<Task>`s and the budget numbers are copied, so premises can be
//! derived on any thread without touching the concept they came from.

use crate::budget::functions::ave_geo;
use crate::task::{PremiseSource, Task, TaskId};
use nars_contract::Term;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Premise {
    /// Concept the task-link was sampled from.
    pub concept: Term,
    pub task: Arc<Task>,
    /// Term-link target; matched by single-premise rules.
    pub belief_term: Term,
    /// Best belief about `belief_term` at the task's time, if any.
    pub belief: Option<Arc<Task>>,
    pub priority: f32,
    pub durability: f32,
    /// Task quality, combined with the belief's when there is one.
    pub quality: f32,
}

impl Premise {
    /// Combine link priorities; `None` when the result is below `min`
    /// or the task was deleted meanwhile.
    pub fn new(
        concept: Term,
        task: Arc<Task>,
        task_link_pri: f32,
        belief_term: Term,
        term_link_pri: f32,
        belief: Option<Arc<Task>>,
        min: f32,
    ) -> Option<Premise> {
        let budget = task.budget().snapshot()?;
        let priority = ave_geo(&[task_link_pri, term_link_pri]);
        if priority < min {
            return None;
        }
        let belief = belief.filter(|b| !b.is_deleted());
        let quality = match &belief {
            Some(b) => ave_geo(&[budget.quality, b.budget().quality()]),
            None => budget.quality,
        };
        Some(Premise {
            concept,
            task,
            belief_term,
            belief,
            priority,
            durability: budget.durability,
            quality,
        })
    }

    /// Term the belief pattern is matched against.
    pub fn belief_or_link(&self) -> &Term {
        self.belief.as_ref().map_or(&self.belief_term, |b| b.term())
    }

    pub fn task_link(&self) -> TaskId {
        self.task.id()
    }

    /// Where a derived task came from, for deletion feedback.
    pub fn source(&self) -> PremiseSource {
        PremiseSource {
            concept: self.concept.clone(),
            task_link: self.task.id(),
            term_link: self.belief_term.clone(),
        }
    }
}
