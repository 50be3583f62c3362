//! Concepts: the addressable unit of memory.
//!
//! One concept per concept-normalized term. A concept owns two link bags
//! and, unless it is a negation, its four tables:
//!
//! ```text
//! Concept (term, kind, state)
//! ├── task_links : HijackBag<TaskId, ()>   tasks to reason about here
//! ├── term_links : HijackBag<Term, ()>     related concepts
//! └── tables     : Mutex<Tables>           beliefs / goals / questions / quests
//! ```
//!
//! Links hold handles (`TaskId`, `Term`), never the objects themselves;
//! resolving a handle goes through the engine's task store or the
//! [`ConceptIndex`]. Table mutation is serialized by the concept's mutex,
//! which is the only lock taken during a commit.

mod index;
mod link;

pub use index::{ConceptIndex, Conceptualized};
pub use link::templates;

use crate::bag::{Bag, HijackBag, PutOutcome};
use crate::budget::Merge;
use crate::config::EngineConfig;
use crate::table::{BeliefTable, DynamicModel, QuestionTable};
use crate::task::{Task, TaskId};
use nars_contract::{Punctuation, Term};
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::debug;

/// What a concept can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ConceptKind {
    /// Ordinary concept with stored tables (atoms included).
    Compound,
    /// Negated term: links only; judgements live on the positive term.
    Negation,
    /// Truth also computable from component concepts.
    Dynamic(DynamicModel),
    /// Fed by an append-only observation stream.
    Series,
}

impl ConceptKind {
    /// Kind implied by the shape of `term`.
    pub fn of(term: &Term) -> ConceptKind {
        if term.is_neg() {
            return ConceptKind::Negation;
        }
        match DynamicModel::of(term) {
            Some(m) => ConceptKind::Dynamic(m),
            None => ConceptKind::Compound,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum ConceptState {
    New = 0,
    Awake = 1,
    Sleeping = 2,
    Deleted = 3,
}

impl ConceptState {
    fn from_u8(v: u8) -> ConceptState {
        match v {
            0 => ConceptState::New,
            1 => ConceptState::Awake,
            2 => ConceptState::Sleeping,
            _ => ConceptState::Deleted,
        }
    }
}

/// Link capacities per state.
#[derive(Clone, Copy, Debug)]
pub struct LinkLimits {
    pub task_links: usize,
    pub term_links: usize,
}

impl LinkLimits {
    pub fn for_state(state: ConceptState, cfg: &EngineConfig) -> LinkLimits {
        match state {
            ConceptState::Awake => LinkLimits {
                task_links: cfg.bag.task_links_awake,
                term_links: cfg.bag.term_links_awake,
            },
            ConceptState::New | ConceptState::Sleeping => LinkLimits {
                task_links: cfg.bag.task_links_sleeping,
                term_links: cfg.bag.term_links_sleeping,
            },
            ConceptState::Deleted => LinkLimits {
                task_links: 0,
                term_links: 0,
            },
        }
    }
}

/// The four tables of a concept.
#[derive(Debug)]
pub struct Tables {
    pub beliefs: BeliefTable,
    pub goals: BeliefTable,
    pub questions: QuestionTable,
    pub quests: QuestionTable,
}

impl Tables {
    fn new(term: &Term, kind: ConceptKind, cfg: &EngineConfig) -> Tables {
        let t = &cfg.table;
        let beliefs = match kind {
            ConceptKind::Series => BeliefTable::series(t.beliefs_eternal, t.series),
            ConceptKind::Dynamic(m) => {
                BeliefTable::new(t.beliefs_eternal, t.beliefs_temporal).with_dynamic(term.clone(), m)
            }
            _ => BeliefTable::new(t.beliefs_eternal, t.beliefs_temporal),
        };
        Tables {
            beliefs,
            goals: BeliefTable::new(t.goals_eternal, t.goals_temporal),
            questions: QuestionTable::new(t.questions),
            quests: QuestionTable::new(t.questions),
        }
    }

    /// Belief or goal table.
    pub fn judgements(&mut self, punct: Punctuation) -> Option<&mut BeliefTable> {
        match punct {
            Punctuation::Belief => Some(&mut self.beliefs),
            Punctuation::Goal => Some(&mut self.goals),
            _ => None,
        }
    }

    /// Question or quest table.
    pub fn queries(&mut self, punct: Punctuation) -> Option<&mut QuestionTable> {
        match punct {
            Punctuation::Question => Some(&mut self.questions),
            Punctuation::Quest => Some(&mut self.quests),
            _ => None,
        }
    }

    /// Read-only view of the table that answers `punct`.
    pub fn answers_for(&self, punct: Punctuation) -> Option<&BeliefTable> {
        match punct.answered_by()? {
            Punctuation::Belief => Some(&self.beliefs),
            Punctuation::Goal => Some(&self.goals),
            _ => None,
        }
    }

    fn clear(&mut self) -> Vec<Arc<Task>> {
        let mut out = self.beliefs.clear();
        out.extend(self.goals.clear());
        out.extend(self.questions.clear());
        out.extend(self.quests.clear());
        out
    }

    pub fn len(&self) -> usize {
        self.beliefs.len() + self.goals.len() + self.questions.len() + self.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Concept {
    term: Term,
    kind: ConceptKind,
    state: AtomicU8,
    task_links: HijackBag<TaskId, ()>,
    term_links: HijackBag<Term, ()>,
    tables: Option<Mutex<Tables>>,
}

impl fmt::Debug for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Concept")
            .field("term", &self.term)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

impl Concept {
    pub fn new(term: Term, kind: ConceptKind, cfg: &EngineConfig) -> Concept {
        let limits = LinkLimits::for_state(ConceptState::New, cfg);
        let tables = match kind {
            ConceptKind::Negation => None,
            _ => Some(Mutex::new(Tables::new(&term, kind, cfg))),
        };
        let bag = &cfg.bag;
        Concept {
            task_links: HijackBag::new(limits.task_links, bag.reprobes, Merge::Plus, bag.contention_penalty),
            term_links: HijackBag::new(limits.term_links, bag.reprobes, Merge::Plus, bag.contention_penalty),
            term,
            kind,
            state: AtomicU8::new(ConceptState::New as u8),
            tables,
        }
    }

    pub fn term(&self) -> &Term {
        &self.term
    }

    pub fn kind(&self) -> ConceptKind {
        self.kind
    }

    pub fn state(&self) -> ConceptState {
        ConceptState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_deleted(&self) -> bool {
        self.state() == ConceptState::Deleted
    }

    pub fn task_links(&self) -> &HijackBag<TaskId, ()> {
        &self.task_links
    }

    pub fn term_links(&self) -> &HijackBag<Term, ()> {
        &self.term_links
    }

    /// Lock the tables; `None` for negation concepts.
    pub fn tables(&self) -> Option<MutexGuard<'_, Tables>> {
        self.tables.as_ref().map(|t| t.lock())
    }

    pub fn link_task(&self, task: TaskId, priority: f32) -> bool {
        if self.is_deleted() {
            return false;
        }
        self.task_links.put(task, (), priority).is_stored()
    }

    pub fn link_term(&self, term: Term, priority: f32) -> bool {
        if self.is_deleted() || term == self.term {
            return false;
        }
        matches!(
            self.term_links.put(term, (), priority),
            PutOutcome::Inserted | PutOutcome::Merged | PutOutcome::Replaced(..)
        )
    }

    /// Wake if needed and spread `amount × spread` over the term-links.
    /// The concept's own priority lives in the [`ConceptIndex`].
    pub fn activate(&self, amount: f32, spread: f32, cfg: &EngineConfig) {
        if matches!(self.state(), ConceptState::New | ConceptState::Sleeping) {
            self.transition(ConceptState::Awake, cfg);
        }
        let links = self.term_links.items();
        if links.is_empty() || amount <= 0.0 {
            return;
        }
        let share = amount * spread.clamp(0.0, 1.0) / links.len() as f32;
        for (term, _, _) in links {
            self.term_links.adjust(&term, share);
        }
    }

    /// Move to `target`, resizing the link bags. Returns the task-links
    /// trimmed by the resize.
    pub fn transition(&self, target: ConceptState, cfg: &EngineConfig) -> Vec<TaskId> {
        let mut seen = self.state.load(Ordering::Acquire);
        let prev = loop {
            let prev = ConceptState::from_u8(seen);
            // deletion is final
            if prev == target || prev == ConceptState::Deleted {
                return Vec::new();
            }
            match self
                .state
                .compare_exchange(seen, target as u8, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break prev,
                Err(now) => seen = now,
            }
        };
        debug!(concept = %self.term, from = ?prev, to = ?target, "concept state");
        let limits = LinkLimits::for_state(target, cfg);
        self.term_links.set_capacity(limits.term_links);
        self.task_links
            .set_capacity(limits.task_links)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Mark deleted and surrender every stored task.
    pub fn delete(&self, cfg: &EngineConfig) -> Vec<Arc<Task>> {
        self.transition(ConceptState::Deleted, cfg);
        self.tables.as_ref().map_or_else(Vec::new, |t| t.lock().clear())
    }
}
