//! Control cycle: premise formation, derivation, forgetting, focus.

use super::commit::Kind;
use super::Engine;
use crate::attention::{Causable, CauseId};
use crate::bag::Bag;
use crate::concept::ConceptState;
use crate::derive::Premise;
use crate::task::{Task, TaskId};
use nars_contract::Term;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

/// Premise derivation as a schedulable process.
#[derive(Debug)]
pub struct DeriveCausable {
    cause: CauseId,
}

impl DeriveCausable {
    pub fn new(cause: CauseId) -> Self {
        Self { cause }
    }
}

impl Causable for DeriveCausable {
    fn name(&self) -> &str {
        "derive"
    }

    fn cause(&self) -> CauseId {
        self.cause
    }

    fn run(&self, engine: &Engine, iterations: usize) -> usize {
        engine.cycle(iterations);
        iterations
    }
}

impl Engine {
    /// Advance the clock one step and run one control cycle: update cause
    /// values, let the focus run causables, forget.
    pub fn tick(&self) -> i64 {
        let now = self.clock.tick();
        let attention = &self.config.attention;
        self.causes.update(&attention.weights, attention.momentum);
        self.run_focus();
        self.forget();
        now
    }

    /// Each registered causable gets one draw per cycle; high-value ones
    /// may be drawn repeatedly and others not at all.
    fn run_focus(&self) {
        let draws = self.focus.lock().len();
        for _ in 0..draws {
            let plan = {
                let focus = self.focus.lock();
                let mut rng = self.rng.lock();
                focus
                    .pick(&self.causes, &mut *rng)
                    .and_then(|i| focus.plan(i).map(|p| (i, p)))
            };
            let Some((slot, (causable, iterations))) = plan else {
                return;
            };
            let start = Instant::now();
            let done = causable.run(self, iterations);
            let value = self.causes.value(causable.cause());
            self.focus.lock().record(slot, done, start.elapsed(), value);
        }
    }

    /// Derive from `iterations` rounds of sampled premises and commit the
    /// results. Returns the number of tasks kept.
    pub fn cycle(&self, iterations: usize) -> usize {
        let n = iterations * self.config.derive.premises_per_iteration.max(1);
        let premises = self.premises(n);
        if premises.is_empty() {
            return 0;
        }
        let drafts = self.deriver.derive_all(&premises);
        let now = self.time();
        let mut kept = 0;
        for draft in drafts {
            let task = Arc::new(draft.build(TaskId(self.task_ids.next()), now));
            if self.commit(task, Kind::Derived).is_some() {
                kept += 1;
            }
        }
        trace!(premises = premises.len(), kept, "cycle");
        kept
    }

    /// Sample up to `n` premises: concept, then a task-link, then
    /// term-links. Questions first try to resolve against the linked
    /// concept's judgements.
    pub fn premises(&self, n: usize) -> Vec<Premise> {
        let mut out = Vec::with_capacity(n);
        let mut answered: Vec<(Arc<Task>, Arc<Task>)> = Vec::new();
        let per_task = self.config.derive.term_links_per_task.max(1);
        let min = self.config.derive.priority_min;
        {
            let mut rng = self.rng.lock();
            let mut attempts = 0;
            while out.len() < n && attempts < n * 2 {
                attempts += 1;
                let Some(concept) = self.concepts.sample(&mut *rng) else {
                    break;
                };
                let Some((id, _, tl_pri)) = concept.task_links().sample(&mut *rng) else {
                    continue;
                };
                let Some(task) = self.task(id).filter(|t| !t.is_deleted()) else {
                    // stale handle
                    concept.task_links().remove(&id);
                    continue;
                };
                for (term, _, pri) in concept.term_links().sample_n(per_task, &mut *rng) {
                    let belief = self.belief_for(&term, &task);
                    if let (true, Some(b)) = (task.is_query(), &belief) {
                        answered.push((task.clone(), b.clone()));
                    }
                    if let Some(p) = Premise::new(
                        concept.term().clone(),
                        task.clone(),
                        tl_pri,
                        term,
                        pri,
                        belief,
                        min,
                    ) {
                        out.push(p);
                    }
                }
            }
        }
        for (question, answer) in answered {
            self.record_answer(&question, &answer);
        }
        out
    }

    /// Judgement about `term` to pair with `task`: a matching answer for
    /// queries, else the best belief at the task's time.
    fn belief_for(&self, term: &Term, task: &Task) -> Option<Arc<Task>> {
        let concept = self.concepts.get(term)?;
        let tables = concept.tables()?;
        let dur = self.dur();
        let matched = if task.is_query() {
            tables
                .answers_for(task.punctuation())
                .and_then(|t| t.match_task(task, dur))
        } else {
            None
        };
        matched.or_else(|| tables.beliefs.answer(task.occurrence(), dur))
    }

    /// Uniform decay of concepts and links; weak concepts fall asleep.
    fn forget(&self) {
        let bag = &self.config.bag;
        self.concepts.forget(bag.forget_rate);
        for (concept, pri) in self.concepts.concepts() {
            concept.task_links().forget(bag.forget_rate);
            concept.term_links().forget(bag.forget_rate);
            if pri < bag.sleep_threshold && concept.state() == ConceptState::Awake {
                concept.transition(ConceptState::Sleeping, &self.config);
            }
        }
    }
}
