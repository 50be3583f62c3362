//! Commit: the one place a task enters memory.

use super::{Counters, Engine, TaskEvent};
use crate::attention::MetaGoal;
use crate::bag::Bag;
use crate::budget::{activation, deletion_penalty};
use crate::concept::{templates, Concept};
use crate::table::{answers, projected_conf, Insertion, TableContext};
use crate::task::Task;
use nars_contract::{Punctuation, VarKind};
use std::sync::Arc;
use tracing::{debug, trace};

/// Where a committed task came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Kind {
    Input,
    Derived,
}

impl Engine {
    /// Store `task` in its concept, link it, answer and credit.
    ///
    /// Returns the task now representing this evidence: the task itself,
    /// the existing duplicate, or the revision that absorbed it. `None`
    /// when nothing was kept.
    pub(crate) fn commit(&self, task: Arc<Task>, kind: Kind) -> Option<Arc<Task>> {
        if task.is_deleted() {
            return None;
        }
        let Some(concept) = self.conceptualize(task.term()) else {
            trace!(task = %task, "no room for concept");
            return self.decline(&task);
        };

        let prior = self.prior_prediction(&concept, &task, kind);
        let ins = self.insert(&concept, &task);
        if let Some(dup) = ins.duplicate {
            trace!(task = %task, existing = %dup, "duplicate evidence");
            return Some(dup);
        }
        for e in &ins.evicted {
            self.delete_task(e);
        }
        if ins.stored.is_none() && ins.revised.is_none() {
            return self.decline(&task);
        }
        if let Some((p, accurate)) = prior {
            let goal = if accurate { MetaGoal::Accurate } else { MetaGoal::Inaccurate };
            self.causes.credit(p.causes(), goal, p.conf());
        }

        let mut kept = None;
        if let Some(stored) = ins.stored {
            if ins.displaced {
                // absorbed into its own revision
                stored.delete();
            } else {
                self.admit(&concept, &stored, kind);
                kept = Some(stored);
            }
        }
        if let Some(revised) = ins.revised {
            Counters::bump(&self.counters.revised);
            debug!(task = %revised, "revised");
            self.tasks.write().insert(revised.id(), revised.clone());
            self.link(&concept, &revised);
            self.emit(TaskEvent::Revised, &revised);
            self.answer_pending(&concept, &revised);
            kept = kept.or(Some(revised));
        }
        kept
    }

    /// Offer the task to the concept's table for its punctuation.
    fn insert(&self, concept: &Concept, task: &Arc<Task>) -> Insertion {
        let Some(mut tables) = concept.tables() else {
            return Insertion::default();
        };
        let punct = task.punctuation();
        if let Some(table) = tables.queries(punct) {
            return table.add(task.clone());
        }
        let ctx = TableContext::new(
            self.time(),
            self.dur(),
            self.config.table.truth_epsilon,
            &self.task_ids,
        )
        .with_conf_tolerance(self.config.table.revision_tolerance);
        match tables.judgements(punct) {
            Some(table) => table.add(task.clone(), &ctx),
            None => Insertion::default(),
        }
    }

    /// A task that made it into a table: store, link, notify, credit.
    fn admit(&self, concept: &Arc<Concept>, task: &Arc<Task>, kind: Kind) {
        self.tasks.write().insert(task.id(), task.clone());
        self.link(concept, task);
        let event = match kind {
            Kind::Input => {
                Counters::bump(&self.counters.input);
                self.causes.credit(task.causes(), MetaGoal::Perceive, task.priority());
                TaskEvent::Input
            }
            Kind::Derived => {
                Counters::bump(&self.counters.derived);
                debug!(task = %task, "derived");
                let goal = match task.punctuation() {
                    Punctuation::Goal => Some(MetaGoal::Desire),
                    Punctuation::Belief => Some(MetaGoal::Believe),
                    _ => None,
                };
                if let Some(g) = goal {
                    let mut causes = task.causes().to_vec();
                    causes.push(self.derive_cause);
                    self.causes.credit(&causes, g, task.conf());
                }
                TaskEvent::Derived
            }
        };
        self.emit(event, task);

        if task.is_query() {
            self.resolve_question(concept, task);
        } else {
            self.answer_pending(concept, task);
        }
        if task.is_goal() {
            self.decide(task);
        }
    }

    fn decline(&self, task: &Arc<Task>) -> Option<Arc<Task>> {
        task.delete();
        Counters::bump(&self.counters.declined);
        None
    }

    // === Linking ===

    /// Task-link into the concept and its templates; term-links both ways;
    /// then activate.
    pub(crate) fn link(&self, concept: &Arc<Concept>, task: &Arc<Task>) {
        let Some(budget) = task.budget().snapshot() else {
            return;
        };
        let pri = budget.priority;
        concept.link_task(task.id(), pri);
        for t in templates(task.term(), self.config.derive.template_depth) {
            let Some(sub) = self.conceptualize(&t) else {
                continue;
            };
            sub.link_task(task.id(), pri);
            sub.link_term(concept.term().clone(), pri);
            concept.link_term(t, pri);
        }
        self.concepts.activate(concept, activation(&budget), &self.config);
    }

    // === Questions ===

    /// A new judgement answers pending questions of its concept.
    fn answer_pending(&self, concept: &Concept, answer: &Arc<Task>) {
        let Some(punct) = [Punctuation::Question, Punctuation::Quest]
            .into_iter()
            .find(|q| q.answered_by() == Some(answer.punctuation()))
        else {
            return;
        };
        let pending = match concept.tables() {
            Some(mut t) => t.queries(punct).map(|q| q.tasks()).unwrap_or_default(),
            None => return,
        };
        for q in pending {
            if answers(q.term(), answer.term()) {
                self.record_answer(&q, answer);
            }
        }
    }

    /// A new question looks for the best existing answer: in its own
    /// concept, and for query variables across every concept of the
    /// same shape.
    fn resolve_question(&self, concept: &Concept, question: &Arc<Task>) {
        let dur = self.dur();
        let mut best = concept
            .tables()
            .and_then(|t| t.answers_for(question.punctuation())?.match_task(question, dur));
        if question.term().has_var(VarKind::Query) {
            for (c, _) in self.concepts.concepts() {
                if c.term().op() != question.term().op() || std::ptr::eq(&*c, concept) {
                    continue;
                }
                let found = c
                    .tables()
                    .and_then(|t| t.answers_for(question.punctuation())?.match_task(question, dur));
                best = match (best, found) {
                    (Some(a), Some(b)) => {
                        let when = question.occurrence();
                        Some(if projected_conf(&b, when, dur) > projected_conf(&a, when, dur) { b } else { a })
                    }
                    (a, b) => a.or(b),
                };
            }
        }
        if let Some(answer) = best {
            self.record_answer(question, &answer);
        }
    }

    /// Report `answer` if it improves on what `question` already has.
    pub(crate) fn record_answer(&self, question: &Arc<Task>, answer: &Arc<Task>) {
        let Some(concept) = self.concepts.get(question.term()) else {
            return;
        };
        let improved = concept.tables().map_or(false, |mut t| {
            t.queries(question.punctuation())
                .map_or(false, |q| q.record_answer(question, answer, self.dur()))
        });
        if !improved {
            return;
        }
        Counters::bump(&self.counters.answers);
        debug!(question = %question, answer = %answer, "answer");
        self.causes.credit(answer.causes(), MetaGoal::Answer, answer.conf());
        self.emit(TaskEvent::Answer { question: question.id() }, answer);
    }

    // === Meta-goal feedback ===

    /// For an input event: the belief the engine already held about that
    /// moment, and whether the input agrees with it.
    fn prior_prediction(&self, concept: &Concept, task: &Task, kind: Kind) -> Option<(Arc<Task>, bool)> {
        if kind != Kind::Input || !task.is_belief() || task.is_eternal() {
            return None;
        }
        let truth = task.truth()?;
        let when = task.occurrence();
        let prior = concept.tables()?.beliefs.answer(when, self.dur())?;
        if prior.is_input() || prior.stamp().overlaps(task.stamp()) {
            return None;
        }
        let predicted = prior.truth_at(when, self.dur())?;
        let accurate = (predicted.frequency - truth.frequency).abs() <= self.config.accuracy_tolerance;
        Some((prior, accurate))
    }

    /// A goal desired strongly enough now becomes a decision.
    fn decide(&self, goal: &Arc<Task>) {
        let Some(desire) = goal.truth_at(self.time(), self.dur()) else {
            return;
        };
        if desire.expectation() <= self.config.decision_threshold {
            return;
        }
        Counters::bump(&self.counters.decisions);
        debug!(goal = %goal, expectation = desire.expectation(), "decision");
        self.causes.credit(goal.causes(), MetaGoal::Action, desire.expectation());
        self.emit(TaskEvent::Decision, goal);
    }

    // === Deletion ===

    /// Delete a task and charge the links that produced it.
    pub(crate) fn delete_task(&self, task: &Arc<Task>) {
        let durability = task.budget().durability();
        let strength = task.strength();
        if !task.delete() {
            return;
        }
        self.tasks.write().remove(&task.id());
        Counters::bump(&self.counters.deleted);
        self.emit(TaskEvent::Deleted, task);

        let Some(src) = task.source() else {
            return;
        };
        let penalty = deletion_penalty(strength, durability, self.config.deletion_scale);
        if penalty <= 0.0 {
            return;
        }
        if let Some(c) = self.concepts.get(&src.concept) {
            trace!(task = %task, penalty, "deletion feedback");
            c.task_links().adjust(&src.task_link, -penalty);
            c.term_links().adjust(&src.term_link, -penalty);
        }
    }

    pub(crate) fn delete_concept(&self, concept: &Concept) {
        debug!(concept = %concept.term(), "concept evicted");
        for t in concept.delete(&self.config) {
            self.delete_task(&t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::Budget;
    use crate::config::EngineConfig;
    use crate::derive::RuleSet;
    use crate::task::{Origin, PremiseSource, TaskDraft};
    use nars_contract::{Stamp, Term, TruthValue, ETERNAL};

    fn t(s: &str) -> Term {
        Term::parse(s).unwrap()
    }

    #[test]
    fn test_evicted_derivation_penalizes_its_links() {
        let mut cfg = EngineConfig::small();
        cfg.table.beliefs_eternal = 1;
        cfg.table.revision_tolerance = 0.1;
        let e = Engine::new(cfg, RuleSet::compile::<&str>(&[]).unwrap()).unwrap();

        let origin = e.input_narsese("(a-->b).").unwrap().unwrap();
        let hub = e.concept(&t("(a-->b)")).unwrap();
        let task_link = hub.task_links().priority(&origin.id()).unwrap();
        let term_link = hub.term_links().priority(&t("a")).unwrap();

        let derived = e
            .input_draft(TaskDraft {
                term: t("(x-->y)"),
                punctuation: Punctuation::Belief,
                truth: Some(TruthValue::new(1.0, 0.4)),
                occurrence: ETERNAL,
                stamp: Stamp::new([e.next_evidence(), e.next_evidence()]),
                budget: Budget::new(0.5, 0.6, 0.5),
                origin: Origin::Derived,
                causes: vec![],
                source: Some(PremiseSource {
                    concept: t("(a-->b)"),
                    task_link: origin.id(),
                    term_link: t("a"),
                }),
            })
            .expect("derived task stored");
        let penalty = deletion_penalty(
            derived.strength(),
            derived.budget().durability(),
            e.config().deletion_scale,
        );
        assert!(penalty > 0.0);

        // a stronger input takes the only eternal slot
        e.input_narsese("(x-->y). %1.0;0.9%").unwrap();
        assert!(derived.is_deleted(), "derived task evicted");
        assert!(e.task(derived.id()).is_none());

        let task_link_after = hub.task_links().priority(&origin.id()).unwrap();
        let term_link_after = hub.term_links().priority(&t("a")).unwrap();
        assert!(
            ((task_link - penalty).max(0.0) - task_link_after).abs() < 1e-5,
            "task-link {} -> {}, penalty {}",
            task_link,
            task_link_after,
            penalty
        );
        assert!(((term_link - penalty).max(0.0) - term_link_after).abs() < 1e-5);
        // untouched links keep their priority
        let other = hub.term_links().priority(&t("b")).unwrap();
        assert!((other - term_link).abs() < 1e-5);
    }
}
