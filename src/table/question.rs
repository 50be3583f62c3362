//! Question and quest storage.
//!
//! Pending queries wait here, ranked by priority, until capacity pressure
//! pushes them out. Each remembers the best answer seen so far so that a
//! new answer is only reported when it is an improvement.

use super::Insertion;
use crate::bag::{Bag, CurveBag, PutOutcome};
use crate::budget::Merge;
use crate::task::{Task, TaskId};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
pub struct QuestionTable {
    pending: CurveBag<TaskId, Arc<Task>>,
    answers: Mutex<HashMap<TaskId, Arc<Task>>>,
}

impl QuestionTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: CurveBag::new(capacity, Merge::Max),
            answers: Mutex::new(HashMap::new()),
        }
    }

    pub fn add(&mut self, task: Arc<Task>) -> Insertion {
        if task.is_deleted() || !task.is_query() {
            return Insertion::default();
        }
        if let Some((_, existing, _)) = self.pending.items().into_iter().find(|(_, q, _)| {
            q.term() == task.term()
                && q.occurrence() == task.occurrence()
                && q.stamp().same_evidence(task.stamp())
        }) {
            return Insertion::duplicate(existing);
        }
        let mut out = Insertion::default();
        match self.pending.put(task.id(), task.clone(), task.priority()) {
            PutOutcome::Inserted | PutOutcome::Merged => out.stored = Some(task),
            PutOutcome::Replaced(id, old) => {
                self.answers.lock().remove(&id);
                out.stored = Some(task);
                out.evicted.push(old);
            }
            PutOutcome::Rejected => {}
        }
        out
    }

    /// Remember `answer` for `question` if it beats the previous best.
    ///
    /// Answers to an eternal question rank by confidence; answers to a
    /// temporal one by confidence projected to the question's time.
    pub fn record_answer(&self, question: &Task, answer: &Arc<Task>, dur: u32) -> bool {
        if !self.pending.contains(&question.id()) || answer.is_deleted() {
            return false;
        }
        let when = question.occurrence();
        let score = |t: &Task| super::projected_conf(t, when, dur);
        let mut answers = self.answers.lock();
        match answers.get(&question.id()) {
            Some(best) if !best.is_deleted() && score(best) >= score(answer) => false,
            _ => {
                answers.insert(question.id(), answer.clone());
                true
            }
        }
    }

    pub fn best_answer(&self, question: TaskId) -> Option<Arc<Task>> {
        self.answers.lock().get(&question).cloned()
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Arc<Task>> {
        self.pending.sample(rng).map(|(_, t, _)| t)
    }

    pub fn tasks(&self) -> Vec<Arc<Task>> {
        self.pending.items().into_iter().map(|(_, t, _)| t).collect()
    }

    pub fn remove(&mut self, id: TaskId) -> Option<Arc<Task>> {
        self.answers.lock().remove(&id);
        self.pending.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) -> Vec<Arc<Task>> {
        self.answers.lock().clear();
        self.pending
            .retain(|_, _| false)
            .into_iter()
            .map(|(_, t)| t)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::Budget;
    use crate::table::tests::belief;
    use crate::task::{Origin, TaskDraft};
    use nars_contract::{Punctuation, Stamp, Term, ETERNAL};

    fn question(term: &str, id: u64, pri: f32) -> Arc<Task> {
        Arc::new(
            TaskDraft {
                term: Term::parse(term).unwrap(),
                punctuation: Punctuation::Question,
                truth: None,
                occurrence: ETERNAL,
                stamp: Stamp::input(id),
                budget: Budget::new(pri, 0.5, 0.5),
                origin: Origin::Input,
                causes: vec![],
                source: None,
            }
            .build(TaskId(id), 0),
        )
    }

    #[test]
    fn test_unanswered_question_is_retained() {
        let mut table = QuestionTable::new(4);
        let q = question("(a-->b)", 1, 0.5);
        assert!(table.add(q.clone()).stored.is_some());
        assert!(table.best_answer(q.id()).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_only_better_answers_recorded() {
        let mut table = QuestionTable::new(4);
        let q = question("(a-->b)", 1, 0.5);
        table.add(q.clone());
        let weak = belief("(a-->b)", 1.0, 0.5, &[2], 0.5);
        let strong = belief("(a-->b)", 1.0, 0.9, &[3], 0.5);
        assert!(table.record_answer(&q, &weak, 1));
        assert!(table.record_answer(&q, &strong, 1));
        assert!(!table.record_answer(&q, &weak, 1));
        assert!(Arc::ptr_eq(&table.best_answer(q.id()).unwrap(), &strong));
    }

    #[test]
    fn test_capacity_pressure_evicts_weakest_question() {
        let mut table = QuestionTable::new(2);
        table.add(question("(a-->b)", 1, 0.2));
        table.add(question("(a-->c)", 2, 0.5));
        let out = table.add(question("(a-->d)", 3, 0.9));
        assert_eq!(out.evicted.len(), 1);
        assert_eq!(out.evicted[0].id(), TaskId(1));
        assert_eq!(table.len(), 2);
    }
}
