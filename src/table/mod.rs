//! Belief and goal tables: per-concept storage of judgements.
//!
//! ```text
//! BeliefTable
//! ├── EternalTable    timeless judgements, ranked conf × originality
//! ├── TimeTable
//! │   ├── Temporal    events, revised when coincident, projected on query
//! │   └── Series      append-only stream, interpolated, compacted
//! └── DynamicModel?   truth computed from other concepts on demand
//! ```
//!
//! Every mutation goes through [`BeliefTable::add`] and reports what
//! happened as an [`Insertion`]; the caller owns deletion of anything
//! evicted. Queries on an empty table return `None`.

mod dynamic;
mod eternal;
mod question;
mod series;
mod temporal;

pub use dynamic::DynamicModel;
pub use eternal::EternalTable;
pub use question::QuestionTable;
pub use series::SeriesTable;
pub use temporal::TemporalTable;

use crate::task::{Serials, Task};
use crate::time::project;
use nars_contract::{Op, Term, TruthValue, VarKind, DTERNAL, ETERNAL, XTERNAL};
use std::collections::HashMap;
use std::sync::Arc;

/// Default largest confidence gap between two judgements that may revise.
pub const CONF_TOLERANCE: f32 = 0.5;

/// Ambient values a table needs to revise and rank.
pub struct TableContext<'a> {
    pub now: i64,
    pub dur: u32,
    /// Truth resolution for dithering and the minimum-improvement guard.
    pub epsilon: f32,
    /// Revision partners must lie within this confidence of the incoming task.
    pub conf_tolerance: f32,
    /// Id source for revision tasks.
    pub ids: &'a Serials,
}

impl<'a> TableContext<'a> {
    pub fn new(now: i64, dur: u32, epsilon: f32, ids: &'a Serials) -> Self {
        Self {
            now,
            dur,
            epsilon,
            conf_tolerance: CONF_TOLERANCE,
            ids,
        }
    }

    pub fn with_conf_tolerance(mut self, tolerance: f32) -> Self {
        self.conf_tolerance = tolerance;
        self
    }

    /// Whether two confidences are close enough to revise.
    pub fn similar(&self, a: f32, b: f32) -> bool {
        (a - b).abs() <= self.conf_tolerance
    }
}

/// Outcome of offering a task to a table.
#[derive(Debug, Default)]
pub struct Insertion {
    /// The offered task, if it was kept.
    pub stored: Option<Arc<Task>>,
    /// Existing task with the same evidence; the offered one was not kept.
    pub duplicate: Option<Arc<Task>>,
    /// New task synthesized by revision (already stored).
    pub revised: Option<Arc<Task>>,
    /// Tasks pushed out; the caller deletes them.
    pub evicted: Vec<Arc<Task>>,
    /// The stored task was immediately displaced by its own revision.
    pub displaced: bool,
}

impl Insertion {
    pub fn duplicate(existing: Arc<Task>) -> Self {
        Self {
            duplicate: Some(existing),
            ..Default::default()
        }
    }

    /// Nothing was kept and nothing was synthesized.
    pub fn is_rejected(&self) -> bool {
        self.stored.is_none() && self.duplicate.is_none() && self.revised.is_none()
    }
}

/// Term of a revision: when the two terms differ only in temporal
/// offsets, the offsets are averaged by evidence weight; otherwise the
/// terms must be equal.
pub fn interpolate(a: &Term, b: &Term, wa: f32, wb: f32) -> Option<Term> {
    if a == b {
        return Some(a.clone());
    }
    if a.op() != b.op() || a.arity() != b.arity() || a.is_atomic() {
        return None;
    }
    let dt = match (a.dt(), b.dt()) {
        (x, y) if x == y => x,
        (DTERNAL, _) | (_, DTERNAL) | (XTERNAL, _) | (_, XTERNAL) => return None,
        (x, y) => {
            let w = (wa + wb).max(f32::EPSILON);
            ((x as f32 * wa + y as f32 * wb) / w).round() as i32
        }
    };
    let subs = a
        .subs()
        .iter()
        .zip(b.subs())
        .map(|(x, y)| interpolate(x, y, wa, wb))
        .collect::<Option<Vec<_>>>()?;
    Term::compound(a.op(), subs, dt).ok()
}

/// Whether `term` answers a query on `template`: query variables match
/// any subterm consistently, and an unset offset matches any offset.
pub fn answers(template: &Term, term: &Term) -> bool {
    answers_in(template, term, &mut HashMap::new())
}

fn answers_in(t: &Term, x: &Term, bound: &mut HashMap<Term, Term>) -> bool {
    if t.op() == Op::Var(VarKind::Query) {
        return match bound.get(t) {
            Some(b) => b == x,
            None => {
                bound.insert(t.clone(), x.clone());
                true
            }
        };
    }
    if t == x {
        return true;
    }
    if t.is_atomic() || t.op() != x.op() || t.arity() != x.arity() {
        return false;
    }
    if t.dt() != x.dt() && !matches!(t.dt(), DTERNAL | XTERNAL) {
        return false;
    }
    t.subs()
        .iter()
        .zip(x.subs())
        .all(|(a, b)| answers_in(a, b, bound))
}

// =============================================================================
// BELIEF TABLE
// =============================================================================

#[derive(Debug)]
pub enum TimeTable {
    Temporal(TemporalTable),
    Series(SeriesTable),
}

/// All judgements of one polarity (beliefs or goals) for one concept.
#[derive(Debug)]
pub struct BeliefTable {
    eternal: EternalTable,
    time: TimeTable,
    dynamic: Option<(Term, DynamicModel)>,
}

impl BeliefTable {
    pub fn new(eternal_capacity: usize, temporal_capacity: usize) -> Self {
        Self {
            eternal: EternalTable::new(eternal_capacity),
            time: TimeTable::Temporal(TemporalTable::new(temporal_capacity)),
            dynamic: None,
        }
    }

    pub fn series(eternal_capacity: usize, series_capacity: usize) -> Self {
        Self {
            eternal: EternalTable::new(eternal_capacity),
            time: TimeTable::Series(SeriesTable::new(series_capacity)),
            dynamic: None,
        }
    }

    /// Attach a structural model: `term`'s truth can also be computed from
    /// its components.
    pub fn with_dynamic(mut self, term: Term, model: DynamicModel) -> Self {
        self.dynamic = Some((term, model));
        self
    }

    pub fn dynamic(&self) -> Option<DynamicModel> {
        self.dynamic.as_ref().map(|d| d.1)
    }

    pub fn eternal(&self) -> &EternalTable {
        &self.eternal
    }

    pub fn add(&mut self, task: Arc<Task>, ctx: &TableContext) -> Insertion {
        if task.is_eternal() {
            return self.eternal.add(task, ctx);
        }
        match &mut self.time {
            TimeTable::Temporal(t) => t.add(task, ctx),
            TimeTable::Series(s) => s.add(task, ctx),
        }
    }

    /// Best stored task for a query at `when`.
    ///
    /// Eternal queries prefer eternal judgements; temporal queries compare
    /// the best event (projected) against the strongest eternal one.
    pub fn answer(&self, when: i64, dur: u32) -> Option<Arc<Task>> {
        let eternal = self.eternal.strongest();
        let temporal = match &self.time {
            TimeTable::Temporal(t) => t.answer(when, dur),
            TimeTable::Series(s) => s.answer(when),
        };
        match (eternal, temporal) {
            (Some(e), None) => Some(e),
            (None, t) => t,
            (Some(e), Some(t)) => {
                if when == ETERNAL {
                    return Some(e);
                }
                let tc = t.truth_at(when, dur).map_or(0.0, |v| v.confidence);
                if tc > e.conf() {
                    Some(t)
                } else {
                    Some(e)
                }
            }
        }
    }

    /// Stored truth at `when`, without dynamic evaluation.
    ///
    /// A temporal answer is combined with the eternal background by
    /// revision when their evidence is disjoint.
    pub fn stored_truth(&self, when: i64, dur: u32) -> Option<TruthValue> {
        let eternal = self.eternal.strongest();
        if when == ETERNAL {
            if let Some(e) = &eternal {
                return e.truth();
            }
            // eternalized strongest event
            let best = match &self.time {
                TimeTable::Temporal(t) => t.strongest(),
                TimeTable::Series(s) => s.latest(),
            }?;
            return best.truth().map(|t| t.eternalize());
        }
        let temporal = match &self.time {
            TimeTable::Temporal(t) => t
                .answer(when, dur)
                .and_then(|a| a.truth_at(when, dur).map(|v| (v, Some(a)))),
            TimeTable::Series(s) => s.truth(when, dur).map(|v| (v, None)),
        };
        match (temporal, eternal) {
            (None, None) => None,
            (Some((t, _)), None) => Some(t),
            (None, Some(e)) => e.truth(),
            (Some((t, src)), Some(e)) => {
                let disjoint = src.map_or(true, |s| !s.stamp().overlaps(e.stamp()));
                let et = e.truth()?;
                if disjoint {
                    Some(t.revision(&et))
                } else if t.confidence >= et.confidence {
                    Some(t)
                } else {
                    Some(et)
                }
            }
        }
    }

    /// Truth at `when`, consulting the dynamic model through `resolve`
    /// (`term, when → truth`) and keeping whichever is more confident.
    pub fn truth(
        &self,
        when: i64,
        dur: u32,
        resolve: &dyn Fn(&Term, i64) -> Option<TruthValue>,
    ) -> Option<TruthValue> {
        let stored = self.stored_truth(when, dur);
        let computed = self
            .dynamic
            .as_ref()
            .and_then(|(term, model)| model.truth(term, when, resolve));
        match (stored, computed) {
            (Some(s), Some(c)) => Some(if c.confidence > s.confidence { c } else { s }),
            (s, c) => s.or(c),
        }
    }

    /// Best stored answer to `question`, ranked by confidence at the
    /// question's time.
    pub fn match_task(&self, question: &Task, dur: u32) -> Option<Arc<Task>> {
        let when = question.occurrence();
        self.tasks()
            .into_iter()
            .filter(|t| !t.is_deleted() && answers(question.term(), t.term()))
            .max_by(|a, b| {
                projected_conf(a, when, dur)
                    .partial_cmp(&projected_conf(b, when, dur))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Strongest stored task of any kind.
    pub fn strongest(&self) -> Option<Arc<Task>> {
        self.answer(ETERNAL, 1)
    }

    /// Every stored task.
    pub fn tasks(&self) -> Vec<Arc<Task>> {
        let mut out = self.eternal.tasks().to_vec();
        match &self.time {
            TimeTable::Temporal(t) => out.extend(t.tasks().iter().cloned()),
            TimeTable::Series(s) => out.extend(s.tasks()),
        }
        out
    }

    pub fn len(&self) -> usize {
        self.eternal.len()
            + match &self.time {
                TimeTable::Temporal(t) => t.len(),
                TimeTable::Series(s) => s.len(),
            }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove everything; the caller deletes the returned tasks.
    pub fn clear(&mut self) -> Vec<Arc<Task>> {
        let mut out = self.eternal.clear();
        match &mut self.time {
            TimeTable::Temporal(t) => out.extend(t.clear()),
            TimeTable::Series(s) => out.extend(s.clear()),
        }
        out
    }
}

/// Projected truth of `task` at `when` (shorthand used by answer selection).
pub(crate) fn projected_conf(task: &Task, when: i64, dur: u32) -> f32 {
    task.truth()
        .map_or(0.0, |t| project(&t, task.occurrence(), when, dur).confidence)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::budget::Budget;
    use crate::task::{Origin, TaskDraft, TaskId};
    use nars_contract::{Punctuation, Stamp};

    pub(crate) fn ctx_ids() -> Serials {
        Serials::new(1000)
    }

    pub(crate) fn event(term: &str, f: f32, c: f32, ids: &[u64], pri: f32, occ: i64) -> Arc<Task> {
        Arc::new(
            TaskDraft {
                term: Term::parse(term).unwrap(),
                punctuation: Punctuation::Belief,
                truth: Some(TruthValue::new(f, c)),
                occurrence: occ,
                stamp: Stamp::new(ids.iter().copied()),
                budget: Budget::new(pri, 0.5, 0.5),
                origin: Origin::Input,
                causes: vec![],
                source: None,
            }
            .build(TaskId(ids[0]), 0),
        )
    }

    pub(crate) fn belief(term: &str, f: f32, c: f32, ids: &[u64], pri: f32) -> Arc<Task> {
        event(term, f, c, ids, pri, ETERNAL)
    }

    fn no_resolve(_: &Term, _: i64) -> Option<TruthValue> {
        None
    }

    #[test]
    fn test_interpolate_averages_offsets() {
        let a = Term::parse("(x ==>+2 y)").unwrap();
        let b = Term::parse("(x ==>+6 y)").unwrap();
        let t = interpolate(&a, &b, 1.0, 1.0).unwrap();
        assert_eq!(t.dt(), 4);
        let c = Term::parse("(x ==>+6 z)").unwrap();
        assert!(interpolate(&a, &c, 1.0, 1.0).is_none());
    }

    #[test]
    fn test_query_variables_match_consistently() {
        let q = Term::parse("(?x-->b)").unwrap();
        assert!(answers(&q, &Term::parse("(a-->b)").unwrap()));
        assert!(!answers(&q, &Term::parse("(a-->c)").unwrap()));
        let q2 = Term::parse("((*,?x,?x)-->r)").unwrap();
        assert!(!answers(&q2, &Term::parse("((*,a,b)-->r)").unwrap()));
        assert!(answers(&q2, &Term::parse("((*,a,a)-->r)").unwrap()));
        let open = Term::parse("(a ==>+- b)").unwrap();
        assert!(answers(&open, &Term::parse("(a ==>+5 b)").unwrap()));
    }

    #[test]
    fn test_empty_table_has_no_belief() {
        let table = BeliefTable::new(4, 4);
        assert!(table.answer(ETERNAL, 1).is_none());
        assert!(table.truth(5, 1, &no_resolve).is_none());
    }

    #[test]
    fn test_eternal_background_blends_with_event() {
        let ids = ctx_ids();
        let ctx = TableContext::new(10, 1, 0.01, &ids);
        let mut table = BeliefTable::new(4, 4);
        table.add(belief("(a-->b)", 1.0, 0.5, &[1], 0.5), &ctx);
        table.add(event("(a-->b)", 1.0, 0.5, &[2], 0.5, 10), &ctx);
        let t = table.truth(10, 1, &no_resolve).unwrap();
        assert!(t.confidence > 0.5, "event and background evidence combine");
        let far = table.truth(1000, 1, &no_resolve).unwrap();
        assert!(far.confidence < t.confidence);
        assert!(far.confidence >= 0.5);
    }

    #[test]
    fn test_eternal_query_eternalizes_events() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids);
        let mut table = BeliefTable::new(4, 4);
        table.add(event("(a-->b)", 1.0, 0.9, &[1], 0.5, 3), &ctx);
        let t = table.stored_truth(ETERNAL, 1).unwrap();
        assert!(t.confidence < 0.9);
    }
}
