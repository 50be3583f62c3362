//! Engine: the process-wide reasoning context.
//!
//! Owns everything that would otherwise be global: configuration, clock,
//! RNG, compiled rules, the concept index, the task store, the cause
//! registry and the focus scheduler. Components receive it by reference.
//!
//! ```text
//!   input ──▶ commit ──▶ concept tables ──▶ links ──▶ activation
//!                ▲                                      │
//!                │            tick(): focus picks       ▼
//!             derived ◀── Deriver ◀── premises ◀── sample concept/links
//! ```
//!
//! Only the commit into a concept's tables takes that concept's lock;
//! premise formation and derivation work on shared immutable tasks.

mod commit;
mod cycle;

pub use cycle::DeriveCausable;

use crate::attention::{Causable, CauseId, CauseValue, Causes, Focus, FocusEntry};
use crate::bag::BagStatsSnapshot;
use crate::budget::{truth_to_quality, Budget};
use crate::concept::{Concept, ConceptIndex, ConceptKind};
use crate::config::EngineConfig;
use crate::derive::{DeriveStatsSnapshot, Deriver, RuleSet};
use crate::task::{Origin, Serials, Task, TaskDraft, TaskId};
use crate::time::{Clock, CycleClock};
use crate::Result;
use nars_contract::{parse_task, Punctuation, Stamp, TaskSpec, Tense, Term, TruthValue};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, trace};

/// What happened to a task, as seen by listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TaskEvent {
    Input,
    Derived,
    Revised,
    /// The task is a new best answer to `question`.
    Answer { question: TaskId },
    /// A goal strong enough to act on.
    Decision,
    Deleted,
}

pub type Listener = Box<dyn Fn(TaskEvent, &Arc<Task>) + Send + Sync>;

#[derive(Debug, Default)]
struct Counters {
    input: AtomicU64,
    derived: AtomicU64,
    revised: AtomicU64,
    answers: AtomicU64,
    decisions: AtomicU64,
    deleted: AtomicU64,
    declined: AtomicU64,
}

impl Counters {
    fn bump(c: &AtomicU64) {
        c.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time summary, serializable for reports.
#[derive(Clone, Debug, Serialize)]
pub struct EngineStats {
    pub time: i64,
    pub concepts: usize,
    pub tasks: usize,
    pub input: u64,
    pub derived: u64,
    pub revised: u64,
    pub answers: u64,
    pub decisions: u64,
    pub deleted: u64,
    /// Tasks the engine could not use (unconceptualizable, rejected by every table).
    pub declined: u64,
    pub derive: DeriveStatsSnapshot,
    pub concept_bag: BagStatsSnapshot,
    pub causes: Vec<CauseValue>,
    pub focus: Vec<FocusEntry>,
}

pub struct Engine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
    deriver: Deriver,
    concepts: ConceptIndex,
    tasks: RwLock<HashMap<TaskId, Arc<Task>>>,
    causes: Causes,
    focus: Mutex<Focus>,
    listeners: RwLock<Vec<Listener>>,
    task_ids: Serials,
    evidence: Serials,
    input_cause: CauseId,
    derive_cause: CauseId,
    counters: Counters,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("time", &self.time())
            .field("concepts", &self.concepts)
            .field("rules", &self.deriver.rules().len())
            .field("causes", &self.causes)
            .finish()
    }
}

impl Engine {
    /// Engine on a [`CycleClock`] starting at 0.
    pub fn new(config: EngineConfig, rules: RuleSet) -> Result<Engine> {
        let clock = Arc::new(CycleClock::new(config.dur));
        Self::with_clock(config, rules, clock)
    }

    /// Engine with the built-in rule table.
    pub fn standard(config: EngineConfig) -> Result<Engine> {
        Self::new(config, RuleSet::standard()?)
    }

    pub fn with_clock(config: EngineConfig, rules: RuleSet, clock: Arc<dyn Clock>) -> Result<Engine> {
        config.validate()?;
        let causes = Causes::new();
        // rule i owns cause i
        for rule in rules.rules() {
            causes.register(format!("rule {}", rule.source));
        }
        let input_cause = causes.register("input");
        let derive_cause = causes.register("derive");

        let mut focus = Focus::new(config.attention.focus.clone());
        focus.register(Arc::new(DeriveCausable::new(derive_cause)));

        info!(
            rules = rules.len(),
            concepts = config.bag.concepts,
            seed = config.seed,
            "engine started"
        );
        Ok(Engine {
            rng: Mutex::new(StdRng::seed_from_u64(config.seed)),
            deriver: Deriver::new(rules, config.derive.clone(), clock.dur()),
            concepts: ConceptIndex::new(config.bag.concepts),
            tasks: RwLock::new(HashMap::new()),
            causes,
            focus: Mutex::new(focus),
            listeners: RwLock::new(Vec::new()),
            task_ids: Serials::new(1),
            evidence: Serials::new(1),
            input_cause,
            derive_cause,
            counters: Counters::default(),
            clock,
            config,
        })
    }

    // === Accessors ===

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn time(&self) -> i64 {
        self.clock.time()
    }

    pub fn dur(&self) -> u32 {
        self.clock.dur()
    }

    pub fn causes(&self) -> &Causes {
        &self.causes
    }

    pub fn deriver(&self) -> &Deriver {
        &self.deriver
    }

    pub fn concepts(&self) -> &ConceptIndex {
        &self.concepts
    }

    pub fn task(&self, id: TaskId) -> Option<Arc<Task>> {
        self.tasks.read().get(&id).cloned()
    }

    // === Ingress ===

    /// Stamp, budget and commit an input task.
    ///
    /// `None` when the engine cannot use it (e.g. a belief on a bare atom).
    pub fn input(&self, spec: TaskSpec) -> Option<Arc<Task>> {
        let occurrence = spec.tense.resolve(self.time(), self.dur());
        let quality = spec.truth.as_ref().map_or(0.5, truth_to_quality);
        let draft = TaskDraft {
            term: spec.term,
            punctuation: spec.punctuation,
            truth: spec.truth,
            occurrence,
            stamp: Stamp::input(self.evidence.next()),
            budget: Budget::new(self.config.input_priority, self.config.input_durability, quality),
            origin: Origin::Input,
            causes: vec![self.input_cause],
            source: None,
        };
        self.input_draft(draft)
    }

    /// Commit a fully specified draft (explicit stamp, budget, occurrence).
    pub fn input_draft(&self, draft: TaskDraft) -> Option<Arc<Task>> {
        let event = match draft.origin {
            Origin::Input => commit::Kind::Input,
            Origin::Derived | Origin::Revision => commit::Kind::Derived,
        };
        let Some(draft) = draft.normalized() else {
            Counters::bump(&self.counters.declined);
            trace!("input declined: term cannot carry its punctuation");
            return None;
        };
        let task = Arc::new(draft.build(TaskId(self.task_ids.next()), self.time()));
        self.commit(task, event)
    }

    /// Parse and input one Narsese line.
    pub fn input_narsese(&self, line: &str) -> Result<Option<Arc<Task>>> {
        let spec = parse_task(line)?;
        Ok(self.input(spec))
    }

    /// Fresh evidence serial, for callers that build their own stamps.
    pub fn next_evidence(&self) -> u64 {
        self.evidence.next()
    }

    /// Pose a question (`?`) or quest (`@`); the returned task stays
    /// pending in its concept until capacity pressure removes it.
    pub fn ask(&self, term: Term, punctuation: Punctuation, when: Tense) -> Option<Arc<Task>> {
        if !punctuation.is_query() {
            return None;
        }
        self.input(TaskSpec::new(term, punctuation, None, when))
    }

    /// Best answer recorded so far for a pending question.
    pub fn best_answer(&self, question: &Task) -> Option<Arc<Task>> {
        let concept = self.concepts.get(question.term())?;
        let mut tables = concept.tables()?;
        let table = tables.queries(question.punctuation())?;
        table.best_answer(question.id())
    }

    // === Concepts ===

    pub fn concept(&self, term: &Term) -> Option<Arc<Concept>> {
        self.concepts.get(term)
    }

    /// Existing concept, or a new one at input priority.
    pub fn conceptualize(&self, term: &Term) -> Option<Arc<Concept>> {
        self.conceptualize_as(term, None)
    }

    /// Declare `term` a series concept. An existing concept keeps its kind.
    pub fn series(&self, term: &Term) -> Option<Arc<Concept>> {
        self.conceptualize_as(term, Some(ConceptKind::Series))
    }

    fn conceptualize_as(&self, term: &Term, kind: Option<ConceptKind>) -> Option<Arc<Concept>> {
        let out = self
            .concepts
            .conceptualize(term, kind, self.config.input_priority, &self.config);
        if let Some(old) = out.evicted {
            self.delete_concept(&old);
        }
        out.concept
    }

    /// Belief truth of `term` at `when`, including structurally computed
    /// truth for dynamic concepts.
    pub fn belief_truth(&self, term: &Term, when: i64) -> Option<TruthValue> {
        self.truth(term, Punctuation::Belief, when)
    }

    /// Desire truth of `term` at `when`.
    pub fn goal_truth(&self, term: &Term, when: i64) -> Option<TruthValue> {
        self.truth(term, Punctuation::Goal, when)
    }

    fn truth(&self, term: &Term, punct: Punctuation, when: i64) -> Option<TruthValue> {
        if term.is_neg() {
            return self.truth(&term.unneg(), punct, when).map(|t| t.negation());
        }
        let dur = self.dur();
        let resolve = |t: &Term, w: i64| self.truth(t, punct, w);
        let from_table = self.concepts.get(term).and_then(|c| {
            let mut tables = c.tables()?;
            tables.judgements(punct)?.truth(when, dur, &resolve)
        });
        from_table.or_else(|| {
            // a structural term nobody has mentioned yet
            crate::table::DynamicModel::of(term).and_then(|m| m.truth(term, when, &resolve))
        })
    }

    // === Egress ===

    pub fn on_task(&self, listener: impl Fn(TaskEvent, &Arc<Task>) + Send + Sync + 'static) {
        self.listeners.write().push(Box::new(listener));
    }

    fn emit(&self, event: TaskEvent, task: &Arc<Task>) {
        for l in self.listeners.read().iter() {
            l(event, task);
        }
    }

    // === Attention ===

    /// New cause for a host-side process.
    pub fn register_cause(&self, name: impl Into<String>) -> CauseId {
        self.causes.register(name)
    }

    /// Schedule a causable; returns its focus slot.
    pub fn register(&self, causable: Arc<dyn Causable>) -> usize {
        self.focus.lock().register(causable)
    }

    pub fn input_cause(&self) -> CauseId {
        self.input_cause
    }

    pub fn derive_cause(&self) -> CauseId {
        self.derive_cause
    }

    pub fn stats(&self) -> EngineStats {
        let l = |c: &AtomicU64| c.load(Ordering::Relaxed);
        EngineStats {
            time: self.time(),
            concepts: self.concepts.len(),
            tasks: self.tasks.read().len(),
            input: l(&self.counters.input),
            derived: l(&self.counters.derived),
            revised: l(&self.counters.revised),
            answers: l(&self.counters.answers),
            decisions: l(&self.counters.decisions),
            deleted: l(&self.counters.deleted),
            declined: l(&self.counters.declined),
            derive: self.deriver.stats(),
            concept_bag: self.concepts.stats(),
            causes: self.causes.values(),
            focus: self.focus.lock().entries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nars_contract::ETERNAL;

    fn engine() -> Engine {
        Engine::standard(EngineConfig::small()).unwrap()
    }

    fn t(s: &str) -> Term {
        Term::parse(s).unwrap()
    }

    #[test]
    fn test_rule_causes_come_first() {
        let e = engine();
        let n = e.deriver().rules().len() as u32;
        assert_eq!(e.input_cause(), CauseId(n));
        assert_eq!(e.derive_cause(), CauseId(n + 1));
    }

    #[test]
    fn test_input_stores_belief() {
        let e = engine();
        let task = e.input_narsese("(a-->b). %0.8;0.7%").unwrap().unwrap();
        assert!(e.task(task.id()).is_some());
        let truth = e.belief_truth(&t("(a-->b)"), ETERNAL).unwrap();
        assert!((truth.frequency - 0.8).abs() < 1e-6);
        assert_eq!(e.stats().input, 1);
    }

    #[test]
    fn test_unusable_input_is_declined() {
        let e = engine();
        assert!(e.input_narsese("a.").unwrap().is_none());
        assert!(e.input_narsese("(a-->").is_err());
        assert_eq!(e.stats().declined, 1);
    }

    #[test]
    fn test_negated_input_lands_on_positive_term() {
        let e = engine();
        e.input_narsese("(--,(a-->b)). %0.9;0.9%").unwrap().unwrap();
        let pos = e.belief_truth(&t("(a-->b)"), ETERNAL).unwrap();
        assert!((pos.frequency - 0.1).abs() < 1e-6);
        let neg = e.belief_truth(&t("(--,(a-->b))"), ETERNAL).unwrap();
        assert!((neg.frequency - 0.9).abs() < 1e-6);
        assert!(e.concept(&t("(--,(a-->b))")).is_none(), "input made no negation concept");
    }

    #[test]
    fn test_negation_concept_is_found_after_creation() {
        let e = engine();
        let term = t("(--,(a-->b))");
        let made = e.conceptualize(&term).unwrap();
        assert_eq!(made.kind(), ConceptKind::Negation);
        let found = e.concept(&term).expect("same key for lookup and creation");
        assert!(Arc::ptr_eq(&made, &found));
        assert!(e.concept(&t("(a-->b)")).is_none());
    }

    #[test]
    fn test_dynamic_truth_from_components() {
        let e = engine();
        e.input_narsese("(m-->a). %1.0;0.9%").unwrap();
        e.input_narsese("(m-->b). %0.5;0.9%").unwrap();
        let t = e.belief_truth(&t("(m-->(&,a,b))"), ETERNAL).unwrap();
        assert!((t.frequency - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_listener_sees_input() {
        let e = engine();
        let seen = Arc::new(AtomicU64::new(0));
        let s = seen.clone();
        e.on_task(move |ev, _| {
            if ev == TaskEvent::Input {
                s.fetch_add(1, Ordering::Relaxed);
            }
        });
        e.input_narsese("(a-->b).").unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 1);
    }
}
