//! Property Proofs: invariants that hold across modules.
//!
//! Randomized checks use a seeded `StdRng` so every failure reproduces.
//!
//! Run: `cargo test --test proof_properties`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ladybug_nars::bag::{Bag, CurveBag, HijackBag};
use ladybug_nars::budget::{Budget, Merge, PriCell};
use ladybug_nars::table::{BeliefTable, EternalTable, TableContext};
use ladybug_nars::task::{Origin, Serials, Task, TaskDraft, TaskId};
use ladybug_nars::{
    CauseId, ConceptKind, ConceptState, Engine, EngineConfig, Error, FnCausable, Punctuation,
    RuleSet, Stamp, TaskEvent, Term, TruthValue, ETERNAL,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn t(s: &str) -> Term {
    Term::parse(s).unwrap()
}

fn judgement(term: &str, f: f32, c: f32, ids: &[u64], occurrence: i64, origin: Origin) -> TaskDraft {
    TaskDraft {
        term: t(term),
        punctuation: Punctuation::Belief,
        truth: Some(TruthValue::new(f, c)),
        occurrence,
        stamp: Stamp::new(ids.iter().copied()),
        budget: Budget::new(0.5, 0.5, 0.5),
        origin,
        causes: vec![],
        source: None,
    }
}

fn belief(term: &str, f: f32, c: f32, ids: &[u64]) -> Arc<Task> {
    Arc::new(judgement(term, f, c, ids, ETERNAL, Origin::Input).build(TaskId(ids[0]), 0))
}

fn unit(b: &Budget) -> bool {
    [b.priority, b.durability, b.quality]
        .iter()
        .all(|v| (0.0..=1.0).contains(v))
}

// =============================================================================
// BUDGETS
// =============================================================================

#[test]
fn property_merge_stays_in_unit_interval() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..2000 {
        let mut a = Budget::new(rng.gen(), rng.gen(), rng.gen());
        let b = Budget::new(rng.gen(), rng.gen(), rng.gen());
        let scale = rng.gen_range(0.0..4.0);
        for policy in [Merge::Max, Merge::Plus, Merge::Blend] {
            let mut m = a;
            m.merge(&b, scale, policy);
            assert!(unit(&m), "{:?} merge left unit interval: {:?}", policy, m);
        }
        a.decay(rng.gen(), true);
        assert!(unit(&a));
    }
}

#[test]
fn property_deleted_budget_refuses_mutation() {
    let cell = PriCell::new(Budget::new(0.5, 0.5, 0.5));
    assert!(cell.delete());
    assert!(!cell.delete(), "deletion happens once");
    assert!(!cell.merge(&Budget::new(0.9, 0.9, 0.9), 1.0, Merge::Plus));
    assert!(!cell.decay(0.5));
    assert!(cell.snapshot().is_none());
    assert_eq!(cell.priority(), 0.0);
}

// =============================================================================
// BAGS
// =============================================================================

#[test]
fn property_bags_never_exceed_capacity() {
    let mut rng = StdRng::seed_from_u64(5);
    let curve: CurveBag<u32, u32> = CurveBag::new(16, Merge::Plus);
    let hijack: HijackBag<u32, u32> = HijackBag::new(16, 4, Merge::Plus, 0.01);
    for step in 0..5000 {
        let key = rng.gen_range(0..200);
        let pri = rng.gen::<f32>();
        match rng.gen_range(0..10) {
            0 => {
                curve.remove(&key);
                hijack.remove(&key);
            }
            1 => {
                curve.forget(0.1);
                hijack.forget(0.1);
            }
            2 if step % 500 == 0 => {
                let cap = rng.gen_range(4..32);
                curve.set_capacity(cap);
                hijack.set_capacity(cap);
            }
            _ => {
                curve.put(key, key, pri);
                hijack.put(key, key, pri);
            }
        }
        assert!(curve.len() <= curve.capacity());
        assert!(hijack.len() <= hijack.capacity());
        assert_eq!(hijack.items().len(), hijack.len());
    }
}

#[test]
fn property_full_bag_evicts_only_for_stronger() {
    let curve: CurveBag<u32, ()> = CurveBag::new(3, Merge::Plus);
    for (k, p) in [(1, 0.4), (2, 0.6), (3, 0.8)] {
        curve.put(k, (), p);
    }
    assert!(!curve.put(4, (), 0.1).is_stored());
    assert!(curve.put(5, (), 0.5).is_stored());
    assert!(curve.get(&1).is_none(), "the weakest entry made room");
    assert_eq!(curve.stats().reject, 1);
}

// =============================================================================
// TABLES
// =============================================================================

#[test]
fn property_overlapping_evidence_never_revises() {
    let mut rng = StdRng::seed_from_u64(23);
    let ids = Serials::new(10_000);
    let ctx = TableContext::new(0, 1, 0.01, &ids);
    for _ in 0..300 {
        let mut table = EternalTable::new(4);
        let shared = rng.gen_range(1..50u64);
        let a = belief("(a-->b)", rng.gen(), rng.gen_range(0.1..0.9), &[shared, 100]);
        let b = belief("(a-->b)", rng.gen(), rng.gen_range(0.1..0.9), &[200, shared]);
        table.add(a, &ctx);
        let out = table.add(b, &ctx);
        assert!(out.revised.is_none(), "stamps share {}", shared);
    }
}

#[test]
fn property_revision_is_monotonic_in_confidence() {
    let mut rng = StdRng::seed_from_u64(31);
    let ids = Serials::new(10_000);
    let ctx = TableContext::new(0, 1, 0.01, &ids);
    for i in 0..300u64 {
        let mut table = EternalTable::new(4);
        let f = rng.gen::<f32>();
        let (c1, c2) = (rng.gen_range(0.3..0.9), rng.gen_range(0.3..0.9));
        table.add(belief("(a-->b)", f, c1, &[2 * i + 1]), &ctx);
        let out = table.add(belief("(a-->b)", f, c2, &[2 * i + 2]), &ctx);
        if let Some(r) = out.revised {
            let c = r.truth().unwrap().confidence;
            assert!(c > c1 && c > c2, "revised {} from {} and {}", c, c1, c2);
        }
    }
}

#[test]
fn property_insert_then_query_is_identity() {
    let ids = Serials::new(10_000);
    let ctx = TableContext::new(0, 1, 0.01, &ids);
    for (f, c) in [(1.0, 0.9), (0.3, 0.5), (0.0, 0.99)] {
        let mut table = BeliefTable::new(4, 8);
        let task = belief("(x-->y)", f, c, &[1]);
        table.add(task.clone(), &ctx);
        let s = table.strongest().unwrap();
        assert_eq!(s.term(), task.term());
        assert_eq!(s.truth(), task.truth());
    }
}

#[test]
fn property_empty_table_answers_nothing() {
    let table = BeliefTable::new(4, 8);
    assert!(table.answer(ETERNAL, 1).is_none());
    assert!(table.answer(10, 1).is_none());
    assert!(table.strongest().is_none());
}

// =============================================================================
// ENGINE
// =============================================================================

#[test]
fn property_malformed_rules_abort_startup() {
    let err = RuleSet::compile(&["(A-->B), (B-->C) |- (A-->C)"]).unwrap_err();
    let err: Error = err.into();
    assert!(matches!(err, Error::Rule(_)));
    assert!(RuleSet::compile(&["(A-->B), (B-->C) |- (A-->D), (Belief:Deduction)"]).is_err());
    assert!(RuleSet::compile(&["(A-->B), B |- (A-->B), (Belief:Nonsense)"]).is_err());
}

#[test]
fn property_unusable_input_is_declined_silently() {
    let engine = Engine::standard(EngineConfig::small()).unwrap();
    assert!(engine.input_narsese("a.").unwrap().is_none());
    assert!(engine.input_narsese("(?x-->b).").unwrap().is_none());
    assert!(engine.input_narsese("(a-->").is_err(), "syntax is an error, not a rejection");
    assert_eq!(engine.stats().declined, 2);
    assert_eq!(engine.stats().tasks, 0);
}

#[test]
fn property_concept_index_is_bounded() {
    let mut cfg = EngineConfig::small();
    cfg.bag.concepts = 16;
    let engine = Engine::standard(cfg).unwrap();
    for i in 0..60 {
        engine.input_narsese(&format!("(n{}-->m{}).", i, i)).unwrap();
    }
    assert!(engine.concepts().len() <= 16);
    for (c, _) in engine.concepts().concepts() {
        assert_ne!(c.state(), ConceptState::Deleted, "index holds only live concepts");
    }
}

#[test]
fn property_negation_stored_on_positive_term() {
    let engine = Engine::standard(EngineConfig::small()).unwrap();
    let task = engine.input_narsese("(--,(a-->b)). %0.8;0.9%").unwrap().unwrap();
    assert_eq!(task.term(), &t("(a-->b)"));
    assert!((task.truth().unwrap().frequency - 0.2).abs() < 1e-6);
    let neg = engine.belief_truth(&t("(--,(a-->b))"), ETERNAL).unwrap();
    assert!((neg.frequency - 0.8).abs() < 1e-6);
}

#[test]
fn property_strong_goal_becomes_decision() {
    let engine = Engine::standard(EngineConfig::small()).unwrap();
    let decisions = Arc::new(Mutex::new(Vec::new()));
    let sink = decisions.clone();
    engine.on_task(move |ev, task| {
        if ev == TaskEvent::Decision {
            sink.lock().push(task.term().clone());
        }
    });
    engine.input_narsese("(self-->[fed])! %1.0;0.9%").unwrap();
    engine.input_narsese("(self-->[bored])! %0.1;0.9%").unwrap();
    assert_eq!(decisions.lock().as_slice(), &[t("(self-->[fed])")]);
    assert_eq!(engine.stats().decisions, 1);
}

/// Value of a cause whose temporal prediction is later met by input of
/// frequency `observed`.
fn predictor_value(observed: f32) -> f32 {
    let engine = Engine::standard(EngineConfig::small()).unwrap();
    let predictor = engine.register_cause("predictor");
    let mut prior = judgement("(rain-->[wet])", 1.0, 0.8, &[], 5, Origin::Derived);
    prior.stamp = Stamp::input(engine.next_evidence());
    prior.causes = vec![predictor];
    assert!(engine.input_draft(prior).is_some());

    engine
        .input_narsese(&format!("(rain-->[wet]). @5 %{:.1};0.9%", observed))
        .unwrap();
    let attention = &engine.config().attention;
    engine.causes().update(&attention.weights, attention.momentum);
    engine.causes().value(predictor)
}

#[test]
fn property_prediction_accuracy_feeds_back_to_cause() {
    let accurate = predictor_value(0.9);
    let inaccurate = predictor_value(0.0);
    assert!(
        accurate > inaccurate,
        "accurate {} should beat inaccurate {}",
        accurate,
        inaccurate
    );
}

#[test]
fn property_series_concept_is_append_only() {
    let engine = Engine::standard(EngineConfig::small()).unwrap();
    let term = t("(sensor-->[hot])");
    let c = engine.series(&term).unwrap();
    assert_eq!(c.kind(), ConceptKind::Series);

    engine.input_narsese("(sensor-->[hot]). @1 %1.0;0.9%").unwrap();
    engine.input_narsese("(sensor-->[hot]). @3 %0.0;0.9%").unwrap();
    assert!(engine.input_narsese("(sensor-->[hot]). @2 %1.0;0.9%").unwrap().is_none());

    let mid = engine.belief_truth(&term, 2).unwrap();
    assert!(mid.frequency > 0.2 && mid.frequency < 0.8, "interpolated: {:?}", mid);
}

#[test]
fn property_registered_causable_is_scheduled() {
    let engine = Engine::standard(EngineConfig::small()).unwrap();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let cause: CauseId = engine.register_cause("sensor");
    engine.register(Arc::new(FnCausable::new("sensor", cause, move |e: &Engine, n| {
        counter.fetch_add(1, Ordering::Relaxed);
        e.input_narsese("(light-->[on]). :|:").ok();
        n
    })));
    for _ in 0..30 {
        engine.tick();
    }
    assert!(runs.load(Ordering::Relaxed) > 0, "sensor never ran");
    assert_eq!(engine.stats().focus.len(), 2);
}

#[test]
fn property_reasoning_answers_question() {
    let engine = Engine::standard(EngineConfig::small()).unwrap();
    engine.input_narsese("(robin-->bird).").unwrap();
    engine.input_narsese("(bird-->animal).").unwrap();
    let q = engine.input_narsese("(robin-->animal)?").unwrap().unwrap();
    for _ in 0..300 {
        if engine.best_answer(&q).is_some() {
            break;
        }
        engine.tick();
    }
    let a = engine.best_answer(&q).expect("answer derived within 300 ticks");
    assert_eq!(a.term(), &t("(robin-->animal)"));
    assert!(a.truth().unwrap().frequency > 0.5);
}
