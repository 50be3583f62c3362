//! Derivation: premises in, derived task drafts out
//!
//! ```text
//! Premise ──▶ quality gate ──▶ candidates(task op, belief op)
//!                                │ per rule:
//!                                ▼
//!   punctuation gate ─▶ overlap gate ─▶ unify task ─▶ unify belief ─▶ constraints
//!               │
//!               ▼
//!   truth fn ─▶ conclusion ─▶ volume gate ─▶ temporalize ─▶ budget gate ─▶ TaskDraft
//! ```
//!
//! Every gate is a silent rejection counted in [`DeriveStats`]. Malformed
//! rules never get this far: [`RuleSet::compile`] refuses them.

mod compile;
mod premise;
mod rule;
mod temporal;
mod truth_fn;
mod unify;

pub use compile::RuleSet;
pub use premise::Premise;
pub use rule::{parse_pattern, Bindings, Constraint, Rule, RuleError, TimeMode};
pub use temporal::{solve, Side, Solved};
pub use truth_fn::TruthFn;
pub use unify::unify;

use crate::budget::derived_budget;
use crate::config::DeriveConfig;
use crate::task::{Origin, TaskDraft};
use crate::time;
use nars_contract::{Stamp, TruthValue, ETERNAL};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Priority cost of single-premise rules relative to two-premise ones.
const SINGLE_COST: f32 = 0.5;

// =============================================================================
// COUNTERS
// =============================================================================

#[derive(Debug, Default)]
pub struct DeriveStats {
    premises: AtomicU64,
    quality: AtomicU64,
    matched: AtomicU64,
    derived: AtomicU64,
    overlap: AtomicU64,
    no_belief: AtomicU64,
    confidence: AtomicU64,
    term: AtomicU64,
    volume: AtomicU64,
    temporal: AtomicU64,
    budget: AtomicU64,
}

fn bump(c: &AtomicU64) {
    c.fetch_add(1, Ordering::Relaxed);
}

impl DeriveStats {
    pub fn snapshot(&self) -> DeriveStatsSnapshot {
        let l = |c: &AtomicU64| c.load(Ordering::Relaxed);
        DeriveStatsSnapshot {
            premises: l(&self.premises),
            quality: l(&self.quality),
            matched: l(&self.matched),
            derived: l(&self.derived),
            overlap: l(&self.overlap),
            no_belief: l(&self.no_belief),
            confidence: l(&self.confidence),
            term: l(&self.term),
            volume: l(&self.volume),
            temporal: l(&self.temporal),
            budget: l(&self.budget),
        }
    }
}

/// Rejections are counted per gate; `matched` counts rules whose patterns
/// and constraints held.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeriveStatsSnapshot {
    pub premises: u64,
    pub quality: u64,
    pub matched: u64,
    pub derived: u64,
    pub overlap: u64,
    pub no_belief: u64,
    pub confidence: u64,
    pub term: u64,
    pub volume: u64,
    pub temporal: u64,
    pub budget: u64,
}

// =============================================================================
// DERIVER
// =============================================================================

/// Applies a compiled rule set to premises.
#[derive(Debug)]
pub struct Deriver {
    rules: RuleSet,
    config: DeriveConfig,
    dur: u32,
    stats: DeriveStats,
}

impl Deriver {
    pub fn new(rules: RuleSet, config: DeriveConfig, dur: u32) -> Self {
        Self {
            rules,
            config,
            dur: dur.max(1),
            stats: DeriveStats::default(),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn stats(&self) -> DeriveStatsSnapshot {
        self.stats.snapshot()
    }

    /// Every conclusion of every matching rule.
    pub fn derive(&self, premise: &Premise) -> Vec<TaskDraft> {
        bump(&self.stats.premises);
        if premise.task.is_deleted() {
            return Vec::new();
        }
        if premise.quality < self.config.quality_min {
            bump(&self.stats.quality);
            trace!(task = %premise.task, quality = premise.quality, "premise below quality floor");
            return Vec::new();
        }
        let belief_term = premise.belief_or_link();
        self.rules
            .candidates(premise.task.term(), belief_term)
            .into_iter()
            .filter_map(|rule| self.apply(rule, premise))
            .collect()
    }

    /// Derive a batch, in parallel when the `parallel` feature is on.
    pub fn derive_all(&self, premises: &[Premise]) -> Vec<TaskDraft> {
        #[cfg(feature = "parallel")]
        {
            premises.par_iter().flat_map_iter(|p| self.derive(p)).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            premises.iter().flat_map(|p| self.derive(p)).collect()
        }
    }

    fn apply(&self, rule: &Rule, premise: &Premise) -> Option<TaskDraft> {
        let task = &premise.task;
        let punct = task.punctuation();
        if !rule.accepts(punct) {
            return None;
        }
        let belief = if rule.single {
            None
        } else {
            premise.belief.as_ref()
        };
        if let Some(b) = belief {
            if !rule.overlap && task.stamp().overlaps(b.stamp()) {
                bump(&self.stats.overlap);
                trace!(rule = %rule.source, "evidence overlap");
                return None;
            }
        }

        let belief_target = if rule.single {
            &premise.belief_term
        } else {
            premise.belief_or_link()
        };
        let mut bindings = Bindings::new();
        if !unify(&rule.task, task.term(), &mut bindings)
            || !unify(&rule.belief, belief_target, &mut bindings)
            || !rule.constraints.iter().all(|c| c.holds(&bindings))
        {
            return None;
        }
        bump(&self.stats.matched);

        let truth = match rule.truth_fn(punct) {
            Some(f) => {
                let task_truth = task.truth()?;
                let belief_truth = belief.and_then(|b| self.belief_truth(b, task.occurrence()));
                if !f.is_single() && belief_truth.is_none() {
                    bump(&self.stats.no_belief);
                    return None;
                }
                let t = f.apply(&task_truth, belief_truth.as_ref())?;
                if t.confidence < self.config.confidence_min {
                    bump(&self.stats.confidence);
                    trace!(rule = %rule.source, conf = t.confidence, "below confidence floor");
                    return None;
                }
                Some(t)
            }
            None => None,
        };

        let conclusion = match rule.conclusion.replace(&bindings) {
            Ok(t) => t,
            Err(_) => {
                bump(&self.stats.term);
                return None;
            }
        };
        if conclusion.volume() > self.config.max_volume {
            bump(&self.stats.volume);
            trace!(rule = %rule.source, volume = conclusion.volume(), "conclusion too large");
            return None;
        }

        let task_side = Side {
            term: task.term(),
            occurrence: task.occurrence(),
        };
        let belief_side = belief.map(|b| Side {
            term: b.term(),
            occurrence: b.occurrence(),
        });
        let Some(solved) = solve(rule.time, conclusion, task_side, belief_side) else {
            bump(&self.stats.temporal);
            return None;
        };
        let truth = truth.map(|t| self.reproject(t, rule.time, task.occurrence(), solved.occurrence));

        let cost = if rule.single { SINGLE_COST } else { 1.0 };
        let budget = derived_budget(
            premise.priority,
            premise.durability,
            truth.as_ref(),
            solved.term.volume(),
            cost,
        );
        if budget.priority < self.config.priority_min {
            bump(&self.stats.budget);
            return None;
        }

        let stamp = match belief {
            Some(b) => Stamp::zip(task.stamp(), b.stamp()),
            None => task.stamp().clone(),
        };
        let mut causes = vec![rule.id];
        causes.extend(task.causes().iter().copied().filter(|c| *c != rule.id));

        let draft = TaskDraft {
            term: solved.term,
            punctuation: punct,
            truth,
            occurrence: solved.occurrence,
            stamp,
            budget,
            origin: Origin::Derived,
            causes,
            source: Some(premise.source()),
        }
        .normalized()?;
        bump(&self.stats.derived);
        Some(draft)
    }

    /// Belief truth as seen from the task's time.
    fn belief_truth(&self, belief: &crate::task::Task, when: i64) -> Option<TruthValue> {
        let t = belief.truth()?;
        Some(match (when == ETERNAL, belief.is_eternal()) {
            (true, false) => t.eternalize(),
            (false, false) => time::project(&t, belief.occurrence(), when, self.dur),
            _ => t,
        })
    }

    /// Moving a conclusion away from the task's time costs confidence.
    /// Offset-carrying modes place it by content, not by projection.
    fn reproject(&self, t: TruthValue, mode: TimeMode, from: i64, to: i64) -> TruthValue {
        match mode {
            TimeMode::Dt | TimeMode::Forward | TimeMode::Backward => t,
            _ => time::project(&t, from, to, self.dur),
        }
    }
}
