//! Series table: an append-only stream of observations.
//!
//! Used for terms fed continuously from outside (sensors, predictions).
//! Lookups inside the stored window interpolate between the neighbors;
//! outside it the nearest end is projected. When full, the two oldest
//! observations are compacted into one revised task if their evidence is
//! disjoint, otherwise the oldest is dropped.

use super::eternal::revision_draft;
use super::{interpolate, Insertion, TableContext};
use crate::task::{Task, TaskId};
use crate::time::project;
use nars_contract::TruthValue;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug)]
pub struct SeriesTable {
    capacity: usize,
    entries: VecDeque<Arc<Task>>,
}

impl SeriesTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(2),
            entries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tasks(&self) -> Vec<Arc<Task>> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<Arc<Task>> {
        self.entries.back().cloned()
    }

    pub fn add(&mut self, task: Arc<Task>, ctx: &TableContext) -> Insertion {
        if task.is_deleted() || task.truth().is_none() || task.is_eternal() {
            return Insertion::default();
        }
        if let Some(last) = self.entries.back() {
            if task.occurrence() < last.occurrence() {
                trace!(task = %task, "series is append-only");
                return Insertion::default();
            }
            if task.occurrence() == last.occurrence() && task.stamp().same_evidence(last.stamp()) {
                return Insertion::duplicate(last.clone());
            }
        }
        self.entries.push_back(task.clone());
        let mut out = Insertion {
            stored: Some(task),
            ..Default::default()
        };
        while self.entries.len() > self.capacity {
            self.compact(ctx, &mut out);
        }
        out
    }

    /// Fold the two oldest observations into one.
    fn compact(&mut self, ctx: &TableContext, out: &mut Insertion) {
        let (Some(a), Some(b)) = (self.entries.pop_front(), self.entries.pop_front()) else {
            return;
        };
        let merged = match (a.truth(), b.truth()) {
            (Some(ta), Some(tb)) if !a.stamp().overlaps(b.stamp()) => {
                let (wa, wb) = (ta.weight(), tb.weight());
                interpolate(a.term(), b.term(), wa, wb).map(|term| {
                    let mid = (a.occurrence() as f64 * wa as f64 + b.occurrence() as f64 * wb as f64)
                        / ((wa + wb) as f64).max(f64::EPSILON);
                    Arc::new(
                        revision_draft(&b, &a, term, ta.revision(&tb), mid.round() as i64)
                            .build(TaskId(ctx.ids.next()), ctx.now),
                    )
                })
            }
            _ => None,
        };
        match merged {
            Some(m) => {
                self.entries.push_front(m.clone());
                out.revised = Some(m);
                out.evicted.push(a);
                out.evicted.push(b);
            }
            None => {
                self.entries.push_front(b);
                out.evicted.push(a);
            }
        }
    }

    /// Nearest observation to `when`.
    pub fn answer(&self, when: i64) -> Option<Arc<Task>> {
        self.entries
            .iter()
            .min_by_key(|t| (t.occurrence() - when).unsigned_abs())
            .cloned()
    }

    /// Truth at `when`: interpolated inside the window, projected outside.
    pub fn truth(&self, when: i64, dur: u32) -> Option<TruthValue> {
        let first = self.entries.front()?;
        let last = self.entries.back()?;
        if when <= first.occurrence() {
            return first.truth().map(|t| project(&t, first.occurrence(), when, dur));
        }
        if when >= last.occurrence() {
            return last.truth().map(|t| project(&t, last.occurrence(), when, dur));
        }
        let i = self.entries.partition_point(|e| e.occurrence() <= when);
        let (a, b) = (&self.entries[i - 1], &self.entries[i]);
        let (ta, tb) = (a.truth()?, b.truth()?);
        let span = (b.occurrence() - a.occurrence()) as f32;
        if span <= 0.0 {
            return Some(ta);
        }
        let x = (when - a.occurrence()) as f32 / span;
        Some(TruthValue::new(
            ta.frequency + (tb.frequency - ta.frequency) * x,
            ta.confidence.min(tb.confidence),
        ))
    }

    pub fn clear(&mut self) -> Vec<Arc<Task>> {
        self.entries.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::{ctx_ids, event};

    #[test]
    fn test_append_only() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids);
        let mut s = SeriesTable::new(8);
        assert!(s.add(event("(s-->v)", 1.0, 0.9, &[1], 0.5, 10), &ctx).stored.is_some());
        let late = s.add(event("(s-->v)", 1.0, 0.9, &[2], 0.5, 5), &ctx);
        assert!(late.is_rejected());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_interpolates_inside_window() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids);
        let mut s = SeriesTable::new(8);
        s.add(event("(s-->v)", 0.0, 0.8, &[1], 0.5, 0), &ctx);
        s.add(event("(s-->v)", 1.0, 0.9, &[2], 0.5, 10), &ctx);
        let t = s.truth(5, 1).unwrap();
        assert!((t.frequency - 0.5).abs() < 1e-6);
        assert!((t.confidence - 0.8).abs() < 1e-6);
        let after = s.truth(20, 1).unwrap();
        assert!(after.confidence < 0.9, "outside the window confidence fades");
    }

    #[test]
    fn test_compaction_bounds_memory() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids);
        let mut s = SeriesTable::new(3);
        for i in 0..10u64 {
            let out = s.add(event("(s-->v)", 1.0, 0.6, &[i + 1], 0.5, i as i64 * 10), &ctx);
            assert!(out.stored.is_some());
        }
        assert!(s.len() <= 3);
        let first = s.tasks()[0].clone();
        assert!(first.stamp().len() > 1, "oldest entry is a compaction");
        assert!(first.conf() > 0.6);
    }
}
