//! Temporal table: events ordered by occurrence.
//!
//! Coincident events with disjoint evidence are revised into one event at
//! their evidence-weighted mean time. Eviction favors what is confident,
//! original, and close to "now".

use super::eternal::revision_draft;
use super::{interpolate, projected_conf, Insertion, TableContext};
use crate::task::{Task, TaskId};
use crate::time::{coincident, projection_factor};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug)]
pub struct TemporalTable {
    capacity: usize,
    /// Sorted by occurrence, ascending.
    entries: Vec<Arc<Task>>,
}

fn cmp_f32(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

impl TemporalTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.entries
    }

    /// Retention value seen from `now`.
    fn value(t: &Task, now: i64, dur: u32) -> f32 {
        t.conf() * projection_factor(t.occurrence(), now, dur) * t.stamp().originality()
    }

    /// Most confident event regardless of time.
    pub fn strongest(&self) -> Option<Arc<Task>> {
        self.entries
            .iter()
            .filter(|t| !t.is_deleted())
            .max_by(|a, b| {
                cmp_f32(
                    a.conf() * a.stamp().originality(),
                    b.conf() * b.stamp().originality(),
                )
            })
            .cloned()
    }

    /// Event whose truth, projected to `when`, is the most confident.
    pub fn answer(&self, when: i64, dur: u32) -> Option<Arc<Task>> {
        self.entries
            .iter()
            .filter(|t| !t.is_deleted())
            .max_by(|a, b| {
                cmp_f32(projected_conf(a, when, dur), projected_conf(b, when, dur))
                    .then_with(|| cmp_f32(a.priority(), b.priority()))
            })
            .cloned()
    }

    pub fn add(&mut self, task: Arc<Task>, ctx: &TableContext) -> Insertion {
        if task.is_deleted() || task.truth().is_none() || task.is_eternal() {
            return Insertion::default();
        }
        self.entries.retain(|t| !t.is_deleted());

        if let Some(existing) = self.entries.iter().find(|e| {
            e.occurrence() == task.occurrence()
                && e.term() == task.term()
                && e.stamp().same_evidence(task.stamp())
        }) {
            return Insertion::duplicate(existing.clone());
        }

        let revised = self.revise(&task, ctx);
        let mut out = Insertion::default();
        if self.insert(task.clone(), ctx, &mut out.evicted) {
            out.stored = Some(task);
        } else {
            trace!(task = %task, "temporal table rejected");
        }
        if let Some(r) = revised {
            if self.insert(r.clone(), ctx, &mut out.evicted) {
                out.revised = Some(r);
            }
        }
        if let Some(s) = &out.stored {
            if out.evicted.iter().any(|e| Arc::ptr_eq(e, s)) {
                out.evicted.retain(|e| !Arc::ptr_eq(e, s));
                out.displaced = true;
            }
        }
        out
    }

    pub fn clear(&mut self) -> Vec<Arc<Task>> {
        std::mem::take(&mut self.entries)
    }

    fn insert(&mut self, task: Arc<Task>, ctx: &TableContext, evicted: &mut Vec<Arc<Task>>) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.entries.len() >= self.capacity {
            let weakest = self
                .entries
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    cmp_f32(Self::value(a, ctx.now, ctx.dur), Self::value(b, ctx.now, ctx.dur))
                })
                .map(|(i, _)| i);
            let Some(i) = weakest else {
                return false;
            };
            if Self::value(&task, ctx.now, ctx.dur) < Self::value(&self.entries[i], ctx.now, ctx.dur) {
                return false;
            }
            evicted.push(self.entries.remove(i));
        }
        let at = self
            .entries
            .partition_point(|e| e.occurrence() <= task.occurrence());
        self.entries.insert(at, task);
        true
    }

    /// Revise with the best coincident, non-overlapping event of similar
    /// confidence.
    fn revise(&self, task: &Arc<Task>, ctx: &TableContext) -> Option<Arc<Task>> {
        let incoming = task.truth()?;
        let (partner, truth) = self
            .entries
            .iter()
            .filter(|e| coincident(e.occurrence(), task.occurrence(), ctx.dur))
            .filter(|e| !e.stamp().overlaps(task.stamp()))
            .filter(|e| ctx.similar(e.conf(), incoming.confidence))
            .filter_map(|e| Some((e, e.truth()?.revision(&incoming))))
            .max_by(|a, b| cmp_f32(a.1.confidence, b.1.confidence))?;

        let partner_truth = partner.truth()?;
        let dithered = truth.dither(ctx.epsilon);
        if !dithered.differs_from(&incoming.dither(ctx.epsilon), ctx.epsilon)
            || !dithered.differs_from(&partner_truth.dither(ctx.epsilon), ctx.epsilon)
        {
            return None;
        }
        let (wa, wb) = (partner_truth.weight(), incoming.weight());
        let term = interpolate(partner.term(), task.term(), wa, wb)?;
        let occurrence = {
            let w = (wa + wb) as f64;
            let mean = (partner.occurrence() as f64 * wa as f64
                + task.occurrence() as f64 * wb as f64)
                / w.max(f64::EPSILON);
            mean.round() as i64
        };
        debug_assert!(!partner.stamp().overlaps(task.stamp()));
        Some(Arc::new(
            revision_draft(task, partner, term, truth, occurrence)
                .build(TaskId(ctx.ids.next()), ctx.now),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::{ctx_ids, event};

    #[test]
    fn test_entries_stay_time_ordered() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids);
        let mut table = TemporalTable::new(8);
        for (i, occ) in [30, 10, 20].iter().enumerate() {
            table.add(event("(a-->b)", 1.0, 0.9, &[i as u64 + 1], 0.5, *occ), &ctx);
        }
        let occs: Vec<_> = table.tasks().iter().map(|t| t.occurrence()).collect();
        assert_eq!(occs, vec![10, 20, 30]);
    }

    #[test]
    fn test_coincident_events_revise_at_mean_time() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 2, 0.01, &ids);
        let mut table = TemporalTable::new(8);
        table.add(event("(a-->b)", 1.0, 0.9, &[1], 0.5, 10), &ctx);
        let out = table.add(event("(a-->b)", 1.0, 0.9, &[2], 0.5, 12), &ctx);
        let r = out.revised.expect("coincident disjoint events revise");
        assert_eq!(r.occurrence(), 11);
        assert!(r.conf() > 0.9);
    }

    #[test]
    fn test_duplicate_event_is_returned_untouched() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids);
        let mut table = TemporalTable::new(8);
        let first = event("(a-->b)", 1.0, 0.9, &[1], 0.2, 10);
        table.add(first.clone(), &ctx);
        let out = table.add(event("(a-->b)", 1.0, 0.9, &[1], 0.7, 10), &ctx);
        assert!(Arc::ptr_eq(out.duplicate.as_ref().unwrap(), &first));
        assert!((first.priority() - 0.2).abs() < 1e-6);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_distant_events_do_not_revise() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids);
        let mut table = TemporalTable::new(8);
        table.add(event("(a-->b)", 1.0, 0.9, &[1], 0.5, 10), &ctx);
        let out = table.add(event("(a-->b)", 1.0, 0.9, &[2], 0.5, 50), &ctx);
        assert!(out.revised.is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_answer_prefers_nearby_event() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids);
        let mut table = TemporalTable::new(8);
        table.add(event("(a-->b)", 1.0, 0.9, &[1], 0.5, 10), &ctx);
        table.add(event("(a-->b)", 0.0, 0.9, &[2], 0.5, 100), &ctx);
        assert_eq!(table.answer(12, 1).unwrap().occurrence(), 10);
        assert_eq!(table.answer(95, 1).unwrap().occurrence(), 100);
    }

    #[test]
    fn test_eviction_drops_stale_events() {
        let ids = ctx_ids();
        let ctx = TableContext::new(100, 1, 0.01, &ids);
        let mut table = TemporalTable::new(2);
        table.add(event("(a-->b)", 1.0, 0.9, &[1], 0.5, 0), &ctx);
        table.add(event("(a-->b)", 1.0, 0.9, &[2], 0.5, 50), &ctx);
        let out = table.add(event("(a-->b)", 1.0, 0.9, &[3], 0.5, 100), &ctx);
        assert!(out.stored.is_some());
        assert_eq!(out.evicted.len(), 1);
        assert_eq!(out.evicted[0].occurrence(), 0);
        assert_eq!(table.len(), 2);
    }
}
