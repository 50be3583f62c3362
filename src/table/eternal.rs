//! Eternal belief/goal table.
//!
//! A handful of timeless judgements ranked by `confidence × originality`.
//! Ties on rank fall back to priority, so a weaker claim on the same
//! evidence quality never displaces a stronger one.

use super::{interpolate, Insertion, TableContext};
use crate::budget::{truth_to_quality, Budget};
use crate::task::{Origin, Task, TaskDraft, TaskId, MAX_CAUSES};
use nars_contract::{Stamp, TruthValue, ETERNAL};
use std::sync::Arc;
use tracing::trace;

/// Eviction key: (rank, priority), compared lexicographically.
fn key(t: &Task) -> (f32, f32) {
    (t.conf() * t.stamp().originality(), t.priority())
}

#[derive(Debug)]
pub struct EternalTable {
    capacity: usize,
    entries: Vec<Arc<Task>>,
}

/// One candidate partner for revising an incoming task.
struct Candidate {
    partner: Arc<Task>,
    truth: TruthValue,
}

impl EternalTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
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

    /// Highest-ranked live entry.
    pub fn strongest(&self) -> Option<Arc<Task>> {
        self.entries
            .iter()
            .filter(|t| !t.is_deleted())
            .max_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal))
            .cloned()
    }

    /// Absorb a task: duplicate check, revision, then ranked insertion.
    pub fn add(&mut self, task: Arc<Task>, ctx: &TableContext) -> Insertion {
        if task.is_deleted() || task.truth().is_none() {
            return Insertion::default();
        }
        self.entries.retain(|t| !t.is_deleted());

        // same evidence: the resident stands as it is
        if let Some(existing) = self
            .entries
            .iter()
            .find(|e| e.term() == task.term() && e.stamp().same_evidence(task.stamp()))
        {
            return Insertion::duplicate(existing.clone());
        }

        let revised = if self.capacity > 1 {
            self.revise(&task, ctx)
        } else {
            None
        };

        let mut out = Insertion::default();
        match self.insert(task.clone()) {
            Ok(evicted) => {
                out.stored = Some(task);
                out.evicted.extend(evicted);
            }
            Err(()) => trace!(task = %task, "eternal table rejected"),
        }
        if let Some(r) = revised {
            match self.insert(r.clone()) {
                Ok(evicted) => {
                    out.evicted.extend(evicted);
                    out.revised = Some(r);
                }
                Err(()) => trace!(task = %r, "revision rejected by rank"),
            }
        }
        // the revision may have displaced the task it was built from
        if let Some(s) = &out.stored {
            if out.evicted.iter().any(|e| Arc::ptr_eq(e, s)) {
                out.evicted.retain(|e| !Arc::ptr_eq(e, s));
                out.displaced = true;
            }
        }
        out
    }

    /// Remove and return everything.
    pub fn clear(&mut self) -> Vec<Arc<Task>> {
        std::mem::take(&mut self.entries)
    }

    pub fn set_capacity(&mut self, capacity: usize) -> Vec<Arc<Task>> {
        self.capacity = capacity;
        let mut out = Vec::new();
        while self.entries.len() > capacity {
            if let Some(i) = self.weakest() {
                out.push(self.entries.swap_remove(i));
            }
        }
        out
    }

    fn weakest(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
    }

    /// Store `task`, evicting the weakest entry when full and not stronger
    /// than the incoming one.
    fn insert(&mut self, task: Arc<Task>) -> Result<Option<Arc<Task>>, ()> {
        if self.entries.len() < self.capacity {
            self.entries.push(task);
            return Ok(None);
        }
        let Some(i) = self.weakest() else {
            return Err(());
        };
        if key(&task) >= key(&self.entries[i]) {
            let old = std::mem::replace(&mut self.entries[i], task);
            Ok(Some(old))
        } else {
            Err(())
        }
    }

    /// Build the best revision of `task` with one entry of disjoint
    /// evidence and similar confidence. Revision is strictly pairwise: the
    /// result's truth comes from exactly the two stamps it zips.
    fn revise(&self, task: &Arc<Task>, ctx: &TableContext) -> Option<Arc<Task>> {
        let incoming = task.truth()?;
        let best = self
            .entries
            .iter()
            .filter(|e| !e.stamp().overlaps(task.stamp()))
            .filter_map(|e| {
                let t = e.truth()?;
                if !ctx.similar(t.confidence, incoming.confidence) {
                    return None;
                }
                Some(Candidate {
                    partner: e.clone(),
                    truth: t.revision(&incoming),
                })
            })
            .max_by(|a, b| {
                a.truth
                    .confidence
                    .partial_cmp(&b.truth.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;
        let truth = best.truth;

        let partner = &best.partner;
        let partner_truth = partner.truth()?;
        let dithered = truth.dither(ctx.epsilon);
        if !dithered.differs_from(&incoming.dither(ctx.epsilon), ctx.epsilon)
            || !dithered.differs_from(&partner_truth.dither(ctx.epsilon), ctx.epsilon)
        {
            trace!(task = %task, "revision below resolution");
            return None;
        }
        let term = interpolate(
            partner.term(),
            task.term(),
            partner_truth.weight(),
            incoming.weight(),
        )?;
        debug_assert!(!partner.stamp().overlaps(task.stamp()));

        Some(Arc::new(revision_draft(task, partner, term, truth, ETERNAL).build(
            TaskId(ctx.ids.next()),
            ctx.now,
        )))
    }
}

/// Draft of the task produced by revising `a` with `b`.
pub(crate) fn revision_draft(
    a: &Task,
    b: &Task,
    term: nars_contract::Term,
    truth: TruthValue,
    occurrence: i64,
) -> TaskDraft {
    let mut causes = a.causes().to_vec();
    for c in b.causes() {
        if !causes.contains(c) {
            causes.push(*c);
        }
    }
    causes.truncate(MAX_CAUSES);
    let durability = a.budget().durability().max(b.budget().durability());
    TaskDraft {
        term,
        punctuation: a.punctuation(),
        truth: Some(truth),
        occurrence,
        stamp: Stamp::zip(a.stamp(), b.stamp()),
        budget: Budget::new(
            a.priority().max(b.priority()),
            durability,
            truth_to_quality(&truth),
        ),
        origin: Origin::Revision,
        causes,
        source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::{belief, ctx_ids};

    #[test]
    fn test_insert_then_strongest_is_identity() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids);
        let mut table = EternalTable::new(4);
        let t = belief("(a-->b)", 1.0, 0.9, &[1], 0.5);
        let out = table.add(t.clone(), &ctx);
        assert!(out.stored.is_some());
        let s = table.strongest().unwrap();
        assert_eq!(s.term(), t.term());
        assert_eq!(s.truth(), t.truth());
    }

    #[test]
    fn test_revision_accumulates_evidence() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids);
        let mut table = EternalTable::new(4);
        table.add(belief("(a-->b)", 1.0, 0.9, &[1], 0.5), &ctx);
        let out = table.add(belief("(a-->b)", 1.0, 0.9, &[2], 0.5), &ctx);
        let r = out.revised.expect("disjoint evidence revises");
        let t = r.truth().unwrap();
        assert!(t.confidence > 0.9 && t.confidence < 1.0);
        assert_eq!(t.frequency, 1.0);
        assert_eq!(r.stamp().len(), 2);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_overlapping_evidence_never_revises() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids);
        let mut table = EternalTable::new(4);
        table.add(belief("(a-->b)", 1.0, 0.9, &[1, 2], 0.5), &ctx);
        let out = table.add(belief("(a-->b)", 0.0, 0.9, &[2, 3], 0.5), &ctx);
        assert!(out.revised.is_none());
        assert!(out.stored.is_some());
    }

    #[test]
    fn test_duplicate_returns_existing() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids);
        let mut table = EternalTable::new(4);
        let first = belief("(a-->b)", 1.0, 0.9, &[7], 0.2);
        table.add(first.clone(), &ctx);
        let out = table.add(belief("(a-->b)", 1.0, 0.9, &[7], 0.6), &ctx);
        assert!(Arc::ptr_eq(out.duplicate.as_ref().unwrap(), &first));
        assert!((first.priority() - 0.2).abs() < 1e-6, "existing task left unchanged");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_capacity_one_keeps_stronger_resident() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids);
        let mut table = EternalTable::new(1);
        let t1 = belief("(a-->b)", 1.0, 0.9, &[1], 0.9);
        let t2 = belief("(a-->b)", 1.0, 0.9, &[2], 0.3);
        table.add(t1.clone(), &ctx);
        let out = table.add(t2, &ctx);
        assert!(out.stored.is_none());
        assert!(Arc::ptr_eq(&table.strongest().unwrap(), &t1));
    }

    #[test]
    fn test_revision_below_resolution_is_skipped() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids);
        let mut table = EternalTable::new(4);
        table.add(belief("(a-->b)", 1.0, 0.98, &[1], 0.5), &ctx);
        let out = table.add(belief("(a-->b)", 1.0, 0.01, &[2], 0.5), &ctx);
        assert!(out.revised.is_none(), "tiny evidence cannot move a strong belief");
    }

    /// Two residents share id 2 so they never revise each other. An
    /// incoming task disjoint from both must revise with exactly one of
    /// them: its truth is the pairwise revision with the partner whose ids
    /// it carries, and nothing of the other resident leaks in.
    #[test]
    fn test_revision_truth_follows_its_stamp() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids);
        let mut table = EternalTable::new(8);
        let a = belief("(a-->b)", 1.0, 0.9, &[1, 2], 0.5);
        let b = belief("(a-->b)", 0.0, 0.9, &[2, 4], 0.5);
        table.add(a.clone(), &ctx);
        assert!(table.add(b.clone(), &ctx).revised.is_none());
        assert_eq!(table.len(), 2);

        let incoming = belief("(a-->b)", 1.0, 0.9, &[3], 0.5);
        let out = table.add(incoming.clone(), &ctx);
        let r = out.revised.expect("disjoint evidence revises");
        let stamp = r.stamp();
        let partner = [&a, &b]
            .into_iter()
            .find(|p| p.stamp().ids().iter().all(|id| stamp.contains(*id)))
            .expect("revision stamp covers one resident");
        assert!(stamp.contains(3));
        assert_eq!(stamp.len(), partner.stamp().len() + 1);
        let other = if Arc::ptr_eq(partner, &a) { &b } else { &a };
        assert!(!other.stamp().ids().iter().all(|id| stamp.contains(*id)));

        let expected = partner.truth().unwrap().revision(&incoming.truth().unwrap());
        let tv = r.truth().unwrap();
        assert!((tv.frequency - expected.frequency).abs() < 1e-6);
        assert!((tv.confidence - expected.confidence).abs() < 1e-6);
    }

    #[test]
    fn test_dissimilar_confidence_does_not_revise() {
        let ids = ctx_ids();
        let ctx = TableContext::new(0, 1, 0.01, &ids).with_conf_tolerance(0.3);
        let mut table = EternalTable::new(4);
        table.add(belief("(a-->b)", 1.0, 0.9, &[1], 0.5), &ctx);
        let out = table.add(belief("(a-->b)", 0.0, 0.1, &[2], 0.5), &ctx);
        assert!(out.revised.is_none(), "0.1 is too far from 0.9 to revise");
        assert!(out.stored.is_some());

        // within tolerance the same pair revises
        let ctx = TableContext::new(0, 1, 0.01, &ids).with_conf_tolerance(0.9);
        let mut table = EternalTable::new(4);
        table.add(belief("(a-->b)", 1.0, 0.9, &[1], 0.5), &ctx);
        assert!(table.add(belief("(a-->b)", 0.0, 0.1, &[2], 0.5), &ctx).revised.is_some());
    }
}
