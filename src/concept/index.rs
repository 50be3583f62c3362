//! Global concept index.
//!
//! A bounded curve bag from concept term to concept. The bag priority is
//! the concept's activation; eviction deletes the concept.

use super::{Concept, ConceptKind};
use crate::bag::{Bag, BagStatsSnapshot, CurveBag, PutOutcome};
use crate::budget::Merge;
use crate::config::EngineConfig;
use nars_contract::Term;
use parking_lot::Mutex;
use rand::Rng;
use std::fmt;
use std::sync::Arc;

pub struct ConceptIndex {
    bag: CurveBag<Term, Arc<Concept>>,
    /// Serializes creation so a term never gets two concepts.
    create: Mutex<()>,
}

impl fmt::Debug for ConceptIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConceptIndex")
            .field("len", &self.bag.len())
            .field("capacity", &self.bag.capacity())
            .finish()
    }
}

/// Result of [`ConceptIndex::conceptualize`].
#[derive(Debug, Default)]
pub struct Conceptualized {
    pub concept: Option<Arc<Concept>>,
    /// Concept pushed out to make room; the caller deletes it.
    pub evicted: Option<Arc<Concept>>,
}

/// Index key of `term`: its concept form, with an outer negation kept so
/// a negation concept is addressed apart from its positive term.
pub fn key(term: &Term) -> Term {
    if term.is_neg() {
        term.concept().neg()
    } else {
        term.concept()
    }
}

impl ConceptIndex {
    pub fn new(capacity: usize) -> Self {
        Self {
            bag: CurveBag::new(capacity, Merge::Plus),
            create: Mutex::new(()),
        }
    }

    /// Look up by any term, under the same key [`Self::conceptualize`] uses.
    pub fn get(&self, term: &Term) -> Option<Arc<Concept>> {
        self.bag.get(&key(term))
    }

    /// Existing concept, or a new one admitted at `priority`.
    ///
    /// Negated terms get a table-less negation concept of their own; every
    /// other term is keyed by its concept form. `kind` overrides the
    /// shape-derived kind of a new concept.
    pub fn conceptualize(
        &self,
        term: &Term,
        kind: Option<ConceptKind>,
        priority: f32,
        cfg: &EngineConfig,
    ) -> Conceptualized {
        let key = key(term);
        if let Some(c) = self.bag.get(&key) {
            return Conceptualized {
                concept: Some(c),
                evicted: None,
            };
        }
        let _guard = self.create.lock();
        if let Some(c) = self.bag.get(&key) {
            return Conceptualized {
                concept: Some(c),
                evicted: None,
            };
        }
        let kind = kind.unwrap_or_else(|| ConceptKind::of(&key));
        let concept = Arc::new(Concept::new(key.clone(), kind, cfg));
        match self.bag.put(key, concept.clone(), priority) {
            PutOutcome::Inserted | PutOutcome::Merged => Conceptualized {
                concept: Some(concept),
                evicted: None,
            },
            PutOutcome::Replaced(_, old) => Conceptualized {
                concept: Some(concept),
                evicted: Some(old),
            },
            PutOutcome::Rejected => Conceptualized::default(),
        }
    }

    /// Raise the concept's priority and spread part of it to its links.
    pub fn activate(&self, concept: &Concept, amount: f32, cfg: &EngineConfig) {
        if concept.is_deleted() {
            return;
        }
        self.bag.adjust(concept.term(), amount);
        concept.activate(amount, cfg.bag.activation_spread, cfg);
    }

    pub fn priority(&self, term: &Term) -> Option<f32> {
        self.bag.priority(&key(term))
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Arc<Concept>> {
        self.bag.sample(rng).map(|(_, c, _)| c)
    }

    pub fn forget(&self, rate: f32) {
        self.bag.forget(rate);
    }

    /// Remove a concept from the index (does not delete it).
    pub fn remove(&self, term: &Term) -> Option<Arc<Concept>> {
        self.bag.remove(term)
    }

    /// Every concept with its priority, strongest first.
    pub fn concepts(&self) -> Vec<(Arc<Concept>, f32)> {
        self.bag.items().into_iter().map(|(_, c, p)| (c, p)).collect()
    }

    pub fn len(&self) -> usize {
        self.bag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bag.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bag.capacity()
    }

    pub fn stats(&self) -> BagStatsSnapshot {
        self.bag.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::ConceptState;

    fn t(s: &str) -> Term {
        Term::parse(s).unwrap()
    }

    #[test]
    fn test_one_concept_per_concept_term() {
        let cfg = EngineConfig::small();
        let index = ConceptIndex::new(8);
        let a = index.conceptualize(&t("(a ==>+1 b)"), None, 0.5, &cfg).concept.unwrap();
        let b = index.conceptualize(&t("(a ==>+7 b)"), None, 0.5, &cfg).concept.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_negation_gets_its_own_concept() {
        let cfg = EngineConfig::small();
        let index = ConceptIndex::new(8);
        let pos = index.conceptualize(&t("(a-->b)"), None, 0.5, &cfg).concept.unwrap();
        let neg = index.conceptualize(&t("(--,(a-->b))"), None, 0.5, &cfg).concept.unwrap();
        assert!(!Arc::ptr_eq(&pos, &neg));
        assert_eq!(neg.kind(), ConceptKind::Negation);
        assert!(neg.tables().is_none(), "negations carry no beliefs");
    }

    #[test]
    fn test_every_concept_is_found_by_its_own_term() {
        let cfg = EngineConfig::small();
        let index = ConceptIndex::new(8);
        for s in ["(a-->b)", "(--,(a-->b))", "(a ==>+3 b)", "(a ==>+7 b)", "(--,(a ==>+3 b))"] {
            let term = t(s);
            let made = index.conceptualize(&term, None, 0.5, &cfg).concept.unwrap();
            let found = index.get(&term).expect("lookup uses the creation key");
            assert!(Arc::ptr_eq(&made, &found), "{}", s);
            assert!(index.priority(&term).is_some());
        }
        assert_eq!(index.len(), 4, "temporal variants share a concept");
    }

    #[test]
    fn test_full_index_evicts_weakest() {
        let cfg = EngineConfig::small();
        let index = ConceptIndex::new(2);
        index.conceptualize(&t("a"), None, 0.1, &cfg);
        index.conceptualize(&t("b"), None, 0.5, &cfg);
        let out = index.conceptualize(&t("c"), None, 0.9, &cfg);
        assert!(out.concept.is_some());
        assert_eq!(out.evicted.unwrap().term(), &t("a"));
        let rejected = index.conceptualize(&t("d"), None, 0.0, &cfg);
        assert!(rejected.concept.is_none());
    }

    #[test]
    fn test_activation_raises_priority_and_wakes() {
        let cfg = EngineConfig::small();
        let index = ConceptIndex::new(4);
        let c = index.conceptualize(&t("a"), None, 0.1, &cfg).concept.unwrap();
        index.activate(&c, 0.3, &cfg);
        assert!((index.priority(&t("a")).unwrap() - 0.4).abs() < 1e-6);
        assert_eq!(c.state(), ConceptState::Awake);
    }
}
