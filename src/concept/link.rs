//! Link templates: which concepts a task's term is linked into.

use nars_contract::{Op, Term};

/// Concept terms reachable from `term` within `depth` levels, excluding
/// `term` itself, variables and image placeholders. Negations contribute
/// their positive term. Order is breadth-first, duplicates removed.
pub fn templates(term: &Term, depth: usize) -> Vec<Term> {
    let root = term.concept();
    let mut out: Vec<Term> = Vec::new();
    let mut frontier = vec![root.clone()];
    for _ in 0..depth {
        let mut next = Vec::new();
        for t in &frontier {
            for s in t.subs() {
                let s = s.unneg();
                if matches!(s.op(), Op::Var(_)) || s.is_placeholder() {
                    continue;
                }
                let c = s.concept();
                if c != root && !out.contains(&c) {
                    out.push(c.clone());
                    next.push(c);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Term {
        Term::parse(s).unwrap()
    }

    #[test]
    fn test_depth_bounds_templates() {
        let term = t("((a-->b) ==> (c-->d))");
        let one = templates(&term, 1);
        assert_eq!(one, vec![t("(a-->b)"), t("(c-->d)")]);
        let two = templates(&term, 2);
        assert_eq!(two.len(), 6);
        assert!(two.contains(&t("a")) && two.contains(&t("d")));
    }

    #[test]
    fn test_skips_variables_and_unwraps_negation() {
        let term = t("(&&,(--,(x-->y)),($v-->z))");
        let ts = templates(&term, 1);
        assert!(ts.contains(&t("(x-->y)")));
        assert!(ts.contains(&t("($v-->z)")));
        let deep = templates(&term, 2);
        assert!(!deep.iter().any(|x| matches!(x.op(), Op::Var(_))));
    }
}
