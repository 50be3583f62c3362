//! Pattern unification.
//!
//! One-way: only pattern variables (`%X`, written as `X` in rule text)
//! bind. Everything else must match structurally. A pattern offset of
//! `DTERNAL` or `XTERNAL` accepts any offset of the same operator.

use super::rule::Bindings;
use nars_contract::{Op, Term, VarKind, DTERNAL, XTERNAL};

/// Extend `bindings` so that `pattern` becomes `term`.
///
/// On failure the bindings are left as they were on entry.
pub fn unify(pattern: &Term, term: &Term, bindings: &mut Bindings) -> bool {
    let mut scratch = bindings.clone();
    if unify_into(pattern, term, &mut scratch) {
        *bindings = scratch;
        true
    } else {
        false
    }
}

fn unify_into(pattern: &Term, term: &Term, b: &mut Bindings) -> bool {
    if pattern.op() == Op::Var(VarKind::Pattern) {
        return match b.get(pattern) {
            Some(bound) => bound == term,
            None => {
                b.insert(pattern.clone(), term.clone());
                true
            }
        };
    }
    if !pattern.has_var(VarKind::Pattern) {
        return pattern == term;
    }
    if pattern.op() != term.op() || pattern.arity() != term.arity() {
        return false;
    }
    let pdt = pattern.dt();
    if pdt != DTERNAL && pdt != XTERNAL && pdt != term.dt() {
        return false;
    }
    let (ps, ts) = (pattern.subs(), term.subs());
    if ps.len() == 2 && term.op().is_commutative(term.dt()) {
        let mut first = b.clone();
        if unify_into(&ps[0], &ts[0], &mut first) && unify_into(&ps[1], &ts[1], &mut first) {
            *b = first;
            return true;
        }
        return unify_into(&ps[0], &ts[1], b) && unify_into(&ps[1], &ts[0], b);
    }
    ps.iter().zip(ts).all(|(p, t)| unify_into(p, t, b))
}
