//! Occurrence solving for conclusions.

use super::rule::TimeMode;
use nars_contract::{Op, Term, DTERNAL, ETERNAL, XTERNAL};

/// One premise side as seen by the solver.
#[derive(Clone, Copy, Debug)]
pub struct Side<'a> {
    pub term: &'a Term,
    pub occurrence: i64,
}

/// Solved conclusion: its term (offsets filled in) and occurrence.
#[derive(Clone, Debug, PartialEq)]
pub struct Solved {
    pub term: Term,
    pub occurrence: i64,
}

/// Place a conclusion in time, or `None` if no consistent placement exists.
///
/// `belief` is `None` for single-premise rules; modes that need a second
/// occurrence then fall back to the task's.
pub fn solve(mode: TimeMode, conclusion: Term, task: Side, belief: Option<Side>) -> Option<Solved> {
    let other = belief.map_or(task.occurrence, |b| b.occurrence);
    let occurrence = match mode {
        TimeMode::Task => task.occurrence,
        TimeMode::Belief => other,
        TimeMode::Eternal => ETERNAL,
        TimeMode::Union => pick(task.occurrence, other, i64::min),
        TimeMode::Intersect => pick(task.occurrence, other, i64::max),
        TimeMode::Forward | TimeMode::Backward => {
            let b = belief?;
            let (imp, event) = if task.term.op() == Op::Impl { (task, b) } else { (b, task) };
            if event.occurrence == ETERNAL {
                ETERNAL
            } else {
                let dt = match imp.term.dt() {
                    DTERNAL | XTERNAL => 0,
                    dt => dt as i64,
                };
                if mode == TimeMode::Forward {
                    event.occurrence + dt
                } else {
                    event.occurrence - dt
                }
            }
        }
        TimeMode::Dt => return solve_dt(conclusion, task, belief?),
    };
    if conclusion.has_xternal() {
        return None;
    }
    Some(Solved { term: conclusion, occurrence })
}

/// Earlier/later of two occurrences; an eternal side defers to the other.
fn pick(a: i64, b: i64, f: fn(i64, i64) -> i64) -> i64 {
    match (a == ETERNAL, b == ETERNAL) {
        (true, _) => b,
        (_, true) => a,
        _ => f(a, b),
    }
}

/// Fill the root's open offset from the two premise occurrences.
///
/// Each operand of the conclusion is traced back to the premise it came
/// from. Two eternal premises give an eternal, untimed conclusion; one
/// eternal and one event cannot be related and are rejected.
fn solve_dt(conclusion: Term, task: Side, belief: Side) -> Option<Solved> {
    if conclusion.dt() != XTERNAL || conclusion.arity() != 2 {
        return None;
    }
    let source = |t: &Term| -> Option<i64> {
        if t == task.term {
            Some(task.occurrence)
        } else if t == belief.term {
            Some(belief.occurrence)
        } else {
            None
        }
    };
    let first = source(&conclusion.subs()[0])?;
    let second = source(&conclusion.subs()[1])?;
    let (dt, occurrence) = match (first == ETERNAL, second == ETERNAL) {
        (true, true) => (DTERNAL, ETERNAL),
        (false, false) => {
            let dt = i32::try_from(second - first).ok()?;
            (dt, first)
        }
        _ => return None,
    };
    let term = conclusion.with_dt(dt).ok()?;
    if term.has_xternal() {
        return None;
    }
    Some(Solved { term, occurrence })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Term {
        Term::parse(s).unwrap()
    }

    #[test]
    fn test_dt_from_event_times() {
        let (a, b) = (t("(a-->x)"), t("(b-->x)"));
        let s = solve(
            TimeMode::Dt,
            t("((a-->x) ==>+- (b-->x))"),
            Side { term: &a, occurrence: 10 },
            Some(Side { term: &b, occurrence: 13 }),
        )
        .unwrap();
        assert_eq!(s.term, t("((a-->x) ==>+3 (b-->x))"));
        assert_eq!(s.occurrence, 10);
    }

    #[test]
    fn test_dt_rejects_mixed_eternal() {
        let (a, b) = (t("(a-->x)"), t("(b-->x)"));
        let conclusion = t("((a-->x) &&+- (b-->x))");
        let mixed = solve(
            TimeMode::Dt,
            conclusion.clone(),
            Side { term: &a, occurrence: ETERNAL },
            Some(Side { term: &b, occurrence: 4 }),
        );
        assert!(mixed.is_none());
        let eternal = solve(
            TimeMode::Dt,
            conclusion,
            Side { term: &a, occurrence: ETERNAL },
            Some(Side { term: &b, occurrence: ETERNAL }),
        )
        .unwrap();
        assert_eq!(eternal.term.dt(), DTERNAL);
        assert_eq!(eternal.occurrence, ETERNAL);
    }

    #[test]
    fn test_forward_and_backward() {
        let (imp, a) = (t("((a-->x) ==>+5 (b-->x))"), t("(a-->x)"));
        let fwd = solve(
            TimeMode::Forward,
            t("(b-->x)"),
            Side { term: &imp, occurrence: ETERNAL },
            Some(Side { term: &a, occurrence: 20 }),
        )
        .unwrap();
        assert_eq!(fwd.occurrence, 25);
        let back = solve(
            TimeMode::Backward,
            t("(a-->x)"),
            Side { term: &a, occurrence: 20 },
            Some(Side { term: &imp, occurrence: ETERNAL }),
        )
        .unwrap();
        assert_eq!(back.occurrence, 15);
    }

    #[test]
    fn test_union_prefers_earliest_event() {
        let a = t("(a-->x)");
        let s = solve(
            TimeMode::Union,
            t("(c-->x)"),
            Side { term: &a, occurrence: 9 },
            Some(Side { term: &a, occurrence: 3 }),
        )
        .unwrap();
        assert_eq!(s.occurrence, 3);
        let e = solve(
            TimeMode::Intersect,
            t("(c-->x)"),
            Side { term: &a, occurrence: ETERNAL },
            Some(Side { term: &a, occurrence: 3 }),
        )
        .unwrap();
        assert_eq!(e.occurrence, 3);
    }
}
