//! Rule text.
//!
//! ```text
//! taskPattern, beliefPattern[, constraint(..)]* |- conclusion, (meta, ..)
//!
//! (A-->B), (B-->C), neqRCom(A,C) |- (A-->C), (Belief:Deduction, Punctuation:Question)
//! ```
//!
//! A single uppercase letter (optionally followed by digits) in a pattern
//! is a pattern variable. Meta items:
//!
//! | Item | Meaning |
//! |------|---------|
//! | `Belief:Fn` | truth function when the task is a belief |
//! | `Goal:Fn` | desire function when the task is a goal |
//! | `Punctuation:Question`, `:Quest`, `:Same` | derive queries from queries |
//! | `Time:Mode` | occurrence of the conclusion, see [`TimeMode`] |
//! | `Overlap` | allow premises with shared evidence |
//! | `Single` | no belief task; the belief pattern matches the term-link |

use super::truth_fn::TruthFn;
use crate::attention::CauseId;
use nars_contract::{Op, Term, VarKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Malformed rule. Fatal at engine start-up.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("rule syntax: {0}")]
    Syntax(String),

    #[error("unknown truth function `{0}`")]
    UnknownTruthFn(String),

    #[error("rule `{0}` derives nothing: no truth function and no query punctuation")]
    NoPunctuation(String),

    #[error("rule `{rule}`: conflicting {what}")]
    ConflictingPunctuation { rule: String, what: String },

    #[error("rule `{rule}`: conclusion variable {var} is bound by neither premise")]
    Unbound { rule: String, var: String },

    #[error("rule `{rule}`: single-premise rule names two-premise function {func}")]
    SingleWithBinary { rule: String, func: String },
}

/// Where the conclusion sits in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeMode {
    /// The task's occurrence.
    #[default]
    Task,
    /// The belief's occurrence.
    Belief,
    /// The earlier of the two.
    Union,
    /// The later of the two.
    Intersect,
    /// Always eternal.
    Eternal,
    /// Solve the conclusion's open offset from the two occurrences.
    Dt,
    /// The non-implication premise's time plus the implication offset.
    Forward,
    /// The non-implication premise's time minus the implication offset.
    Backward,
}

impl TimeMode {
    fn from_name(s: &str) -> Option<TimeMode> {
        Some(match s {
            "Task" => TimeMode::Task,
            "Belief" => TimeMode::Belief,
            "Union" => TimeMode::Union,
            "Intersect" => TimeMode::Intersect,
            "Eternal" => TimeMode::Eternal,
            "Dt" => TimeMode::Dt,
            "Forward" => TimeMode::Forward,
            "Backward" => TimeMode::Backward,
            _ => return None,
        })
    }
}

pub type Bindings = HashMap<Term, Term>;

/// Side condition on bound variables.
#[derive(Clone, Debug, PartialEq)]
pub enum Constraint {
    Neq(Term, Term),
    /// Different and neither contains the other.
    NeqRCom(Term, Term),
    NotSet(Term),
    NotImpl(Term),
    NotConj(Term),
}

impl Constraint {
    fn parse(s: &str) -> Result<Constraint, RuleError> {
        let open = s
            .find('(')
            .ok_or_else(|| RuleError::Syntax(format!("expected constraint, got `{}`", s)))?;
        let name = s[..open].trim();
        let args: Vec<Term> = s[open + 1..]
            .trim_end()
            .strip_suffix(')')
            .ok_or_else(|| RuleError::Syntax(format!("unclosed constraint `{}`", s)))?
            .split(',')
            .map(|a| pattern_var(a.trim()))
            .collect::<Result<_, _>>()?;
        match (name, args.as_slice()) {
            ("neq", [a, b]) => Ok(Constraint::Neq(a.clone(), b.clone())),
            ("neqRCom", [a, b]) => Ok(Constraint::NeqRCom(a.clone(), b.clone())),
            ("notSet", [a]) => Ok(Constraint::NotSet(a.clone())),
            ("notImpl", [a]) => Ok(Constraint::NotImpl(a.clone())),
            ("notConj", [a]) => Ok(Constraint::NotConj(a.clone())),
            _ => Err(RuleError::Syntax(format!("unknown constraint `{}`", s))),
        }
    }

    /// Unbound variables satisfy every constraint.
    pub fn holds(&self, b: &Bindings) -> bool {
        match self {
            Constraint::Neq(x, y) => match (b.get(x), b.get(y)) {
                (Some(x), Some(y)) => x != y,
                _ => true,
            },
            Constraint::NeqRCom(x, y) => match (b.get(x), b.get(y)) {
                (Some(x), Some(y)) => {
                    x != y && !x.contains_recursively(y) && !y.contains_recursively(x)
                }
                _ => true,
            },
            Constraint::NotSet(x) => b.get(x).map_or(true, |t| !t.op().is_set()),
            Constraint::NotImpl(x) => b
                .get(x)
                .map_or(true, |t| !matches!(t.op(), Op::Impl | Op::Equi)),
            Constraint::NotConj(x) => b.get(x).map_or(true, |t| t.op() != Op::Conj),
        }
    }

    fn vars(&self) -> Vec<&Term> {
        match self {
            Constraint::Neq(a, b) | Constraint::NeqRCom(a, b) => vec![a, b],
            Constraint::NotSet(a) | Constraint::NotImpl(a) | Constraint::NotConj(a) => vec![a],
        }
    }
}

/// One parsed rule.
#[derive(Clone, Debug)]
pub struct Rule {
    /// Assigned at compilation; the rule's cause in the attention economy.
    pub id: CauseId,
    pub source: String,
    pub task: Term,
    pub belief: Term,
    pub constraints: Vec<Constraint>,
    pub conclusion: Term,
    pub belief_fn: Option<TruthFn>,
    pub goal_fn: Option<TruthFn>,
    pub questions: bool,
    pub quests: bool,
    pub time: TimeMode,
    pub overlap: bool,
    pub single: bool,
}

fn is_pattern_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().map_or(false, |c| c.is_ascii_uppercase()) && chars.all(|c| c.is_ascii_digit())
}

fn pattern_var(name: &str) -> Result<Term, RuleError> {
    if !is_pattern_name(name) {
        return Err(RuleError::Syntax(format!("`{}` is not a pattern variable", name)));
    }
    Ok(Term::var(VarKind::Pattern, name))
}

/// Parse a pattern, turning uppercase atoms into pattern variables.
pub fn parse_pattern(text: &str) -> Result<Term, RuleError> {
    let raw = Term::parse(text).map_err(|e| RuleError::Syntax(format!("`{}`: {}", text, e)))?;
    let mut map = HashMap::new();
    raw.for_each(&mut |t| {
        if let (Op::Atom, Some(name)) = (t.op(), t.name()) {
            if is_pattern_name(name) {
                map.insert(t.clone(), Term::var(VarKind::Pattern, name));
            }
        }
    });
    raw.replace(&map)
        .map_err(|e| RuleError::Syntax(format!("`{}`: {}", text, e)))
}

fn pattern_vars(t: &Term) -> HashSet<Term> {
    let mut out = HashSet::new();
    t.for_each(&mut |x| {
        if x.op() == Op::Var(VarKind::Pattern) {
            out.insert(x.clone());
        }
    });
    out
}

/// Split on `sep` outside any brackets.
fn split_top(s: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                out.push(s[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(s[start..].trim());
    out
}

impl Rule {
    pub fn parse(text: &str) -> Result<Rule, RuleError> {
        let source = text.trim().to_string();
        let (lhs, rhs) = source
            .split_once("|-")
            .ok_or_else(|| RuleError::Syntax(format!("missing `|-` in `{}`", source)))?;

        let left = split_top(lhs, ',');
        if left.len() < 2 {
            return Err(RuleError::Syntax(format!("`{}` needs task and belief patterns", source)));
        }
        let task = parse_pattern(left[0])?;
        let belief = parse_pattern(left[1])?;
        let constraints = left[2..]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| Constraint::parse(s))
            .collect::<Result<Vec<_>, _>>()?;

        let right = split_top(rhs, ',');
        let conclusion = parse_pattern(right[0])?;
        let mut rule = Rule {
            id: CauseId(0),
            source: source.clone(),
            task,
            belief,
            constraints,
            conclusion,
            belief_fn: None,
            goal_fn: None,
            questions: false,
            quests: false,
            time: TimeMode::Task,
            overlap: false,
            single: false,
        };
        let mut seen: HashSet<String> = HashSet::new();
        for group in &right[1..] {
            let inner = group
                .strip_prefix('(')
                .and_then(|g| g.strip_suffix(')'))
                .ok_or_else(|| RuleError::Syntax(format!("meta list must be parenthesized: `{}`", group)))?;
            for item in inner.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                rule.meta(item, &mut seen)?;
            }
        }
        rule.validate()?;
        Ok(rule)
    }

    fn meta(&mut self, item: &str, seen: &mut HashSet<String>) -> Result<(), RuleError> {
        let (key, value) = match item.split_once(':') {
            Some((k, v)) => (k.trim(), Some(v.trim())),
            None => (item, None),
        };
        if !seen.insert(key.to_string()) {
            return Err(RuleError::ConflictingPunctuation {
                rule: self.source.clone(),
                what: format!("`{}` given twice", key),
            });
        }
        let truth = |v: Option<&str>| -> Result<TruthFn, RuleError> {
            let v = v.unwrap_or_default();
            TruthFn::from_name(v).ok_or_else(|| RuleError::UnknownTruthFn(v.to_string()))
        };
        match (key, value) {
            ("Belief", v) => self.belief_fn = Some(truth(v)?),
            ("Goal", v) => self.goal_fn = Some(truth(v)?),
            ("Punctuation", Some(v)) => match v {
                "Question" => self.questions = true,
                "Quest" => self.quests = true,
                "Same" => {
                    self.questions = true;
                    self.quests = true;
                }
                _ => {
                    return Err(RuleError::ConflictingPunctuation {
                        rule: self.source.clone(),
                        what: format!("punctuation `{}`", v),
                    })
                }
            },
            ("Time", Some(v)) => {
                self.time = TimeMode::from_name(v)
                    .ok_or_else(|| RuleError::Syntax(format!("unknown time mode `{}`", v)))?
            }
            ("Overlap", None) => self.overlap = true,
            ("Single", None) => self.single = true,
            _ => return Err(RuleError::Syntax(format!("unknown meta item `{}`", item))),
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), RuleError> {
        if self.belief_fn.is_none() && self.goal_fn.is_none() && !self.questions && !self.quests {
            return Err(RuleError::NoPunctuation(self.source.clone()));
        }
        if self.single {
            for f in [self.belief_fn, self.goal_fn].into_iter().flatten() {
                if !f.is_single() {
                    return Err(RuleError::SingleWithBinary {
                        rule: self.source.clone(),
                        func: f.name().to_string(),
                    });
                }
            }
        }
        let mut bound = pattern_vars(&self.task);
        bound.extend(pattern_vars(&self.belief));
        for v in pattern_vars(&self.conclusion) {
            if !bound.contains(&v) {
                return Err(RuleError::Unbound {
                    rule: self.source.clone(),
                    var: v.to_string(),
                });
            }
        }
        for c in &self.constraints {
            for v in c.vars() {
                if !bound.contains(v) {
                    return Err(RuleError::Unbound {
                        rule: self.source.clone(),
                        var: v.to_string(),
                    });
                }
            }
        }
        let open = self.conclusion.has_xternal();
        if open != (self.time == TimeMode::Dt) {
            return Err(RuleError::Syntax(format!(
                "`{}`: Time:Dt and an open (+-) conclusion offset go together",
                self.source
            )));
        }
        Ok(())
    }

    /// Truth function for a task of this punctuation, if the rule applies.
    pub fn truth_fn(&self, punct: nars_contract::Punctuation) -> Option<TruthFn> {
        match punct {
            nars_contract::Punctuation::Belief => self.belief_fn,
            nars_contract::Punctuation::Goal => self.goal_fn,
            _ => None,
        }
    }

    /// Whether the rule applies to a task of this punctuation.
    pub fn accepts(&self, punct: nars_contract::Punctuation) -> bool {
        use nars_contract::Punctuation::*;
        match punct {
            Belief => self.belief_fn.is_some(),
            Goal => self.goal_fn.is_some(),
            Question => self.questions,
            Quest => self.quests,
        }
    }
}
