//! Task-line reader: `<term><punct> [tense] [%f;c%]`
//!
//! ```text
//! (a-->b).                eternal belief, default truth <1.0, 0.9>
//! (a-->b). :|: %0.8;0.7%  present belief
//! (a-->b)! @42            goal at t=42
//! (?x-->b)?               question
//! ```

use crate::parse::{ParseError, Parser};
use crate::punct::{Punctuation, Tense};
use crate::term::Term;
use crate::truth::TruthValue;

/// A task as described by its input line, before it is stamped and budgeted.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskSpec {
    pub term: Term,
    pub punctuation: Punctuation,
    /// Always `Some` for beliefs/goals, always `None` for questions/quests.
    pub truth: Option<TruthValue>,
    pub tense: Tense,
}

impl TaskSpec {
    pub fn new(term: Term, punctuation: Punctuation, truth: Option<TruthValue>, tense: Tense) -> Self {
        let truth = if punctuation.has_truth() {
            Some(truth.unwrap_or_else(TruthValue::certain_true))
        } else {
            None
        };
        Self {
            term,
            punctuation,
            truth,
            tense,
        }
    }

    pub fn belief(term: Term, truth: TruthValue) -> Self {
        Self::new(term, Punctuation::Belief, Some(truth), Tense::Eternal)
    }

    pub fn goal(term: Term, truth: TruthValue) -> Self {
        Self::new(term, Punctuation::Goal, Some(truth), Tense::Eternal)
    }

    pub fn question(term: Term) -> Self {
        Self::new(term, Punctuation::Question, None, Tense::Eternal)
    }

    pub fn at(mut self, tense: Tense) -> Self {
        self.tense = tense;
        self
    }
}

/// Parse one Narsese task line.
pub fn parse_task(line: &str) -> Result<TaskSpec, ParseError> {
    let mut p = Parser::new(line.trim());
    let term = p.term()?;
    p.ws();
    let punctuation = p
        .bump()
        .and_then(Punctuation::from_char)
        .ok_or_else(|| p.error("expected punctuation ('.', '!', '?', '@')"))?;
    p.ws();

    let tense = if p.eat(":|:") {
        Tense::Present
    } else if p.eat(":/:") {
        Tense::Future
    } else if p.eat(":\\:") {
        Tense::Past
    } else if p.eat("@") {
        let digits = p.take_while(|c| c.is_ascii_digit() || c == '-');
        let t = digits
            .parse::<i64>()
            .map_err(|_| p.error("bad occurrence time"))?;
        Tense::At(t)
    } else {
        Tense::Eternal
    };
    p.ws();

    let truth = if p.eat("%") {
        let f = read_number(&mut p)?;
        let c = if p.eat(";") {
            read_number(&mut p)?
        } else {
            TruthValue::certain_true().confidence
        };
        if !p.eat("%") {
            return Err(p.error("unterminated truth"));
        }
        if !(0.0..=1.0).contains(&f) || !(0.0..=1.0).contains(&c) {
            return Err(p.error("truth out of range"));
        }
        Some(TruthValue::new(f, c))
    } else {
        None
    };
    p.ws();
    if !p.done() {
        return Err(p.error("trailing input"));
    }
    Ok(TaskSpec::new(term, punctuation, truth, tense))
}

fn read_number(p: &mut Parser) -> Result<f32, ParseError> {
    let s = p.take_while(|c| c.is_ascii_digit() || c == '.');
    s.parse::<f32>().map_err(|_| p.error("bad number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_truth() {
        let t = parse_task("(a-->b).").unwrap();
        assert_eq!(t.punctuation, Punctuation::Belief);
        assert_eq!(t.truth, Some(TruthValue::certain_true()));
        assert_eq!(t.tense, Tense::Eternal);
    }

    #[test]
    fn test_full_line() {
        let t = parse_task("<a --> b>. :|: %0.8;0.7%").unwrap();
        assert_eq!(t.tense, Tense::Present);
        let tv = t.truth.unwrap();
        assert!((tv.frequency - 0.8).abs() < 1e-6);
        assert!((tv.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_absolute_time_goal() {
        let t = parse_task("(a-->b)! @42").unwrap();
        assert_eq!(t.punctuation, Punctuation::Goal);
        assert_eq!(t.tense, Tense::At(42));
    }

    #[test]
    fn test_question_has_no_truth() {
        let t = parse_task("(?x-->b)? %1.0;0.9%").unwrap();
        assert_eq!(t.punctuation, Punctuation::Question);
        assert_eq!(t.truth, None);
    }

    #[test]
    fn test_bad_lines() {
        assert!(parse_task("(a-->b)").is_err());
        assert!(parse_task("(a-->b). %1.5;0.9%").is_err());
        assert!(parse_task("(a-->b). %1.0;0.9").is_err());
    }
}
