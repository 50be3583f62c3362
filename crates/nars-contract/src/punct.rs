//! Punctuation and tense: what kind of sentence a task is, and when.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Occurrence-time sentinel for eternal (timeless) sentences.
pub const ETERNAL: i64 = i64::MIN;

/// Sentence punctuation.
///
/// | Char | Kind | Carries truth |
/// |------|------|---------------|
/// | `.` | belief | yes |
/// | `!` | goal | yes (desire) |
/// | `?` | question | no |
/// | `@` | quest | no |
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Punctuation {
    Belief,
    Goal,
    Question,
    Quest,
}

impl Punctuation {
    pub fn symbol(self) -> char {
        match self {
            Self::Belief => '.',
            Self::Goal => '!',
            Self::Question => '?',
            Self::Quest => '@',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '.' => Some(Self::Belief),
            '!' => Some(Self::Goal),
            '?' => Some(Self::Question),
            '@' => Some(Self::Quest),
            _ => None,
        }
    }

    /// Beliefs and goals carry a truth value; questions and quests never do.
    pub fn has_truth(self) -> bool {
        matches!(self, Self::Belief | Self::Goal)
    }

    /// Questions and quests.
    pub fn is_query(self) -> bool {
        !self.has_truth()
    }

    /// The punctuation whose tasks answer this one.
    ///
    /// Questions are answered by beliefs, quests by goals.
    pub fn answered_by(self) -> Option<Self> {
        match self {
            Self::Question => Some(Self::Belief),
            Self::Quest => Some(Self::Goal),
            _ => None,
        }
    }

    /// Index into per-punctuation arrays (belief, goal, question, quest).
    pub fn index(self) -> usize {
        match self {
            Self::Belief => 0,
            Self::Goal => 1,
            Self::Question => 2,
            Self::Quest => 3,
        }
    }
}

impl fmt::Display for Punctuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Tense marker as written in Narsese, resolved against a clock later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tense {
    Eternal,
    /// `:|:`
    Present,
    /// `:\:`, one duration before now
    Past,
    /// `:/:`, one duration after now
    Future,
    /// `@t`, absolute occurrence
    At(i64),
}

impl Tense {
    /// Resolve to an occurrence time (or [`ETERNAL`]).
    pub fn resolve(self, now: i64, dur: u32) -> i64 {
        match self {
            Self::Eternal => ETERNAL,
            Self::Present => now,
            Self::Past => now - dur as i64,
            Self::Future => now + dur as i64,
            Self::At(t) => t,
        }
    }
}

impl Default for Tense {
    fn default() -> Self {
        Self::Eternal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_symbols() {
        for p in [
            Punctuation::Belief,
            Punctuation::Goal,
            Punctuation::Question,
            Punctuation::Quest,
        ] {
            assert_eq!(Punctuation::from_char(p.symbol()), Some(p));
        }
        assert_eq!(Punctuation::from_char(';'), None);
    }

    #[test]
    fn test_answered_by() {
        assert_eq!(Punctuation::Question.answered_by(), Some(Punctuation::Belief));
        assert_eq!(Punctuation::Quest.answered_by(), Some(Punctuation::Goal));
        assert_eq!(Punctuation::Belief.answered_by(), None);
    }

    #[test]
    fn test_tense_resolve() {
        assert_eq!(Tense::Eternal.resolve(10, 2), ETERNAL);
        assert_eq!(Tense::Present.resolve(10, 2), 10);
        assert_eq!(Tense::Past.resolve(10, 2), 8);
        assert_eq!(Tense::Future.resolve(10, 2), 12);
        assert_eq!(Tense::At(-3).resolve(10, 2), -3);
    }
}
