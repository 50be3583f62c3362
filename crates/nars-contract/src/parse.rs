//! Narsese term reader.
//!
//! Accepts both the bracketed statement form `<a --> b>` and the
//! parenthesized form `(a-->b)`, plus prefix compounds `(&&, a, b)`.

use crate::term::{Op, Term, VarKind, DTERNAL, XTERNAL};
use std::fmt;

/// Syntax error with the character offset where reading stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

/// Prefix operators, longest first so `--` wins over `-` and `&&` over `&`.
const PREFIX_OPS: &[(&str, Op, i32)] = &[
    ("--", Op::Neg, DTERNAL),
    ("&&", Op::Conj, DTERNAL),
    ("&|", Op::Conj, 0),
    ("*", Op::Prod, DTERNAL),
    ("&", Op::SectExt, DTERNAL),
    ("|", Op::SectInt, DTERNAL),
    ("-", Op::DiffExt, DTERNAL),
    ("~", Op::DiffInt, DTERNAL),
    ("/", Op::ImgExt, DTERNAL),
    ("\\", Op::ImgInt, DTERNAL),
];

const COPULAS: &[(&str, Op)] = &[
    ("-->", Op::Inh),
    ("<->", Op::Sim),
    ("==>", Op::Impl),
    ("<=>", Op::Equi),
    ("&&", Op::Conj),
    ("&|", Op::Conj),
];

impl Term {
    /// Parse a single term; trailing input is an error.
    pub fn parse(s: &str) -> Result<Term, ParseError> {
        let mut p = Parser::new(s);
        let t = p.term()?;
        p.ws();
        if !p.done() {
            return Err(p.error("trailing input"));
        }
        Ok(t)
    }
}

fn is_atom_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '^'
}

pub(crate) struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    pub(crate) fn new(s: &str) -> Self {
        Self {
            chars: s.chars().collect(),
            pos: 0,
        }
    }

    pub(crate) fn error(&self, msg: &str) -> ParseError {
        ParseError {
            message: msg.to_string(),
            position: self.pos,
        }
    }

    pub(crate) fn done(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub(crate) fn ws(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.pos += 1;
        }
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    pub(crate) fn starts_with(&self, s: &str) -> bool {
        let mut i = self.pos;
        for c in s.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    pub(crate) fn eat(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.pos += s.chars().count();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), ParseError> {
        self.ws();
        if self.bump() == Some(c) {
            Ok(())
        } else {
            self.pos = self.pos.saturating_sub(1);
            Err(self.error(&format!("expected '{}'", c)))
        }
    }

    /// Read a run of characters accepted by `accept`.
    pub(crate) fn take_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if !accept(c) {
                break;
            }
            s.push(c);
            self.pos += 1;
        }
        s
    }

    fn build(&self, op: Op, subs: Vec<Term>, dt: i32) -> Result<Term, ParseError> {
        Term::compound(op, subs, dt).map_err(|e| self.error(&e.to_string()))
    }

    pub(crate) fn term(&mut self) -> Result<Term, ParseError> {
        self.ws();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('(') => {
                self.pos += 1;
                self.paren()
            }
            Some('<') => {
                self.pos += 1;
                self.infix('>')
            }
            Some('{') => {
                self.pos += 1;
                let subs = self.list('}')?;
                self.build(Op::SetExt, subs, DTERNAL)
            }
            Some('[') => {
                self.pos += 1;
                let subs = self.list(']')?;
                self.build(Op::SetInt, subs, DTERNAL)
            }
            Some('-') if self.starts_with("--") => {
                self.pos += 2;
                Ok(self.term()?.neg())
            }
            Some(c) if VarKind::from_char(c).is_some() => {
                self.pos += 1;
                let name = self.take_while(is_atom_char);
                if name.is_empty() {
                    return Err(self.error("variable without name"));
                }
                Ok(Term::var(VarKind::from_char(c).unwrap_or(VarKind::Query), &name))
            }
            Some(c) if is_atom_char(c) => {
                let name = self.take_while(is_atom_char);
                Ok(Term::atom(&name))
            }
            Some(c) => Err(self.error(&format!("unexpected '{}'", c))),
        }
    }

    fn paren(&mut self) -> Result<Term, ParseError> {
        self.ws();
        for &(sym, op, dt) in PREFIX_OPS {
            if self.starts_with(sym) {
                let save = self.pos;
                self.pos += sym.chars().count();
                self.ws();
                if self.peek() == Some(',') {
                    self.pos += 1;
                    let subs = self.list(')')?;
                    return self.build(op, subs, dt);
                }
                self.pos = save;
            }
        }
        self.infix(')')
    }

    fn infix(&mut self, close: char) -> Result<Term, ParseError> {
        let first = self.term()?;
        self.ws();
        if close == ')' {
            match self.peek() {
                Some(')') => {
                    self.pos += 1;
                    return self.build(Op::Prod, vec![first], DTERNAL);
                }
                Some(',') => {
                    self.pos += 1;
                    let mut subs = vec![first];
                    subs.extend(self.list(')')?);
                    return self.build(Op::Prod, subs, DTERNAL);
                }
                _ => {}
            }
        }
        let (op, dt) = self.copula()?;
        let second = self.term()?;
        self.expect(close)?;
        self.build(op, vec![first, second], dt)
    }

    fn copula(&mut self) -> Result<(Op, i32), ParseError> {
        for &(sym, op) in COPULAS {
            if self.eat(sym) {
                if sym == "&|" {
                    return Ok((op, 0));
                }
                let dt = if op.is_temporal() {
                    self.dt_suffix()?
                } else {
                    DTERNAL
                };
                return Ok((op, dt));
            }
        }
        Err(self.error("expected copula"))
    }

    fn dt_suffix(&mut self) -> Result<i32, ParseError> {
        if self.eat("+-") {
            return Ok(XTERNAL);
        }
        let sign = match self.peek() {
            Some('+') => 1,
            Some('-') => -1,
            _ => return Ok(DTERNAL),
        };
        let digit_follows = self
            .chars
            .get(self.pos + 1)
            .map_or(false, |c| c.is_ascii_digit());
        if !digit_follows {
            return Ok(DTERNAL);
        }
        self.pos += 1;
        let digits = self.take_while(|c| c.is_ascii_digit());
        digits
            .parse::<i32>()
            .map(|d| sign * d)
            .map_err(|_| self.error("bad temporal offset"))
    }

    fn list(&mut self, close: char) -> Result<Vec<Term>, ParseError> {
        let mut subs = Vec::new();
        loop {
            subs.push(self.term()?);
            self.ws();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(subs),
                _ => {
                    self.pos = self.pos.saturating_sub(1);
                    return Err(self.error(&format!("expected ',' or '{}'", close)));
                }
            }
        }
    }
}
