//! Terms: immutable, structurally shared NAL expressions.
//!
//! A [`Term`] is a cheap-to-clone handle (`Arc`) onto an immutable node that
//! carries its structural hash and volume, so equality and hashing never walk
//! the tree twice. Compounds are only built through [`Term::compound`], which
//! normalizes commutative operators and rejects malformed statements.
//!
//! ```text
//! Atom        a            Var      $x #x ?x %x
//! Neg         (--,a)       Prod     (*,a,b)
//! Inh/Sim     (a-->b)      (a<->b)
//! Impl/Equi   (a==>b)      (a ==>+3 b)   (a<=>b)
//! Conj        (&&,a,b)     (a &&+3 b)    (&|,a,b)   (a &&+- b)
//! Sets        {a,b}        [a,b]
//! Sections    (&,a,b)      (|,a,b)
//! Difference  (-,a,b)      (~,a,b)
//! Images      (/,r,_,b)    (\,r,_,b)
//! ```

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// No temporal relation between the components.
pub const DTERNAL: i32 = i32::MIN;

/// Temporal relation exists but is not yet known.
pub const XTERNAL: i32 = i32::MAX;

/// Variable kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VarKind {
    /// `$x`
    Independent,
    /// `#x`
    Dependent,
    /// `?x`
    Query,
    /// `%x`, only appears in derivation rule patterns
    Pattern,
}

impl VarKind {
    pub fn symbol(self) -> char {
        match self {
            Self::Independent => '$',
            Self::Dependent => '#',
            Self::Query => '?',
            Self::Pattern => '%',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '$' => Some(Self::Independent),
            '#' => Some(Self::Dependent),
            '?' => Some(Self::Query),
            '%' => Some(Self::Pattern),
            _ => None,
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Term operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Op {
    Atom,
    Var(VarKind),
    Neg,
    Inh,
    Sim,
    Impl,
    Equi,
    Conj,
    Prod,
    SetExt,
    SetInt,
    SectExt,
    SectInt,
    DiffExt,
    DiffInt,
    ImgExt,
    ImgInt,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Atom | Op::Var(_) => "",
            Op::Neg => "--",
            Op::Inh => "-->",
            Op::Sim => "<->",
            Op::Impl => "==>",
            Op::Equi => "<=>",
            Op::Conj => "&&",
            Op::Prod => "*",
            Op::SetExt => "{",
            Op::SetInt => "[",
            Op::SectExt => "&",
            Op::SectInt => "|",
            Op::DiffExt => "-",
            Op::DiffInt => "~",
            Op::ImgExt => "/",
            Op::ImgInt => "\\",
        }
    }

    pub fn is_atomic(self) -> bool {
        matches!(self, Op::Atom | Op::Var(_))
    }

    /// Copula-bearing statements: the only terms that can be believed.
    pub fn is_statement(self) -> bool {
        matches!(self, Op::Inh | Op::Sim | Op::Impl | Op::Equi)
    }

    /// Operators that carry a temporal offset.
    pub fn is_temporal(self) -> bool {
        matches!(self, Op::Impl | Op::Equi | Op::Conj)
    }

    pub fn is_set(self) -> bool {
        matches!(self, Op::SetExt | Op::SetInt)
    }

    pub fn is_image(self) -> bool {
        matches!(self, Op::ImgExt | Op::ImgInt)
    }

    /// Whether operand order is irrelevant for this operator at offset `dt`.
    pub fn is_commutative(self, dt: i32) -> bool {
        match self {
            Op::Sim | Op::SetExt | Op::SetInt | Op::SectExt | Op::SectInt => true,
            Op::Equi | Op::Conj => dt == DTERNAL || dt == 0 || dt == XTERNAL,
            _ => false,
        }
    }
}

/// Failure to construct a compound term.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TermError {
    /// Operator applied to an unsupported number of operands.
    Arity { op: Op, got: usize },
    /// Statement or difference whose two sides are the same term.
    Reflexive(String),
    /// Image without exactly one `_` placeholder.
    Placeholder(Op),
    /// `compound` called with an atomic operator.
    Atomic(Op),
}

impl fmt::Display for TermError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermError::Arity { op, got } => write!(f, "{:?} cannot take {} operands", op, got),
            TermError::Reflexive(t) => write!(f, "reflexive compound on {}", t),
            TermError::Placeholder(op) => write!(f, "{:?} needs exactly one '_' placeholder", op),
            TermError::Atomic(op) => write!(f, "{:?} is not a compound operator", op),
        }
    }
}

impl std::error::Error for TermError {}

struct Node {
    op: Op,
    name: Option<Box<str>>,
    subs: Box<[Term]>,
    dt: i32,
    hash: u64,
    volume: u32,
    vars: u8,
}

/// Immutable NAL term. Clone is a reference-count bump.
#[derive(Clone)]
pub struct Term(Arc<Node>);

impl Term {
    fn build(op: Op, name: Option<Box<str>>, subs: Vec<Term>, dt: i32) -> Term {
        let mut h = DefaultHasher::new();
        op.hash(&mut h);
        name.hash(&mut h);
        dt.hash(&mut h);
        for s in &subs {
            h.write_u64(s.0.hash);
        }
        let volume = 1 + subs.iter().map(|s| s.0.volume).sum::<u32>();
        let vars = match op {
            Op::Var(k) => k.bit(),
            _ => subs.iter().fold(0u8, |m, s| m | s.0.vars),
        };
        Term(Arc::new(Node {
            op,
            name,
            subs: subs.into_boxed_slice(),
            dt,
            hash: h.finish(),
            volume,
            vars,
        }))
    }

    pub fn atom(name: &str) -> Term {
        Self::build(Op::Atom, Some(name.into()), Vec::new(), DTERNAL)
    }

    pub fn var(kind: VarKind, name: &str) -> Term {
        Self::build(Op::Var(kind), Some(name.into()), Vec::new(), DTERNAL)
    }

    /// The `_` slot of an image.
    pub fn placeholder() -> Term {
        Self::atom("_")
    }

    /// Build a normalized compound.
    ///
    /// - commutative operators sort and deduplicate their operands
    /// - double negation cancels
    /// - sections and commutative conjunctions of one operand collapse to it
    /// - temporal sequences with negative offset are flipped
    /// - `dt` is ignored for non-temporal operators
    pub fn compound(op: Op, subs: Vec<Term>, dt: i32) -> Result<Term, TermError> {
        if op.is_atomic() {
            return Err(TermError::Atomic(op));
        }
        let mut dt = if op.is_temporal() { dt } else { DTERNAL };
        let mut subs = subs;
        let n = subs.len();
        match op {
            Op::Neg => {
                let inner = match (subs.pop(), n) {
                    (Some(t), 1) => t,
                    _ => return Err(TermError::Arity { op, got: n }),
                };
                if inner.op() == Op::Neg {
                    return Ok(inner.0.subs[0].clone());
                }
                Ok(Self::build(Op::Neg, None, vec![inner], DTERNAL))
            }
            Op::Inh | Op::Sim | Op::Impl | Op::Equi => {
                if n != 2 {
                    return Err(TermError::Arity { op, got: n });
                }
                if subs[0] == subs[1] {
                    return Err(TermError::Reflexive(subs[0].to_string()));
                }
                if op.is_commutative(dt) && subs[1] < subs[0] {
                    subs.swap(0, 1);
                } else if op == Op::Equi && dt != DTERNAL && dt != XTERNAL && dt < 0 {
                    subs.swap(0, 1);
                    dt = -dt;
                }
                Ok(Self::build(op, None, subs, dt))
            }
            Op::Conj => {
                if op.is_commutative(dt) {
                    subs.sort();
                    subs.dedup();
                    match subs.len() {
                        0 => Err(TermError::Arity { op, got: 0 }),
                        1 => Ok(subs.swap_remove(0)),
                        _ => Ok(Self::build(op, None, subs, dt)),
                    }
                } else {
                    if n != 2 {
                        return Err(TermError::Arity { op, got: n });
                    }
                    if dt < 0 {
                        subs.swap(0, 1);
                        dt = -dt;
                    }
                    Ok(Self::build(op, None, subs, dt))
                }
            }
            Op::SetExt | Op::SetInt => {
                if n == 0 {
                    return Err(TermError::Arity { op, got: 0 });
                }
                subs.sort();
                subs.dedup();
                Ok(Self::build(op, None, subs, DTERNAL))
            }
            Op::SectExt | Op::SectInt => {
                subs.sort();
                subs.dedup();
                match subs.len() {
                    0 => Err(TermError::Arity { op, got: 0 }),
                    1 => Ok(subs.swap_remove(0)),
                    _ => Ok(Self::build(op, None, subs, DTERNAL)),
                }
            }
            Op::DiffExt | Op::DiffInt => {
                if n != 2 {
                    return Err(TermError::Arity { op, got: n });
                }
                if subs[0] == subs[1] {
                    return Err(TermError::Reflexive(subs[0].to_string()));
                }
                Ok(Self::build(op, None, subs, DTERNAL))
            }
            Op::Prod => {
                if n == 0 {
                    return Err(TermError::Arity { op, got: 0 });
                }
                Ok(Self::build(op, None, subs, DTERNAL))
            }
            Op::ImgExt | Op::ImgInt => {
                if n < 2 {
                    return Err(TermError::Arity { op, got: n });
                }
                if subs.iter().filter(|s| s.is_placeholder()).count() != 1 {
                    return Err(TermError::Placeholder(op));
                }
                Ok(Self::build(op, None, subs, DTERNAL))
            }
            Op::Atom | Op::Var(_) => Err(TermError::Atomic(op)),
        }
    }

    /// Shorthand for a two-sided statement without temporal offset.
    pub fn statement(op: Op, subject: Term, predicate: Term) -> Result<Term, TermError> {
        Self::compound(op, vec![subject, predicate], DTERNAL)
    }

    // === Accessors ===

    pub fn op(&self) -> Op {
        self.0.op
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn subs(&self) -> &[Term] {
        &self.0.subs
    }

    pub fn sub(&self, i: usize) -> Option<&Term> {
        self.0.subs.get(i)
    }

    pub fn arity(&self) -> usize {
        self.0.subs.len()
    }

    /// Number of nodes in the tree (structural complexity).
    pub fn volume(&self) -> u32 {
        self.0.volume
    }

    pub fn dt(&self) -> i32 {
        self.0.dt
    }

    pub fn structural_hash(&self) -> u64 {
        self.0.hash
    }

    pub fn is_atomic(&self) -> bool {
        self.0.op.is_atomic()
    }

    pub fn is_statement(&self) -> bool {
        self.0.op.is_statement()
    }

    pub fn is_placeholder(&self) -> bool {
        self.0.op == Op::Atom && self.name() == Some("_")
    }

    pub fn subject(&self) -> Option<&Term> {
        if self.is_statement() {
            self.sub(0)
        } else {
            None
        }
    }

    pub fn predicate(&self) -> Option<&Term> {
        if self.is_statement() {
            self.sub(1)
        } else {
            None
        }
    }

    // === Negation ===

    pub fn is_neg(&self) -> bool {
        self.0.op == Op::Neg
    }

    /// Negate; a negation is unwrapped instead of nested.
    pub fn neg(&self) -> Term {
        if self.is_neg() {
            self.0.subs[0].clone()
        } else {
            Self::build(Op::Neg, None, vec![self.clone()], DTERNAL)
        }
    }

    pub fn unneg(&self) -> Term {
        if self.is_neg() {
            self.0.subs[0].clone()
        } else {
            self.clone()
        }
    }

    // === Variables ===

    pub fn has_vars(&self) -> bool {
        self.0.vars != 0
    }

    pub fn has_var(&self, kind: VarKind) -> bool {
        self.0.vars & kind.bit() != 0
    }

    // === Structure ===

    /// Direct operand membership.
    pub fn contains(&self, t: &Term) -> bool {
        self.0.subs.iter().any(|s| s == t)
    }

    /// Membership at any depth (excluding `self`).
    pub fn contains_recursively(&self, t: &Term) -> bool {
        if t.volume() >= self.volume() {
            return false;
        }
        self.0
            .subs
            .iter()
            .any(|s| s == t || s.contains_recursively(t))
    }

    /// Canonical key of the concept this term belongs to:
    /// unnegated, with temporal offsets erased.
    pub fn concept(&self) -> Term {
        let t = self.unneg();
        t.detemporalize().unwrap_or(t)
    }

    fn detemporalize(&self) -> Result<Term, TermError> {
        if self.is_atomic() {
            return Ok(self.clone());
        }
        let temporal = self.op().is_temporal() && self.dt() != DTERNAL;
        if !temporal && !self.0.subs.iter().any(|s| s.has_temporal()) {
            return Ok(self.clone());
        }
        let subs = self
            .0
            .subs
            .iter()
            .map(|s| s.detemporalize())
            .collect::<Result<Vec<_>, _>>()?;
        Term::compound(self.op(), subs, DTERNAL)
    }

    /// Whether any node in the tree carries a temporal offset.
    pub fn has_temporal(&self) -> bool {
        (self.op().is_temporal() && self.dt() != DTERNAL)
            || self.0.subs.iter().any(|s| s.has_temporal())
    }

    /// Whether any node still has an unsolved (`XTERNAL`) offset.
    pub fn has_xternal(&self) -> bool {
        self.dt() == XTERNAL || self.0.subs.iter().any(|s| s.has_xternal())
    }

    /// Same operator and operands, different offset.
    pub fn with_dt(&self, dt: i32) -> Result<Term, TermError> {
        if self.is_atomic() || dt == self.dt() {
            return Ok(self.clone());
        }
        Term::compound(self.op(), self.0.subs.to_vec(), dt)
    }

    /// Substitute every occurrence of a key term by its value.
    pub fn replace(&self, map: &HashMap<Term, Term>) -> Result<Term, TermError> {
        if let Some(r) = map.get(self) {
            return Ok(r.clone());
        }
        if self.is_atomic() {
            return Ok(self.clone());
        }
        let mut changed = false;
        let mut subs = Vec::with_capacity(self.arity());
        for s in self.0.subs.iter() {
            let r = s.replace(map)?;
            changed |= !Arc::ptr_eq(&r.0, &s.0);
            subs.push(r);
        }
        if !changed {
            return Ok(self.clone());
        }
        Term::compound(self.op(), subs, self.dt())
    }

    /// Visit every node depth-first, `self` included.
    pub fn for_each(&self, f: &mut dyn FnMut(&Term)) {
        f(self);
        for s in self.0.subs.iter() {
            s.for_each(f);
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        let (a, b) = (&*self.0, &*other.0);
        a.hash == b.hash && a.op == b.op && a.dt == b.dt && a.name == b.name && a.subs == b.subs
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        if Arc::ptr_eq(&self.0, &other.0) {
            return Ordering::Equal;
        }
        let (a, b) = (&*self.0, &*other.0);
        a.op.cmp(&b.op)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.subs.cmp(&b.subs))
            .then_with(|| a.dt.cmp(&b.dt))
    }
}

fn dt_suffix(dt: i32) -> String {
    match dt {
        XTERNAL => "+-".to_string(),
        d if d >= 0 => format!("+{}", d),
        d => format!("{}", d),
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, subs: &[Term]) -> fmt::Result {
    for (i, s) in subs.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", s)?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = &*self.0;
        match n.op {
            Op::Atom => write!(f, "{}", n.name.as_deref().unwrap_or("")),
            Op::Var(k) => write!(f, "{}{}", k.symbol(), n.name.as_deref().unwrap_or("")),
            Op::Inh | Op::Sim | Op::Impl | Op::Equi => {
                if n.dt == DTERNAL {
                    write!(f, "({}{}{})", n.subs[0], n.op.symbol(), n.subs[1])
                } else {
                    write!(
                        f,
                        "({} {}{} {})",
                        n.subs[0],
                        n.op.symbol(),
                        dt_suffix(n.dt),
                        n.subs[1]
                    )
                }
            }
            Op::Conj if n.dt == 0 => {
                write!(f, "(&|,")?;
                write_list(f, &n.subs)?;
                write!(f, ")")
            }
            Op::Conj if n.dt != DTERNAL && n.subs.len() == 2 => {
                write!(f, "({} &&{} {})", n.subs[0], dt_suffix(n.dt), n.subs[1])
            }
            Op::SetExt => {
                write!(f, "{{")?;
                write_list(f, &n.subs)?;
                write!(f, "}}")
            }
            Op::SetInt => {
                write!(f, "[")?;
                write_list(f, &n.subs)?;
                write!(f, "]")
            }
            _ => {
                write!(f, "({},", n.op.symbol())?;
                write_list(f, &n.subs)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(n: &str) -> Term {
        Term::atom(n)
    }

    #[test]
    fn test_equality_is_structural() {
        let x = Term::statement(Op::Inh, a("x"), a("y")).unwrap();
        let y = Term::statement(Op::Inh, a("x"), a("y")).unwrap();
        assert_eq!(x, y);
        assert_eq!(x.structural_hash(), y.structural_hash());
        assert_eq!(x.volume(), 3);
    }

    #[test]
    fn test_commutative_sorting() {
        let s1 = Term::statement(Op::Sim, a("b"), a("a")).unwrap();
        let s2 = Term::statement(Op::Sim, a("a"), a("b")).unwrap();
        assert_eq!(s1, s2);
        let set = Term::compound(Op::SetExt, vec![a("b"), a("a"), a("b")], DTERNAL).unwrap();
        assert_eq!(set.arity(), 2);
        assert_eq!(set.to_string(), "{a,b}");
    }

    #[test]
    fn test_reflexive_rejected() {
        assert!(matches!(
            Term::statement(Op::Inh, a("x"), a("x")),
            Err(TermError::Reflexive(_))
        ));
    }

    #[test]
    fn test_double_negation() {
        let x = a("x");
        assert_eq!(x.neg().neg(), x);
        let nn = Term::compound(Op::Neg, vec![x.neg()], DTERNAL).unwrap();
        assert_eq!(nn, x);
    }

    #[test]
    fn test_section_of_one_collapses() {
        let t = Term::compound(Op::SectExt, vec![a("x"), a("x")], DTERNAL).unwrap();
        assert_eq!(t, a("x"));
    }

    #[test]
    fn test_sequence_negative_dt_flips() {
        let t = Term::compound(Op::Conj, vec![a("x"), a("y")], -3).unwrap();
        assert_eq!(t.sub(0), Some(&a("y")));
        assert_eq!(t.dt(), 3);
        assert_eq!(t.to_string(), "(y &&+3 x)");
    }

    #[test]
    fn test_concept_normalization() {
        let imp = Term::compound(Op::Impl, vec![a("x"), a("y")], 5).unwrap();
        let c = imp.neg().concept();
        assert_eq!(c.dt(), DTERNAL);
        assert_eq!(c.to_string(), "(x==>y)");
    }

    #[test]
    fn test_image_needs_placeholder() {
        let ok = Term::compound(Op::ImgExt, vec![a("r"), Term::placeholder(), a("b")], DTERNAL);
        assert!(ok.is_ok());
        let bad = Term::compound(Op::ImgExt, vec![a("r"), a("b")], DTERNAL);
        assert_eq!(bad, Err(TermError::Placeholder(Op::ImgExt)));
    }

    #[test]
    fn test_replace() {
        let t = Term::statement(Op::Inh, Term::var(VarKind::Pattern, "A"), a("y")).unwrap();
        let mut map = HashMap::new();
        map.insert(Term::var(VarKind::Pattern, "A"), a("x"));
        let r = t.replace(&map).unwrap();
        assert_eq!(r.to_string(), "(x-->y)");
        assert!(t.has_var(VarKind::Pattern));
        assert!(!r.has_vars());
    }

    #[test]
    fn test_contains_recursively() {
        let inner = Term::statement(Op::Inh, a("x"), a("y")).unwrap();
        let outer = Term::compound(Op::Conj, vec![inner.clone(), a("z")], DTERNAL).unwrap();
        assert!(outer.contains_recursively(&a("x")));
        assert!(outer.contains(&inner));
        assert!(!inner.contains_recursively(&outer));
    }
}
