//! `nars-contract`: Substrate types for the ladybug NARS core.
//!
//! This crate contains the pure data types that the reasoning runtime
//! exchanges with the outside world. It has no I/O, no locks, no clocks;
//! just terms, truth arithmetic, evidence stamps, and serde.
//!
//! ## What's included
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`term`] | `Term`: immutable, shared NAL expression + builder |
//! | [`parse`] | Narsese term reader (`Term::parse`) |
//! | [`narsese`] | Task-line reader (`parse_task`) → `TaskSpec` |
//! | [`truth`] | `TruthValue` with NAL truth functions |
//! | [`stamp`] | `Stamp`: bounded evidential base |
//! | [`punct`] | `Punctuation`, `Tense`, `ETERNAL` |

pub mod narsese;
pub mod parse;
pub mod punct;
pub mod stamp;
pub mod term;
pub mod truth;

// === Convenience re-exports ===
pub use narsese::{parse_task, TaskSpec};
pub use parse::ParseError;
pub use punct::{Punctuation, Tense, ETERNAL};
pub use stamp::{Stamp, STAMP_CAPACITY};
pub use term::{Op, Term, TermError, VarKind, DTERNAL, XTERNAL};
pub use truth::TruthValue;
