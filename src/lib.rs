//! # Ladybug NARS
//!
//! Resource-bounded non-axiomatic reasoning core. Memory is a fixed set of
//! bags; every task competes for room by budget, every belief carries its
//! evidence, and rules are data compiled into an index.
//!
//! ## Quick Start
//! ```rust,ignore
//! use ladybug_nars::{Engine, EngineConfig};
//!
//! let engine = Engine::standard(EngineConfig::small())?;
//! engine.input_narsese("(robin-->bird).")?;
//! engine.input_narsese("(bird-->animal).")?;
//! let question = engine.input_narsese("(robin-->animal)?")?.unwrap();
//! for _ in 0..100 {
//!     engine.tick();
//! }
//! let answer = engine.best_answer(&question);
//! ```
//!
//! ## Architecture
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          ENGINE                                  │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  input ──► commit ──► Concept tables (eternal/temporal/series)   │
//! │               │            │                                     │
//! │               ▼            ▼                                     │
//! │          task-links    term-links     (HijackBag per concept)    │
//! │               │            │                                     │
//! │               └─► Premise ─┴─► RuleSet ──► derive ──► commit     │
//! │                                                                  │
//! │  Focus: causables drawn by cause value / time per iteration      │
//! │  Causes: meta-goal credit (perceive, believe, answer, ...)       │
//! │  ConceptIndex: CurveBag of concepts, forgetting once per tick    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![allow(
    clippy::collapsible_if,
    clippy::manual_range_contains,
    clippy::new_without_default,
    clippy::len_without_is_empty,
    clippy::too_many_arguments,
    clippy::type_complexity,
    clippy::unnecessary_map_or
)]

// === Core modules ===
pub mod attention;
pub mod bag;
pub mod budget;
pub mod concept;
pub mod config;
pub mod derive;
pub mod engine;
pub mod table;
pub mod task;
pub mod time;

// === Re-exports for convenience ===

pub use nars_contract::{
    parse_task, Op, Punctuation, Stamp, TaskSpec, Tense, Term, TruthValue, VarKind, DTERNAL,
    ETERNAL, XTERNAL,
};

pub use crate::attention::{Causable, CauseId, Causes, FnCausable, MetaGoal};
pub use crate::bag::{Bag, CurveBag, HijackBag, PutOutcome};
pub use crate::budget::{Budget, Merge, PriCell};
pub use crate::concept::{Concept, ConceptKind, ConceptState};
pub use crate::config::EngineConfig;
pub use crate::derive::{Deriver, Premise, Rule, RuleError, RuleSet, TimeMode, TruthFn};
pub use crate::engine::{Engine, EngineStats, TaskEvent};
pub use crate::table::BeliefTable;
pub use crate::task::{Task, TaskDraft, TaskId};
pub use crate::time::{Clock, CycleClock};

// === Error types ===

/// Crate-level error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("Parse error: {0}")]
    Parse(#[from] nars_contract::ParseError),

    #[error("Term error: {0}")]
    Term(#[from] nars_contract::TermError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
