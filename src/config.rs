//! Engine configuration.
//!
//! Every knob has a default; JSON input may name any subset of fields.

use crate::attention::{FocusParams, MetaGoal};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

// =============================================================================
// SUB-CONFIGS
// =============================================================================

/// Memory bounds and forgetting.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BagConfig {
    /// Concepts held in the global index.
    pub concepts: usize,
    /// Task-link capacity of an awake concept.
    pub task_links_awake: usize,
    /// Term-link capacity of an awake concept.
    pub term_links_awake: usize,
    /// Task-link capacity of a new or sleeping concept.
    pub task_links_sleeping: usize,
    /// Term-link capacity of a new or sleeping concept.
    pub term_links_sleeping: usize,
    /// Probe window of the link bags.
    pub reprobes: usize,
    /// Priority charged to a busy slot's occupant.
    pub contention_penalty: f32,
    /// Decay applied to every bag once per tick.
    pub forget_rate: f32,
    /// Concepts below this priority fall asleep.
    pub sleep_threshold: f32,
    /// Fraction of a concept's activation passed to its term-links.
    pub activation_spread: f32,
}

impl Default for BagConfig {
    fn default() -> Self {
        Self {
            concepts: 1024,
            task_links_awake: 32,
            term_links_awake: 32,
            task_links_sleeping: 8,
            term_links_sleeping: 8,
            reprobes: 4,
            contention_penalty: 0.01,
            forget_rate: 0.05,
            sleep_threshold: 0.05,
            activation_spread: 0.5,
        }
    }
}

/// Per-concept table sizes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub beliefs_eternal: usize,
    pub beliefs_temporal: usize,
    pub goals_eternal: usize,
    pub goals_temporal: usize,
    pub questions: usize,
    pub series: usize,
    /// Truth resolution: dithering step and minimum revision improvement.
    pub truth_epsilon: f32,
    /// Largest confidence gap between two judgements that may revise.
    pub revision_tolerance: f32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            beliefs_eternal: 8,
            beliefs_temporal: 16,
            goals_eternal: 4,
            goals_temporal: 8,
            questions: 8,
            series: 64,
            truth_epsilon: 0.01,
            revision_tolerance: crate::table::CONF_TOLERANCE,
        }
    }
}

/// Premise formation and derivation gates.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DeriveConfig {
    /// Largest term a derivation may produce.
    pub max_volume: u32,
    /// Derived truth below this confidence is dropped.
    pub confidence_min: f32,
    /// Derived budget below this priority is dropped.
    pub priority_min: f32,
    /// Premises whose combined task and belief quality is below this are
    /// skipped before rule matching.
    pub quality_min: f32,
    /// Premises formed per derivation iteration.
    pub premises_per_iteration: usize,
    /// Term-links drawn per sampled task-link.
    pub term_links_per_task: usize,
    /// Depth of subterm templates used for linking.
    pub template_depth: usize,
}

impl Default for DeriveConfig {
    fn default() -> Self {
        Self {
            max_volume: 24,
            confidence_min: 0.01,
            priority_min: 0.001,
            quality_min: 0.01,
            premises_per_iteration: 4,
            term_links_per_task: 2,
            template_depth: 2,
        }
    }
}

/// Meta-goal economy.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    /// Weight per meta-goal, in `MetaGoal::ALL` order.
    pub weights: [f32; MetaGoal::COUNT],
    /// Share of a cause's previous value kept on update.
    pub momentum: f32,
    pub focus: FocusParams,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            weights: MetaGoal::default_weights(),
            momentum: 0.9,
            focus: FocusParams::default(),
        }
    }
}

// =============================================================================
// ENGINE CONFIG
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bag: BagConfig,
    pub table: TableConfig,
    pub derive: DeriveConfig,
    pub attention: AttentionConfig,
    /// Seed of the engine's RNG.
    pub seed: u64,
    /// Clock duration (cycles per "moment").
    pub dur: u32,
    pub input_priority: f32,
    pub input_durability: f32,
    /// Goal expectation above which a decision is emitted.
    pub decision_threshold: f32,
    /// Frequency distance within which a prediction counts as accurate.
    pub accuracy_tolerance: f32,
    /// Scale of the penalty charged to links whose derivation was deleted.
    pub deletion_scale: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bag: BagConfig::default(),
            table: TableConfig::default(),
            derive: DeriveConfig::default(),
            attention: AttentionConfig::default(),
            seed: 1,
            dur: 1,
            input_priority: 0.8,
            input_durability: 0.6,
            decision_threshold: 0.6,
            accuracy_tolerance: 0.33,
            deletion_scale: 0.5,
        }
    }
}

impl EngineConfig {
    /// Small memory, for tests and embedded use.
    pub fn small() -> Self {
        Self {
            bag: BagConfig {
                concepts: 128,
                task_links_awake: 16,
                term_links_awake: 16,
                task_links_sleeping: 4,
                term_links_sleeping: 4,
                ..Default::default()
            },
            table: TableConfig {
                beliefs_eternal: 4,
                beliefs_temporal: 8,
                goals_eternal: 2,
                goals_temporal: 4,
                questions: 4,
                series: 16,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Large memory and deeper derivation, tuned for throughput.
    pub fn server() -> Self {
        Self {
            bag: BagConfig {
                concepts: 65_536,
                task_links_awake: 64,
                term_links_awake: 64,
                task_links_sleeping: 16,
                term_links_sleeping: 16,
                reprobes: 8,
                ..Default::default()
            },
            table: TableConfig {
                beliefs_eternal: 16,
                beliefs_temporal: 32,
                goals_eternal: 8,
                goals_temporal: 16,
                questions: 16,
                series: 256,
                ..Default::default()
            },
            derive: DeriveConfig {
                max_volume: 32,
                premises_per_iteration: 16,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: EngineConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("bag.concepts", self.bag.concepts),
            ("bag.task_links_awake", self.bag.task_links_awake),
            ("bag.term_links_awake", self.bag.term_links_awake),
            ("bag.task_links_sleeping", self.bag.task_links_sleeping),
            ("bag.term_links_sleeping", self.bag.term_links_sleeping),
            ("bag.reprobes", self.bag.reprobes),
            ("table.beliefs_eternal", self.table.beliefs_eternal),
            ("table.goals_eternal", self.table.goals_eternal),
            ("table.questions", self.table.questions),
            ("table.series", self.table.series),
            ("derive.premises_per_iteration", self.derive.premises_per_iteration),
            ("attention.focus.max_iterations", self.attention.focus.max_iterations),
        ];
        for (name, v) in positive {
            if v == 0 {
                return Err(Error::Config(format!("{} must be positive", name)));
            }
        }
        let unit = [
            ("bag.contention_penalty", self.bag.contention_penalty),
            ("bag.forget_rate", self.bag.forget_rate),
            ("bag.sleep_threshold", self.bag.sleep_threshold),
            ("bag.activation_spread", self.bag.activation_spread),
            ("table.revision_tolerance", self.table.revision_tolerance),
            ("derive.confidence_min", self.derive.confidence_min),
            ("derive.priority_min", self.derive.priority_min),
            ("derive.quality_min", self.derive.quality_min),
            ("attention.momentum", self.attention.momentum),
            ("input_priority", self.input_priority),
            ("input_durability", self.input_durability),
            ("decision_threshold", self.decision_threshold),
            ("accuracy_tolerance", self.accuracy_tolerance),
            ("deletion_scale", self.deletion_scale),
        ];
        for (name, v) in unit {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::Config(format!("{} = {} is outside [0, 1]", name, v)));
            }
        }
        if !(self.table.truth_epsilon > 0.0 && self.table.truth_epsilon < 1.0) {
            return Err(Error::Config(format!(
                "table.truth_epsilon = {} must be in (0, 1)",
                self.table.truth_epsilon
            )));
        }
        if self.bag.task_links_sleeping > self.bag.task_links_awake
            || self.bag.term_links_sleeping > self.bag.term_links_awake
        {
            return Err(Error::Config(
                "sleeping link capacity exceeds awake capacity".to_string(),
            ));
        }
        if self.derive.max_volume < 3 {
            return Err(Error::Config("derive.max_volume must be at least 3".to_string()));
        }
        if self.dur == 0 {
            return Err(Error::Config("dur must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        EngineConfig::default().validate().unwrap();
        EngineConfig::small().validate().unwrap();
        EngineConfig::server().validate().unwrap();
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg = EngineConfig::from_json(r#"{"seed": 42, "table": {"beliefs_eternal": 3}}"#).unwrap();
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.table.beliefs_eternal, 3);
        assert_eq!(cfg.table.questions, TableConfig::default().questions);
        assert_eq!(cfg.bag.concepts, BagConfig::default().concepts);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.bag.forget_rate = 1.5;
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));

        let mut cfg = EngineConfig::default();
        cfg.table.truth_epsilon = 0.0;
        assert!(cfg.validate().is_err());

        assert!(EngineConfig::from_json(r#"{"bag": {"concepts": 0}}"#).is_err());
        assert!(EngineConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_json_round_trip_preserves_presets() {
        let server = EngineConfig::server();
        let back = EngineConfig::from_json(&server.to_json().unwrap()).unwrap();
        assert_eq!(back.bag.concepts, server.bag.concepts);
        assert_eq!(back.derive.max_volume, server.derive.max_volume);
    }
}
