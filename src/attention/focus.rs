//! Focus: iteration allocation across causables.
//!
//! Each control cycle draws causables by roulette with weight
//! `value / time_per_iteration`. A causable's iteration demand grows
//! multiplicatively (up to `max_iterations`) while its value keeps
//! improving, and its growth is frozen as soon as it stops. Low-value
//! causables may starve.

use super::{CauseId, Causes};
use crate::engine::Engine;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A schedulable internal process.
pub trait Causable: Send + Sync {
    fn name(&self) -> &str;

    fn cause(&self) -> CauseId;

    /// Do up to `iterations` units of work; returns how many were done.
    fn run(&self, engine: &Engine, iterations: usize) -> usize;
}

/// Causable backed by a closure (sensors, host-side processes).
pub struct FnCausable<F> {
    name: String,
    cause: CauseId,
    f: F,
}

impl<F> FnCausable<F>
where
    F: Fn(&Engine, usize) -> usize + Send + Sync,
{
    pub fn new(name: impl Into<String>, cause: CauseId, f: F) -> Self {
        Self {
            name: name.into(),
            cause,
            f,
        }
    }
}

impl<F> Causable for FnCausable<F>
where
    F: Fn(&Engine, usize) -> usize + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn cause(&self) -> CauseId {
        self.cause
    }

    fn run(&self, engine: &Engine, iterations: usize) -> usize {
        (self.f)(engine, iterations)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusParams {
    pub min_iterations: usize,
    pub max_iterations: usize,
    /// Multiplier applied to demand while value improves.
    pub growth: f32,
    /// Smoothing of the time-per-iteration estimate.
    pub time_ema: f32,
}

impl Default for FocusParams {
    fn default() -> Self {
        Self {
            min_iterations: 1,
            max_iterations: 64,
            growth: 1.5,
            time_ema: 0.2,
        }
    }
}

struct Entry {
    causable: Arc<dyn Causable>,
    iterations: f32,
    growth: f32,
    /// Seconds per iteration, smoothed.
    time_per_iteration: f32,
    last_value: f32,
}

pub struct Focus {
    params: FocusParams,
    entries: Vec<Entry>,
}

impl fmt::Debug for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Focus")
            .field("causables", &self.entries.len())
            .field("params", &self.params)
            .finish()
    }
}

/// Scheduling state of one causable, for inspection.
#[derive(Clone, Debug, Serialize)]
pub struct FocusEntry {
    pub name: String,
    pub cause: CauseId,
    pub iterations: usize,
    pub frozen: bool,
    pub time_per_iteration: f32,
}

impl Focus {
    pub fn new(params: FocusParams) -> Self {
        Self {
            params,
            entries: Vec::new(),
        }
    }

    /// Returns the slot index of the new causable.
    pub fn register(&mut self, causable: Arc<dyn Causable>) -> usize {
        self.entries.push(Entry {
            causable,
            iterations: self.params.min_iterations.max(1) as f32,
            growth: self.params.growth.max(1.0),
            time_per_iteration: 1e-4,
            last_value: 0.0,
        });
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Benefit/cost weight; negative value never wins a draw.
    fn weight(&self, e: &Entry, causes: &Causes) -> f32 {
        causes.value(e.causable.cause()).max(0.0) / e.time_per_iteration.max(1e-9)
    }

    /// Roulette draw. With no positive weight every causable is equally
    /// likely, so a fresh system still explores.
    pub fn pick<R: Rng + ?Sized>(&self, causes: &Causes, rng: &mut R) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let weights: Vec<f32> = self.entries.iter().map(|e| self.weight(e, causes)).collect();
        let total: f32 = weights.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return Some(rng.gen_range(0..self.entries.len()));
        }
        let mut x = rng.gen::<f32>() * total;
        for (i, w) in weights.iter().enumerate() {
            if x < *w {
                return Some(i);
            }
            x -= w;
        }
        Some(self.entries.len() - 1)
    }

    /// Causable and iteration count for slot `i`.
    pub fn plan(&self, i: usize) -> Option<(Arc<dyn Causable>, usize)> {
        let e = self.entries.get(i)?;
        Some((e.causable.clone(), e.iterations.round().max(1.0) as usize))
    }

    /// Fold the outcome of a run into slot `i`.
    pub fn record(&mut self, i: usize, done: usize, elapsed: Duration, value: f32) {
        let params = &self.params;
        let Some(e) = self.entries.get_mut(i) else {
            return;
        };
        if done > 0 {
            let per = elapsed.as_secs_f32() / done as f32;
            e.time_per_iteration += params.time_ema * (per - e.time_per_iteration);
        }
        if value > e.last_value {
            e.iterations = (e.iterations * e.growth).min(params.max_iterations as f32);
        } else {
            // stopped improving: hold demand where it is
            e.growth = 1.0;
        }
        e.last_value = value;
    }

    pub fn entries(&self) -> Vec<FocusEntry> {
        self.entries
            .iter()
            .map(|e| FocusEntry {
                name: e.causable.name().to_string(),
                cause: e.causable.cause(),
                iterations: e.iterations.round() as usize,
                frozen: e.growth <= 1.0,
                time_per_iteration: e.time_per_iteration,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn causable(name: &str, cause: CauseId) -> Arc<dyn Causable> {
        Arc::new(FnCausable::new(name, cause, |_: &Engine, n| n))
    }

    #[test]
    fn test_growth_until_value_stalls() {
        let causes = Causes::new();
        let c = causes.register("c");
        let mut focus = Focus::new(FocusParams {
            max_iterations: 10,
            ..Default::default()
        });
        let i = focus.register(causable("c", c));
        let ms = Duration::from_millis(1);
        focus.record(i, 1, ms, 0.1);
        focus.record(i, 1, ms, 0.2);
        let grown = focus.plan(i).unwrap().1;
        assert!(grown > 1);
        focus.record(i, 1, ms, 0.2);
        let frozen = focus.plan(i).unwrap().1;
        focus.record(i, 1, ms, 0.9);
        assert_eq!(focus.plan(i).unwrap().1, frozen, "growth stays frozen");
        assert!(focus.entries()[0].frozen);
        for _ in 0..20 {
            focus.record(i, 1, ms, 1.0);
        }
        assert!(focus.plan(i).unwrap().1 <= 10);
    }

    #[test]
    fn test_zero_value_causable_starves() {
        let causes = Causes::new();
        let good = causes.register("good");
        let bad = causes.register("bad");
        causes.credit(&[good], crate::attention::MetaGoal::Answer, 1.0);
        causes.update(&crate::attention::MetaGoal::default_weights(), 0.0);
        let mut focus = Focus::new(FocusParams::default());
        focus.register(causable("good", good));
        focus.register(causable("bad", bad));
        let mut rng = StdRng::seed_from_u64(7);
        let wins = (0..200)
            .filter(|_| focus.pick(&causes, &mut rng) == Some(0))
            .count();
        assert_eq!(wins, 200, "zero-value causable starves");
    }

    #[test]
    fn test_uniform_when_nothing_has_value() {
        let causes = Causes::new();
        let a = causes.register("a");
        let b = causes.register("b");
        let mut focus = Focus::new(FocusParams::default());
        focus.register(causable("a", a));
        focus.register(causable("b", b));
        let mut rng = StdRng::seed_from_u64(3);
        let picks: Vec<_> = (0..100).filter_map(|_| focus.pick(&causes, &mut rng)).collect();
        assert!(picks.contains(&0) && picks.contains(&1));
    }
}
