//! The per-space ask/tell optimization loop.
//!
//! A [`Tuner`] owns one [`Space`], its append-only observation history, a
//! seeded RNG, and the current surrogate posterior. Callers drive it with
//! [`ask`](Tuner::ask) (propose normalized vectors) and
//! [`tell`](Tuner::tell) (report evaluated objectives); the tuner handles
//! the warm-up/modeling transition and never proposes more points than its
//! remaining evaluation budget.

use serde::{Deserialize, Serialize};

use crate::acquisition::Acquisition;
use crate::error::{Error, Result};
use crate::space::{Assignment, Space};
use crate::surrogate::Surrogate;

/// Maximum observations used per surrogate fit; caps the O(n³) cost.
const MAX_TRAIN_POINTS: usize = 100;

/// One evaluated point: the normalized vector that was proposed, the
/// recorded objective (minimization sign convention), and the raw
/// parameter assignment it decodes to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Normalized vector in `[0, 1]^d`.
    pub vector: Vec<f64>,
    /// Objective value; cross-validation scores are negated before recording.
    pub objective: f64,
    /// The raw parameter assignment.
    pub params: Assignment,
}

/// Lifecycle of a tuner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No ask has happened yet.
    Uninitialized,
    /// Random exploration until enough observations exist for a surrogate.
    WarmingUp,
    /// Surrogate-driven proposals.
    Modeling,
    /// Evaluation budget consumed.
    Exhausted,
}

/// Ask/tell optimizer for a single space.
pub struct Tuner {
    space: Space,
    acquisition: Acquisition,
    n_initial_points: usize,
    remaining: u32,
    history: Vec<Observation>,
    rng: fastrand::Rng,
    surrogate: Option<Surrogate>,
    phase: Phase,
}

impl Tuner {
    /// Creates a tuner with `weight` evaluations of budget.
    ///
    /// `n_initial_points` controls the warm-up length; `None` defaults to
    /// `d + 1` where `d` is the space dimensionality.
    #[must_use]
    pub fn new(
        space: Space,
        weight: u32,
        acquisition: Acquisition,
        n_initial_points: Option<usize>,
        seed: u64,
    ) -> Self {
        let n_initial_points = n_initial_points.unwrap_or(space.len() + 1);
        Self {
            space,
            acquisition,
            n_initial_points,
            remaining: weight,
            history: Vec::new(),
            rng: fastrand::Rng::with_seed(seed),
            surrogate: None,
            phase: if weight == 0 {
                Phase::Exhausted
            } else {
                Phase::Uninitialized
            },
        }
    }

    /// Rebuilds a tuner from persisted state. The RNG resumes from the
    /// exact captured state, so subsequent asks replay bit-for-bit.
    pub(crate) fn from_parts(
        space: Space,
        acquisition: Acquisition,
        n_initial_points: Option<usize>,
        remaining: u32,
        history: Vec<Observation>,
        rng_state: u64,
    ) -> Self {
        let mut tuner = Self::new(space, remaining, acquisition, n_initial_points, rng_state);
        tuner.history = history;
        tuner.refit();
        tuner.update_phase();
        tuner
    }

    /// The space this tuner searches.
    #[must_use]
    pub fn space(&self) -> &Space {
        &self.space
    }

    /// Remaining evaluation budget.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// All recorded observations, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Observation] {
        &self.history
    }

    /// The current surrogate posterior, if one could be fitted.
    #[must_use]
    pub fn surrogate(&self) -> Option<&Surrogate> {
        self.surrogate.as_ref()
    }

    /// Current RNG state, captured for persistence.
    #[must_use]
    pub fn rng_state(&self) -> u64 {
        self.rng.get_seed()
    }

    /// Worst (largest) objective recorded so far.
    #[must_use]
    pub fn worst_objective(&self) -> Option<f64> {
        self.history
            .iter()
            .map(|o| o.objective)
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
    }

    /// Proposes up to `batch` normalized vectors, capped by the remaining
    /// budget. During warm-up the vectors are prior-consistent random
    /// samples; in the modeling phase they come from the acquisition
    /// optimizer, falling back to random sampling if the surrogate is
    /// degenerate. An empty history always samples randomly, even when the
    /// configured warm-up length is zero.
    ///
    /// # Errors
    ///
    /// Propagates transform failures; a degenerate surrogate is handled
    /// internally, not surfaced.
    pub fn ask(&mut self, batch: usize) -> Result<Vec<Vec<f64>>> {
        let n = batch.min(self.remaining as usize);
        if n == 0 {
            return Ok(Vec::new());
        }
        if self.phase == Phase::Uninitialized {
            self.phase = Phase::WarmingUp;
        }

        if self.history.is_empty() || self.history.len() < self.n_initial_points {
            return self.random_batch(n);
        }

        let (x, y) = self.training_data();
        match self.acquisition.propose(&x, &y, n, &mut self.rng) {
            Ok(vectors) => Ok(vectors),
            Err(Error::DegenerateModel { .. }) => {
                trace_debug!(space_dims = self.space.len(), "degenerate surrogate, sampling randomly");
                self.random_batch(n)
            }
            Err(e) => Err(e),
        }
    }

    /// Records evaluated objectives for vectors previously returned by
    /// [`ask`](Tuner::ask), decrements the budget, and refits the surrogate
    /// from the full history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the slices disagree in
    /// length or a vector does not match the space dimensionality.
    pub fn tell(&mut self, vectors: &[Vec<f64>], objectives: &[f64]) -> Result<()> {
        if vectors.len() != objectives.len() {
            return Err(Error::DimensionMismatch {
                expected: vectors.len(),
                got: objectives.len(),
            });
        }
        for (vector, &objective) in vectors.iter().zip(objectives) {
            let params = self.space.inverse(vector)?;
            self.history.push(Observation {
                vector: vector.clone(),
                objective,
                params,
            });
        }
        #[allow(clippy::cast_possible_truncation)]
        {
            self.remaining = self.remaining.saturating_sub(vectors.len() as u32);
        }
        self.refit();
        self.update_phase();
        Ok(())
    }

    fn random_batch(&mut self, n: usize) -> Result<Vec<Vec<f64>>> {
        (0..n)
            .map(|_| {
                let assignment = self.space.sample(&mut self.rng);
                self.space.transform(&assignment)
            })
            .collect()
    }

    /// Training data for the surrogate: the most recent observations, capped.
    fn training_data(&self) -> (Vec<Vec<f64>>, Vec<f64>) {
        let start = self.history.len().saturating_sub(MAX_TRAIN_POINTS);
        let recent = &self.history[start..];
        (
            recent.iter().map(|o| o.vector.clone()).collect(),
            recent.iter().map(|o| o.objective).collect(),
        )
    }

    fn refit(&mut self) {
        let (x, y) = self.training_data();
        self.surrogate = Surrogate::fit(&x, &y, self.acquisition.noise_variance).ok();
    }

    fn update_phase(&mut self) {
        self.phase = if self.remaining == 0 {
            Phase::Exhausted
        } else if self.history.len() >= self.n_initial_points {
            Phase::Modeling
        } else if self.history.is_empty() {
            Phase::Uninitialized
        } else {
            Phase::WarmingUp
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::Dimension;

    fn one_dim_space() -> Space {
        Space::new()
            .add("x", Dimension::continuous(0.0, 1.0).unwrap())
            .unwrap()
    }

    fn tuner(weight: u32) -> Tuner {
        Tuner::new(one_dim_space(), weight, Acquisition::default(), None, 17)
    }

    fn drive(t: &mut Tuner, batch: usize) {
        let vectors = t.ask(batch).unwrap();
        let objectives: Vec<f64> = vectors.iter().map(|v| (v[0] - 0.4).powi(2)).collect();
        t.tell(&vectors, &objectives).unwrap();
    }

    #[test]
    fn phases_progress_in_order() {
        let mut t = tuner(10);
        assert_eq!(t.phase(), Phase::Uninitialized);

        drive(&mut t, 1);
        assert_eq!(t.phase(), Phase::WarmingUp);

        // d + 1 = 2 initial points for a 1-d space.
        drive(&mut t, 1);
        assert_eq!(t.phase(), Phase::Modeling);

        while t.remaining() > 0 {
            drive(&mut t, 4);
        }
        assert_eq!(t.phase(), Phase::Exhausted);
    }

    #[test]
    fn ask_respects_remaining_budget() {
        let mut t = tuner(3);
        assert_eq!(t.ask(10).unwrap().len(), 3);

        let mut t = tuner(0);
        assert_eq!(t.phase(), Phase::Exhausted);
        assert!(t.ask(5).unwrap().is_empty());
    }

    #[test]
    fn tell_decrements_budget_exactly() {
        let mut t = tuner(8);
        drive(&mut t, 3);
        assert_eq!(t.remaining(), 5);
        drive(&mut t, 3);
        assert_eq!(t.remaining(), 2);
    }

    #[test]
    fn tell_rejects_mismatched_lengths() {
        let mut t = tuner(4);
        let vectors = t.ask(2).unwrap();
        assert!(matches!(
            t.tell(&vectors, &[1.0]),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn modeling_ask_never_degenerates_after_warmup() {
        let mut t = tuner(20);
        while t.phase() != Phase::Modeling {
            drive(&mut t, 1);
        }
        // Surrogate exists and asks keep succeeding.
        assert!(t.surrogate().is_some());
        for _ in 0..3 {
            drive(&mut t, 2);
        }
        assert!(t.history().len() >= 8);
    }

    #[test]
    fn zero_warmup_first_ask_samples_randomly() {
        let mut t = Tuner::new(one_dim_space(), 10, Acquisition::default(), Some(0), 23);
        let vectors = t.ask(2).unwrap();
        assert_eq!(vectors.len(), 2);

        let objectives: Vec<f64> = vectors.iter().map(|v| (v[0] - 0.4).powi(2)).collect();
        t.tell(&vectors, &objectives).unwrap();
        assert_eq!(t.phase(), Phase::Modeling);

        // Surrogate-driven asks work from here on.
        drive(&mut t, 2);
        assert_eq!(t.history().len(), 4);
    }

    #[test]
    fn surrogate_training_set_is_capped_to_recent_history() {
        let acquisition = Acquisition {
            n_candidates: 50,
            ..Acquisition::default()
        };
        let mut t = Tuner::new(one_dim_space(), 150, acquisition, None, 29);
        while t.remaining() > 0 {
            drive(&mut t, 10);
        }

        // The full history is recorded (and persisted), but refits only see
        // the most recent window.
        assert_eq!(t.history().len(), 150);
        assert_eq!(t.surrogate().unwrap().n_train(), MAX_TRAIN_POINTS);
    }

    #[test]
    fn restored_tuner_replays_identical_asks() {
        let mut t = tuner(20);
        for _ in 0..4 {
            drive(&mut t, 1);
        }

        let mut replica = Tuner::from_parts(
            t.space().clone(),
            Acquisition::default(),
            None,
            t.remaining(),
            t.history().to_vec(),
            t.rng_state(),
        );
        assert_eq!(replica.phase(), t.phase());
        assert_eq!(t.ask(2).unwrap(), replica.ask(2).unwrap());
    }
}
