//! The search orchestrator: many weighted spaces, one worker pool.
//!
//! A [`Search`] owns one [`Tuner`] per registered space plus a weight (the
//! space's evaluation budget) and drives them incrementally. Each
//! [`step`](Search::step) picks a space — the one with the largest
//! remaining-weight fraction, so bigger budgets get proportionally more
//! steps — asks for a batch, evaluates it on rayon's worker pool, tells
//! the results back, and updates the global best. Steps are pure
//! increments: the orchestrator can be snapshotted between any two of
//! them and resumed elsewhere.

use rayon::prelude::*;

use crate::acquisition::{Acquisition, DEFAULT_KAPPA, DEFAULT_N_CANDIDATES};
use crate::error::{Error, Result};
use crate::evaluate::{CvEvaluator, Estimator, Evaluation, FoldSource};
use crate::snapshot::{EntrySnapshot, SearchSnapshot, SNAPSHOT_VERSION};
use crate::space::{Assignment, Space};
use crate::tuner::Tuner;

/// Tuning knobs for a search run.
///
/// # Example
///
/// ```
/// use hypertune::search::SearchConfig;
///
/// let config = SearchConfig::new()
///     .n_initial_points(4)
///     .kappa(2.5)
///     .n_jobs(4)
///     .cv_folds(3)
///     .random_state(42);
/// ```
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Warm-up length before surrogate-driven proposals; `None` means
    /// `d + 1` per space.
    pub n_initial_points: Option<usize>,
    /// Exploration weight of the acquisition criterion.
    pub kappa: f64,
    /// Evaluation parallelism; also the per-step batch size.
    pub n_jobs: usize,
    /// Cross-validation fold count.
    pub cv_folds: usize,
    /// Seed for all randomness; `None` draws one from entropy.
    pub random_state: Option<u64>,
    /// Random candidates per acquisition proposal.
    pub n_candidates: usize,
    /// Observation-noise jitter on the surrogate's kernel diagonal.
    pub noise_variance: f64,
}

impl SearchConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the warm-up length.
    #[must_use]
    pub fn n_initial_points(mut self, n: usize) -> Self {
        self.n_initial_points = Some(n);
        self
    }

    /// Sets the exploration weight κ.
    #[must_use]
    pub fn kappa(mut self, kappa: f64) -> Self {
        self.kappa = kappa;
        self
    }

    /// Sets evaluation parallelism (and per-step batch size).
    #[must_use]
    pub fn n_jobs(mut self, n: usize) -> Self {
        self.n_jobs = n.max(1);
        self
    }

    /// Sets the cross-validation fold count.
    #[must_use]
    pub fn cv_folds(mut self, k: usize) -> Self {
        self.cv_folds = k.max(1);
        self
    }

    /// Fixes the random seed for reproducibility.
    #[must_use]
    pub fn random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Sets the number of random candidates per acquisition proposal.
    #[must_use]
    pub fn n_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n.max(1);
        self
    }

    /// Sets the surrogate's diagonal jitter.
    #[must_use]
    pub fn noise_variance(mut self, v: f64) -> Self {
        self.noise_variance = v;
        self
    }

    fn acquisition(&self) -> Acquisition {
        Acquisition {
            kappa: self.kappa,
            n_candidates: self.n_candidates,
            noise_variance: self.noise_variance,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_initial_points: None,
            kappa: DEFAULT_KAPPA,
            n_jobs: 1,
            cv_folds: 5,
            random_state: None,
            n_candidates: DEFAULT_N_CANDIDATES,
            noise_variance: 1e-6,
        }
    }
}

/// The best successful evaluation seen so far.
///
/// `score` is the cross-validation score (higher is better) and is
/// monotone non-decreasing over a run. `fitted` is `None` only after a
/// snapshot restore, until a new evaluation improves on the restored best.
pub struct BestResult<M> {
    /// Best mean cross-validation score.
    pub score: f64,
    /// The assignment that achieved it.
    pub params: Assignment,
    /// Opaque fitted-model handle from that evaluation.
    pub fitted: Option<M>,
}

/// One registered space with its budget and tuner.
pub struct SearchEntry {
    name: String,
    weight_total: u32,
    tuner: Tuner,
}

impl SearchEntry {
    /// The space's registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The budget the space was registered with.
    #[must_use]
    pub fn weight_total(&self) -> u32 {
        self.weight_total
    }

    /// The tuner driving this space.
    #[must_use]
    pub fn tuner(&self) -> &Tuner {
        &self.tuner
    }

    fn weight_fraction(&self) -> f64 {
        if self.weight_total == 0 {
            0.0
        } else {
            f64::from(self.tuner.remaining()) / f64::from(self.weight_total)
        }
    }
}

/// Diagnostics for one `step` call.
#[derive(Debug)]
pub struct StepOutcome {
    /// The space that was stepped, if any had budget left.
    pub space: Option<String>,
    /// Number of points evaluated this step.
    pub evaluated: usize,
    /// Assignments whose evaluation failed, with the stringified cause.
    pub failures: Vec<(Assignment, String)>,
    /// Whether the global best improved this step.
    pub improved: bool,
}

impl StepOutcome {
    /// `true` when the step evaluated nothing (all budgets drained, or the
    /// named space is already exhausted).
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.evaluated == 0
    }

    fn noop(space: Option<String>) -> Self {
        Self {
            space,
            evaluated: 0,
            failures: Vec::new(),
            improved: false,
        }
    }
}

/// Orchestrates incremental, resumable search over registered spaces.
pub struct Search<E, F>
where
    E: Estimator,
    F: FoldSource<Data = E::Data>,
{
    evaluator: CvEvaluator<E, F>,
    entries: Vec<SearchEntry>,
    best: Option<BestResult<E::Fitted>>,
    config: SearchConfig,
    base_seed: u64,
}

impl<E, F> Search<E, F>
where
    E: Estimator,
    F: FoldSource<Data = E::Data>,
{
    /// Creates a search over the given collaborators.
    #[must_use]
    pub fn new(estimator: E, folds: F, config: SearchConfig) -> Self {
        let base_seed = config.random_state.unwrap_or_else(|| fastrand::u64(..));
        let evaluator = CvEvaluator::new(estimator, folds, config.cv_folds);
        Self {
            evaluator,
            entries: Vec::new(),
            best: None,
            config,
            base_seed,
        }
    }

    /// Registers a named space with `weight` evaluations of budget.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateSpace`] if the name is already registered.
    pub fn register(&mut self, name: impl Into<String>, space: Space, weight: u32) -> Result<()> {
        let name = name.into();
        if self.entries.iter().any(|e| e.name == name) {
            return Err(Error::DuplicateSpace(name));
        }
        let seed = entry_seed(self.base_seed, self.entries.len());
        let tuner = Tuner::new(
            space,
            weight,
            self.config.acquisition(),
            self.config.n_initial_points,
            seed,
        );
        self.entries.push(SearchEntry {
            name,
            weight_total: weight,
            tuner,
        });
        Ok(())
    }

    /// Registered entries, in registration order.
    #[must_use]
    pub fn entries(&self) -> &[SearchEntry] {
        &self.entries
    }

    /// Sum of remaining budgets across all spaces.
    #[must_use]
    pub fn remaining_total(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| u64::from(e.tuner.remaining()))
            .sum()
    }

    /// The best successful evaluation so far.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoEvaluations`] before the first success.
    pub fn best(&self) -> Result<&BestResult<E::Fitted>> {
        self.best.as_ref().ok_or(Error::NoEvaluations)
    }

    /// Runs one incremental unit of search.
    ///
    /// Picks `name` if given (a drained named space yields a no-op
    /// outcome), otherwise the space with the largest remaining-weight
    /// fraction. Asks for `min(n_jobs, remaining)` points, evaluates them
    /// concurrently, records the results, and updates the best. Failed
    /// evaluations are recorded with the worst objective seen so far in
    /// that space and never enter the best result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSpace`] for an unregistered name; transform
    /// failures propagate. Per-candidate evaluation failures do **not**
    /// error — they are reported in the outcome's `failures`.
    pub fn step(&mut self, name: Option<&str>) -> Result<StepOutcome> {
        let idx = match name {
            Some(n) => {
                let idx = self
                    .entries
                    .iter()
                    .position(|e| e.name == n)
                    .ok_or_else(|| Error::UnknownSpace(n.to_string()))?;
                if self.entries[idx].tuner.remaining() == 0 {
                    return Ok(StepOutcome::noop(Some(n.to_string())));
                }
                idx
            }
            None => match self.pick() {
                Some(idx) => idx,
                None => return Ok(StepOutcome::noop(None)),
            },
        };

        let batch = self.config.n_jobs.max(1);
        let (vectors, assignments) = {
            let entry = &mut self.entries[idx];
            let vectors = entry.tuner.ask(batch)?;
            let assignments: Vec<Assignment> = vectors
                .iter()
                .map(|v| entry.tuner.space().inverse(v))
                .collect::<Result<_>>()?;
            (vectors, assignments)
        };
        if vectors.is_empty() {
            return Ok(StepOutcome::noop(Some(self.entries[idx].name.clone())));
        }

        // Fan the batch out over the worker pool; result order matches the
        // batch so vectors and objectives stay aligned for `tell`.
        let evaluator = &self.evaluator;
        let results: Vec<Result<Evaluation<E::Fitted>>> = assignments
            .par_iter()
            .map(|params| evaluator.evaluate(params))
            .collect();

        // Worst-case objective substituted for failed points: the worst
        // finite objective known for this space. Recording infinity would
        // poison the surrogate's target standardization.
        let mut worst = self.entries[idx]
            .tuner
            .worst_objective()
            .unwrap_or(f64::NEG_INFINITY);
        for result in &results {
            if let Ok(evaluation) = result {
                worst = worst.max(-evaluation.mean_score);
            }
        }
        if !worst.is_finite() {
            worst = 0.0;
        }

        let mut objectives = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        let mut improved = false;
        for (params, result) in assignments.iter().zip(results) {
            match result {
                Ok(evaluation) => {
                    objectives.push(-evaluation.mean_score);
                    let better = self
                        .best
                        .as_ref()
                        .is_none_or(|b| evaluation.mean_score > b.score);
                    if better {
                        self.best = Some(BestResult {
                            score: evaluation.mean_score,
                            params: params.clone(),
                            fitted: Some(evaluation.fitted),
                        });
                        improved = true;
                    }
                }
                Err(e) => {
                    trace_debug!(cause = %e, "evaluation failed, recording worst-case objective");
                    failures.push((params.clone(), e.to_string()));
                    objectives.push(worst);
                }
            }
        }

        let entry = &mut self.entries[idx];
        entry.tuner.tell(&vectors, &objectives)?;
        trace_info!(
            space = %entry.name,
            evaluated = vectors.len(),
            remaining = entry.tuner.remaining(),
            improved,
            "step complete"
        );

        Ok(StepOutcome {
            space: Some(entry.name.clone()),
            evaluated: vectors.len(),
            failures,
            improved,
        })
    }

    /// Steps until every space's weight reaches zero.
    ///
    /// # Errors
    ///
    /// Propagates the first failing `step`.
    pub fn run_to_completion(&mut self) -> Result<()> {
        while self.remaining_total() > 0 {
            self.step(None)?;
        }
        Ok(())
    }

    /// Captures the full resumable state: spaces, weights, histories, RNG
    /// states, and the best score/params.
    #[must_use]
    pub fn snapshot(&self) -> SearchSnapshot {
        SearchSnapshot {
            version: SNAPSHOT_VERSION,
            base_seed: self.base_seed,
            entries: self
                .entries
                .iter()
                .map(|e| EntrySnapshot {
                    name: e.name.clone(),
                    space: e.tuner.space().clone(),
                    weight_total: e.weight_total,
                    weight_remaining: e.tuner.remaining(),
                    rng_state: e.tuner.rng_state(),
                    observations: e.tuner.history().to_vec(),
                })
                .collect(),
            best_score: self.best.as_ref().map(|b| b.score),
            best_params: self.best.as_ref().map(|b| b.params.clone()),
        }
    }

    /// Restores a snapshot into this search.
    ///
    /// The currently registered spaces must match the snapshot exactly
    /// (names, definitions, total weights, order). After a successful
    /// restore, `ask` sequences continue bit-for-bit from the captured
    /// point. The restored best carries no fitted handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResumeMismatch`] on any disagreement between the
    /// snapshot and the registered spaces.
    pub fn restore(&mut self, snapshot: SearchSnapshot) -> Result<()> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::ResumeMismatch {
                reason: format!(
                    "snapshot version {} is not supported (expected {SNAPSHOT_VERSION})",
                    snapshot.version
                ),
            });
        }
        if snapshot.entries.len() != self.entries.len() {
            return Err(Error::ResumeMismatch {
                reason: format!(
                    "snapshot has {} space(s), {} registered",
                    snapshot.entries.len(),
                    self.entries.len()
                ),
            });
        }
        for (entry, snap) in self.entries.iter().zip(&snapshot.entries) {
            if entry.name != snap.name {
                return Err(Error::ResumeMismatch {
                    reason: format!(
                        "space name mismatch: registered '{}', snapshot '{}'",
                        entry.name, snap.name
                    ),
                });
            }
            if *entry.tuner.space() != snap.space {
                return Err(Error::ResumeMismatch {
                    reason: format!("space '{}' definition changed", entry.name),
                });
            }
            if entry.weight_total != snap.weight_total {
                return Err(Error::ResumeMismatch {
                    reason: format!("space '{}' total weight changed", entry.name),
                });
            }
        }

        for (entry, snap) in self.entries.iter_mut().zip(snapshot.entries) {
            entry.tuner = Tuner::from_parts(
                snap.space,
                self.config.acquisition(),
                self.config.n_initial_points,
                snap.weight_remaining,
                snap.observations,
                snap.rng_state,
            );
        }
        self.base_seed = snapshot.base_seed;
        self.best = match (snapshot.best_score, snapshot.best_params) {
            (Some(score), Some(params)) => Some(BestResult {
                score,
                params,
                fitted: None,
            }),
            _ => None,
        };
        Ok(())
    }

    /// Proportional scheduler: the non-drained entry with the largest
    /// remaining-weight fraction. Ties resolve to the later registrant.
    fn pick(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.tuner.remaining() > 0)
            .max_by(|(_, a), (_, b)| {
                a.weight_fraction()
                    .partial_cmp(&b.weight_fraction())
                    .unwrap_or(core::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
    }
}

/// Per-entry RNG seed derived from the base seed and registration index.
fn entry_seed(base: u64, index: usize) -> u64 {
    base ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
