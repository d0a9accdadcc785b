//! Acquisition optimization: choosing the next candidate vectors.
//!
//! The acquisition criterion is a lower confidence bound in minimization
//! framing, `lcb(x) = mean(x) − κ·std(x)`: smaller is more attractive,
//! with κ trading exploitation (small κ trusts the mean) against
//! exploration (large κ chases uncertainty). A single proposal is found by
//! multi-start random search over `[0, 1]^d`.
//!
//! Batches use the **constant liar**: after proposing a vector, a synthetic
//! observation equal to the surrogate's own mean prediction there is
//! appended to a throwaway copy of the training data, the surrogate is
//! refitted, and the next vector is proposed against the updated belief.
//! That keeps a batch from collapsing onto a single optimum. Lies never
//! reach the real history.

use crate::error::{Error, Result};
use crate::surrogate::Surrogate;

/// Default number of random candidates per proposal.
pub const DEFAULT_N_CANDIDATES: usize = 1000;

/// Default exploration weight.
pub const DEFAULT_KAPPA: f64 = 1.96;

/// Lower-confidence-bound acquisition over a fitted surrogate.
#[derive(Clone, Copy, Debug)]
pub struct Acquisition {
    /// Exploration weight κ.
    pub kappa: f64,
    /// Random candidates evaluated per proposal.
    pub n_candidates: usize,
    /// Diagonal jitter forwarded to surrogate fits.
    pub noise_variance: f64,
}

impl Acquisition {
    /// Proposes `batch` candidate vectors against the given history.
    ///
    /// Deterministic: the same RNG state and the same `(x, y)` history
    /// always produce the same batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateModel`] when the initial surrogate cannot
    /// be fitted; the caller falls back to random sampling. An empty history
    /// is rejected as an internal error — the optimizer loop must not query
    /// the acquisition before any observation exists.
    pub fn propose(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        batch: usize,
        rng: &mut fastrand::Rng,
    ) -> Result<Vec<Vec<f64>>> {
        if x.is_empty() {
            return Err(Error::Internal("acquisition queried with no observations"));
        }
        let d = x[0].len();

        // Throwaway copies: lies are appended here and discarded with them.
        let mut x_work = x.to_vec();
        let mut y_work = y.to_vec();

        let mut proposals = Vec::with_capacity(batch);
        for _ in 0..batch {
            let gp = Surrogate::fit(&x_work, &y_work, self.noise_variance)?;
            let candidate = self.minimize_lcb(&gp, d, rng);
            let (lie, _) = gp.predict(&candidate);
            x_work.push(candidate.clone());
            y_work.push(lie);
            proposals.push(candidate);
        }
        Ok(proposals)
    }

    /// Multi-start random search for the candidate minimizing the LCB.
    fn minimize_lcb(&self, gp: &Surrogate, d: usize, rng: &mut fastrand::Rng) -> Vec<f64> {
        let mut best_score = f64::INFINITY;
        let mut best = vec![0.5; d];
        for _ in 0..self.n_candidates {
            let candidate: Vec<f64> = (0..d).map(|_| rng.f64()).collect();
            let (mean, std) = gp.predict(&candidate);
            let score = mean - self.kappa * std;
            if score < best_score {
                best_score = score;
                best = candidate;
            }
        }
        best
    }
}

impl Default for Acquisition {
    fn default() -> Self {
        Self {
            kappa: DEFAULT_KAPPA,
            n_candidates: DEFAULT_N_CANDIDATES,
            noise_variance: 1e-6,
        }
    }
}
