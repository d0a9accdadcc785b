//! Gaussian process surrogate over the normalized unit cube.
//!
//! The surrogate stands in for the expensive true objective. It is a GP
//! regression with a Matérn 5/2 kernel and ARD lengthscales, fitted from
//! scratch on the full observation history at every refit via Cholesky
//! decomposition. Targets are standardized to zero mean and unit variance
//! before fitting; predictions are returned in raw objective units.
//!
//! Duplicate input vectors are tolerated: the observation-noise jitter on
//! the kernel diagonal keeps the factorization positive definite, and the
//! posterior mean at a duplicated input tends to the average of the tied
//! targets as the jitter shrinks.

use nalgebra::{DMatrix, DVector, Dyn};

use crate::error::{Error, Result};

/// √5, used by the Matérn 5/2 kernel.
const SQRT_5: f64 = 2.236_067_977_499_79;

/// Minimum ARD lengthscale, keeps near-constant input columns usable.
const MIN_LENGTHSCALE: f64 = 0.01;

/// A fitted Gaussian process posterior.
#[derive(Debug)]
pub struct Surrogate {
    cholesky: nalgebra::linalg::Cholesky<f64, Dyn>,
    alpha: DVector<f64>,
    x_train: Vec<Vec<f64>>,
    lengthscales: Vec<f64>,
    y_mean: f64,
    y_std: f64,
}

impl Surrogate {
    /// Fits a GP to `(x, y)` pairs with the given diagonal jitter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateModel`] when fewer than two distinct input
    /// vectors exist (no variance to estimate) or when the kernel matrix
    /// cannot be factorized. Callers recover by sampling randomly.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(x: &[Vec<f64>], y: &[f64], noise_variance: f64) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::DimensionMismatch {
                expected: x.len(),
                got: y.len(),
            });
        }
        let n_distinct = count_distinct(x);
        if n_distinct < 2 {
            return Err(Error::DegenerateModel { n_distinct });
        }

        let n = y.len() as f64;
        let y_mean = y.iter().sum::<f64>() / n;
        let y_var = y.iter().map(|&v| (v - y_mean).powi(2)).sum::<f64>() / (n - 1.0);
        let y_std = y_var.sqrt().max(1e-10);
        let y_standardized: Vec<f64> = y.iter().map(|&v| (v - y_mean) / y_std).collect();

        let d = x[0].len();
        let lengthscales: Vec<f64> = (0..d)
            .map(|j| {
                let mean_j = x.iter().map(|row| row[j]).sum::<f64>() / n;
                let var_j = x.iter().map(|row| (row[j] - mean_j).powi(2)).sum::<f64>() / n;
                var_j.sqrt().max(MIN_LENGTHSCALE)
            })
            .collect();

        let k = DMatrix::from_fn(x.len(), x.len(), |i, j| {
            let v = matern52(&x[i], &x[j], &lengthscales);
            if i == j {
                v + noise_variance
            } else {
                v
            }
        });
        let cholesky = nalgebra::linalg::Cholesky::new(k)
            .ok_or(Error::DegenerateModel { n_distinct })?;

        let y_vec = DVector::from_column_slice(&y_standardized);
        let alpha = cholesky.solve(&y_vec);

        Ok(Self {
            cholesky,
            alpha,
            x_train: x.to_vec(),
            lengthscales,
            y_mean,
            y_std,
        })
    }

    /// Posterior `(mean, standard deviation)` at a query vector, in raw
    /// objective units.
    #[must_use]
    pub fn predict(&self, x: &[f64]) -> (f64, f64) {
        let k_star = DVector::from_fn(self.x_train.len(), |i, _| {
            matern52(x, &self.x_train[i], &self.lengthscales)
        });

        let mean = k_star.dot(&self.alpha);

        // Var: k(x*, x*) - k*^T (K + σ²I)^{-1} k*, signal variance is 1
        // because targets are standardized.
        let v = self.cholesky.solve(&k_star);
        let var = (1.0 - k_star.dot(&v)).max(0.0);

        (self.y_mean + self.y_std * mean, self.y_std * var.sqrt())
    }

    /// Number of training points the posterior was fitted on.
    #[must_use]
    pub fn n_train(&self) -> usize {
        self.x_train.len()
    }
}

/// Matérn 5/2 kernel with ARD lengthscales and unit signal variance.
///
/// `k(a, b) = (1 + √5 r + 5/3 r²) exp(-√5 r)` with
/// `r² = Σ ((a_i - b_i) / l_i)²`.
fn matern52(a: &[f64], b: &[f64], lengthscales: &[f64]) -> f64 {
    let r_sq: f64 = a
        .iter()
        .zip(b)
        .zip(lengthscales)
        .map(|((&ai, &bi), &li)| {
            let diff = (ai - bi) / li;
            diff * diff
        })
        .sum();
    let r = r_sq.sqrt();
    (1.0 + SQRT_5 * r + 5.0 / 3.0 * r_sq) * (-SQRT_5 * r).exp()
}

/// Counts distinct rows by exact comparison. Quadratic, but the training
/// set is capped well below the point where that matters.
fn count_distinct(x: &[Vec<f64>]) -> usize {
    let mut distinct = 0;
    for (i, row) in x.iter().enumerate() {
        if !x[..i].iter().any(|prev| prev == row) {
            distinct += 1;
        }
    }
    distinct
}
