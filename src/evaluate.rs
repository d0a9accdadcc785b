//! Cross-validated objective evaluation.
//!
//! The engine never trains models itself. It talks to two external
//! capabilities: an [`Estimator`] that can configure, fit, and score a
//! model from a parameter assignment, and a [`FoldSource`] that partitions
//! a dataset into train/validation folds. [`CvEvaluator`] composes the two
//! into "assignment in, scalar score out".
//!
//! Scores follow the convention *higher is better*; the search core
//! minimizes, so the recorded objective is the negated mean score. That
//! negation happens in the orchestrator, keeping this module free of sign
//! conventions.

use crate::error::{Error, Result};
use crate::space::Assignment;

/// External estimator capability.
///
/// Implementations configure a fresh model instance per call from the
/// assignment — evaluations running on different workers must not share
/// mutable state. Categorical assignment values are choice indices; what a
/// choice means (including nested, pre-configured model instances used as
/// discrete labels) is entirely the implementation's business.
pub trait Estimator: Send + Sync {
    /// One data partition (a train or validation fold).
    type Data;
    /// Opaque fitted-model handle.
    type Fitted: Send;
    /// Error raised by fitting or scoring.
    type Error: ToString;

    /// Configures an instance from `params` and fits it on `train`.
    ///
    /// # Errors
    ///
    /// Any fit-time failure, including invalid parameter combinations for
    /// a chosen categorical branch.
    fn fit(
        &self,
        params: &Assignment,
        train: &Self::Data,
    ) -> core::result::Result<Self::Fitted, Self::Error>;

    /// Scores a fitted model on a validation fold. Higher is better.
    ///
    /// # Errors
    ///
    /// Any scoring-time failure.
    fn score(
        &self,
        fitted: &Self::Fitted,
        validation: &Self::Data,
    ) -> core::result::Result<f64, Self::Error>;
}

/// External fold-partitioning capability.
///
/// How folds are constructed (stratified, random, time-ordered) is the
/// implementation's choice; the engine only iterates the partitions.
pub trait FoldSource: Send + Sync {
    /// One data partition.
    type Data;

    /// Yields `k` `(train, validation)` partitions.
    fn folds(&self, k: usize) -> Vec<(Self::Data, Self::Data)>;
}

/// The result of evaluating one assignment.
#[derive(Debug)]
pub struct Evaluation<M> {
    /// Mean validation score across folds (higher is better).
    pub mean_score: f64,
    /// Per-fold validation scores, in fold order.
    pub fold_scores: Vec<f64>,
    /// Fitted handle from the last fold.
    pub fitted: M,
}

/// k-fold cross-validation evaluator over an estimator and a fold source.
pub struct CvEvaluator<E, F> {
    estimator: E,
    folds: F,
    k: usize,
}

impl<E, F> CvEvaluator<E, F>
where
    E: Estimator,
    F: FoldSource<Data = E::Data>,
{
    /// Creates an evaluator running `k`-fold cross-validation.
    pub fn new(estimator: E, folds: F, k: usize) -> Self {
        Self {
            estimator,
            folds,
            k,
        }
    }

    /// Evaluates one assignment: fit and score on every fold, average.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EvaluationFailed`] if the fold source yields no
    /// partitions or any fold's fit/score raises. The failure is isolated
    /// to this assignment; callers continue the batch.
    #[allow(clippy::cast_precision_loss)]
    pub fn evaluate(&self, params: &Assignment) -> Result<Evaluation<E::Fitted>> {
        let partitions = self.folds.folds(self.k);
        if partitions.is_empty() {
            return Err(Error::EvaluationFailed {
                cause: "fold source produced no partitions".to_string(),
            });
        }

        let mut fold_scores = Vec::with_capacity(partitions.len());
        let mut last_fitted = None;
        for (train, validation) in &partitions {
            let fitted = self
                .estimator
                .fit(params, train)
                .map_err(|e| Error::EvaluationFailed {
                    cause: e.to_string(),
                })?;
            let score =
                self.estimator
                    .score(&fitted, validation)
                    .map_err(|e| Error::EvaluationFailed {
                        cause: e.to_string(),
                    })?;
            fold_scores.push(score);
            last_fitted = Some(fitted);
        }

        let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
        let fitted = last_fitted.ok_or(Error::Internal("no fold produced a fitted model"))?;
        Ok(Evaluation {
            mean_score,
            fold_scores,
            fitted,
        })
    }
}
