#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Sequential model-based hyperparameter search with cross-validated
//! evaluation and resumable state.
//!
//! The crate selects hyperparameter configurations for externally supplied
//! model-training code. Evaluations are expensive (each one is a k-fold
//! cross-validation run), so a Gaussian process surrogate models the
//! objective from past observations and a lower-confidence-bound criterion
//! picks the next points to try, after a short random warm-up. Multiple
//! named search spaces can run under one [`Search`], interleaved in
//! proportion to their evaluation budgets, with batches dispatched across
//! a thread pool. The whole search state serializes to JSON and resumes
//! bit-for-bit.
//!
//! # Getting Started
//!
//! ```
//! use hypertune::{
//!     Assignment, Dimension, Estimator, FoldSource, ParamValue, Search, SearchConfig, Space,
//! };
//!
//! // The model-training side: fit/score one configuration on one fold.
//! struct Quadratic;
//!
//! impl Estimator for Quadratic {
//!     type Data = ();
//!     type Fitted = f64;
//!     type Error = String;
//!
//!     fn fit(&self, params: &Assignment, _train: &()) -> Result<f64, String> {
//!         params
//!             .get("x")
//!             .and_then(ParamValue::as_float)
//!             .ok_or_else(|| "missing 'x'".to_string())
//!     }
//!
//!     fn score(&self, fitted: &f64, _validation: &()) -> Result<f64, String> {
//!         Ok(-(fitted - 0.7).powi(2))
//!     }
//! }
//!
//! struct Folds;
//!
//! impl FoldSource for Folds {
//!     type Data = ();
//!     fn folds(&self, k: usize) -> Vec<((), ())> {
//!         vec![((), ()); k]
//!     }
//! }
//!
//! let space = Space::new().add("x", Dimension::continuous(0.0, 1.0)?)?;
//!
//! let mut search = Search::new(Quadratic, Folds, SearchConfig::new().random_state(7));
//! search.register("model", space, 20)?;
//! search.run_to_completion()?;
//!
//! let best = search.best()?;
//! assert!(best.score > -0.25);
//! # Ok::<(), hypertune::Error>(())
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Space`] | Named dimensions (continuous, integer, categorical) with uniform or log-uniform priors, mapped to and from the normalized unit cube. |
//! | [`Estimator`] / [`FoldSource`] | The external capabilities: fit/score a model from an [`Assignment`], and partition data into folds. |
//! | [`Tuner`](tuner::Tuner) | Per-space ask/tell loop: warm-up, surrogate modeling, budget exhaustion. |
//! | [`Search`] | Orchestrates many weighted spaces, parallel evaluation, the running best, and snapshots. |
//! | [`SearchSnapshot`] | Full serialized state for exact resumption. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at key search points | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod acquisition;
pub mod dimension;
mod error;
pub mod evaluate;
pub mod search;
pub mod snapshot;
pub mod space;
pub mod surrogate;
pub mod tuner;

pub use dimension::{Dimension, ParamValue, Prior};
pub use error::{Error, Result};
pub use evaluate::{CvEvaluator, Estimator, Evaluation, FoldSource};
pub use search::{BestResult, Search, SearchConfig, StepOutcome};
pub use snapshot::SearchSnapshot;
pub use space::{Assignment, Space};
pub use tuner::{Observation, Phase, Tuner};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use hypertune::prelude::*;
/// ```
pub mod prelude {
    pub use crate::dimension::{Dimension, ParamValue, Prior};
    pub use crate::error::{Error, Result};
    pub use crate::evaluate::{Estimator, Evaluation, FoldSource};
    pub use crate::search::{BestResult, Search, SearchConfig, StepOutcome};
    pub use crate::snapshot::SearchSnapshot;
    pub use crate::space::{Assignment, Space};
    pub use crate::tuner::{Observation, Phase};
}
