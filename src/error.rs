#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a dimension is constructed with malformed bounds or
    /// an empty category set. Fatal, never retried.
    #[error("invalid dimension: {reason}")]
    InvalidDimension {
        /// What was wrong with the requested domain.
        reason: String,
    },

    /// Returned when a space already contains a parameter with this name.
    #[error("duplicate parameter name '{0}' in space")]
    DuplicateParameter(String),

    /// Returned when an assignment is missing a parameter the space defines.
    #[error("assignment is missing parameter '{0}'")]
    UnknownParameter(String),

    /// Returned when a vector's length does not match the space dimensionality,
    /// or when `tell` receives mismatched vector/objective counts.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// The expected length.
        expected: usize,
        /// The actual length.
        got: usize,
    },

    /// Returned when the surrogate cannot be fitted from the current history
    /// (fewer than two distinct vectors, or a failed factorization). Callers
    /// recover by sampling randomly for that ask.
    #[error("degenerate surrogate model: {n_distinct} distinct observation(s)")]
    DegenerateModel {
        /// Number of distinct input vectors available at fit time.
        n_distinct: usize,
    },

    /// Returned when a single candidate's cross-validation raised. Isolated
    /// per point; the search records a worst-case objective and continues.
    #[error("evaluation failed: {cause}")]
    EvaluationFailed {
        /// The underlying estimator/fold error, stringified.
        cause: String,
    },

    /// Returned when a search space name is registered twice.
    #[error("search space '{0}' is already registered")]
    DuplicateSpace(String),

    /// Returned when `step` names a space that was never registered.
    #[error("unknown search space '{0}'")]
    UnknownSpace(String),

    /// Returned when a restored snapshot does not match the currently
    /// registered spaces. Fatal: resuming against a changed space would
    /// silently corrupt the search.
    #[error("resume mismatch: {reason}")]
    ResumeMismatch {
        /// Why the snapshot was rejected.
        reason: String,
    },

    /// Returned when requesting the best result before any successful evaluation.
    #[error("no successful evaluations recorded")]
    NoEvaluations,

    /// Returned when saving or loading a snapshot fails at the I/O or JSON layer.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;
