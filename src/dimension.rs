//! Parameter domains and their normalized-space transforms.
//!
//! A [`Dimension`] describes a single parameter's domain: a bounded
//! continuous range, a bounded integer range, or a categorical choice set.
//! Numeric dimensions carry a [`Prior`] that controls how the domain maps
//! into the unit interval the surrogate model operates on. All constructors
//! validate their arguments; a dimension is immutable once built.
//!
//! # Example
//!
//! ```
//! use hypertune::dimension::{Dimension, ParamValue};
//!
//! let lr = Dimension::log_continuous(1e-5, 1e-1).unwrap();
//! let t = lr.to_normalized(&ParamValue::Float(1e-3)).unwrap();
//! assert!((0.0..=1.0).contains(&t));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A sampled parameter value.
///
/// Categorical values are stored as a stable index into the category set.
/// The index is an opaque handle: the engine never inspects what a category
/// means, it only routes the index back to the estimator capability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// A floating-point parameter value.
    Float(f64),
    /// An integer parameter value.
    Int(i64),
    /// A categorical parameter value, stored as a choice index.
    Categorical(usize),
}

impl ParamValue {
    /// Returns the inner float, if this is a `Float` value.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the inner integer, if this is an `Int` value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the choice index, if this is a `Categorical` value.
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Categorical(i) => Some(*i),
            _ => None,
        }
    }
}

/// Sampling prior for numeric dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prior {
    /// Uniform over the raw bounds.
    Uniform,
    /// Uniform over the logarithm of the bounds (`ln` forward, `exp` inverse).
    LogUniform,
}

/// A single parameter's domain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Dimension {
    /// A bounded continuous range.
    Continuous {
        /// Lower bound (inclusive).
        low: f64,
        /// Upper bound (inclusive).
        high: f64,
        /// Sampling prior.
        prior: Prior,
    },
    /// A bounded integer range.
    Integer {
        /// Lower bound (inclusive).
        low: i64,
        /// Upper bound (inclusive).
        high: i64,
        /// Sampling prior.
        prior: Prior,
    },
    /// A categorical choice set, identified only by its size.
    Categorical {
        /// Number of choices. Choices themselves live with the caller.
        n_choices: usize,
    },
}

impl Dimension {
    /// Creates a continuous dimension with a uniform prior.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] unless `low < high` and both
    /// bounds are finite.
    pub fn continuous(low: f64, high: f64) -> Result<Self> {
        validate_continuous(low, high, Prior::Uniform)?;
        Ok(Self::Continuous {
            low,
            high,
            prior: Prior::Uniform,
        })
    }

    /// Creates a continuous dimension with a log-uniform prior.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] unless `0 < low < high` and both
    /// bounds are finite.
    pub fn log_continuous(low: f64, high: f64) -> Result<Self> {
        validate_continuous(low, high, Prior::LogUniform)?;
        Ok(Self::Continuous {
            low,
            high,
            prior: Prior::LogUniform,
        })
    }

    /// Creates an integer dimension with a uniform prior.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] unless `low < high`.
    pub fn integer(low: i64, high: i64) -> Result<Self> {
        validate_integer(low, high, Prior::Uniform)?;
        Ok(Self::Integer {
            low,
            high,
            prior: Prior::Uniform,
        })
    }

    /// Creates an integer dimension with a log-uniform prior.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] unless `1 <= low < high`.
    pub fn log_integer(low: i64, high: i64) -> Result<Self> {
        validate_integer(low, high, Prior::LogUniform)?;
        Ok(Self::Integer {
            low,
            high,
            prior: Prior::LogUniform,
        })
    }

    /// Creates a categorical dimension with `n_choices` choices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] if `n_choices` is zero.
    pub fn categorical(n_choices: usize) -> Result<Self> {
        if n_choices == 0 {
            return Err(Error::InvalidDimension {
                reason: "category set must be non-empty".to_string(),
            });
        }
        Ok(Self::Categorical { n_choices })
    }

    /// Draws a value consistent with the dimension's prior.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn sample(&self, rng: &mut fastrand::Rng) -> ParamValue {
        match *self {
            Self::Continuous { low, high, prior } => {
                let (lo, hi) = internal_span(low, high, prior);
                let v = apply_inverse(uniform_in(rng, lo, hi), prior);
                ParamValue::Float(v.clamp(low, high))
            }
            Self::Integer { low, high, prior } => match prior {
                Prior::Uniform => ParamValue::Int(rng.i64(low..=high)),
                Prior::LogUniform => {
                    let (lo, hi) = internal_span(low as f64, high as f64, prior);
                    let v = apply_inverse(uniform_in(rng, lo, hi), prior);
                    ParamValue::Int(round_half_up(v).clamp(low, high))
                }
            },
            Self::Categorical { n_choices } => ParamValue::Categorical(rng.usize(0..n_choices)),
        }
    }

    /// Maps a raw value into `[0, 1]` via the prior's forward transform and
    /// min-max scaling. Categorical index `i` maps to `(i + 0.5) / n`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value's variant does not match the dimension
    /// kind, or a categorical index is out of range.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_normalized(&self, value: &ParamValue) -> Result<f64> {
        match (self, value) {
            (&Self::Continuous { low, high, prior }, ParamValue::Float(v)) => {
                let (lo, hi) = internal_span(low, high, prior);
                Ok(((apply_forward(*v, prior) - lo) / (hi - lo)).clamp(0.0, 1.0))
            }
            (&Self::Integer { low, high, prior }, ParamValue::Int(v)) => {
                let (lo, hi) = internal_span(low as f64, high as f64, prior);
                Ok(((apply_forward(*v as f64, prior) - lo) / (hi - lo)).clamp(0.0, 1.0))
            }
            (&Self::Categorical { n_choices }, ParamValue::Categorical(i)) => {
                if *i >= n_choices {
                    return Err(Error::Internal("categorical index out of range"));
                }
                Ok((*i as f64 + 0.5) / n_choices as f64)
            }
            _ => Err(Error::Internal("value variant does not match dimension kind")),
        }
    }

    /// Maps a normalized value in `[0, 1]` back to a raw value.
    ///
    /// Integer results are rounded **half-up** (`floor(v + 0.5)`, ties round
    /// toward positive infinity) and clamped to the bounds. Categorical
    /// results are `floor(t * n)`, clamped to the last choice.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_normalized(&self, t: f64) -> ParamValue {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Self::Continuous { low, high, prior } => {
                let (lo, hi) = internal_span(low, high, prior);
                let v = apply_inverse(lo + t * (hi - lo), prior);
                ParamValue::Float(v.clamp(low, high))
            }
            Self::Integer { low, high, prior } => {
                let (lo, hi) = internal_span(low as f64, high as f64, prior);
                let v = apply_inverse(lo + t * (hi - lo), prior);
                ParamValue::Int(round_half_up(v).clamp(low, high))
            }
            Self::Categorical { n_choices } => {
                let i = (t * n_choices as f64).floor() as usize;
                ParamValue::Categorical(i.min(n_choices - 1))
            }
        }
    }
}

fn validate_continuous(low: f64, high: f64, prior: Prior) -> Result<()> {
    if !low.is_finite() || !high.is_finite() {
        return Err(Error::InvalidDimension {
            reason: format!("bounds must be finite, got [{low}, {high}]"),
        });
    }
    if low >= high {
        return Err(Error::InvalidDimension {
            reason: format!("low ({low}) must be strictly less than high ({high})"),
        });
    }
    if prior == Prior::LogUniform && low <= 0.0 {
        return Err(Error::InvalidDimension {
            reason: format!("log-uniform prior requires positive bounds, got low = {low}"),
        });
    }
    Ok(())
}

fn validate_integer(low: i64, high: i64, prior: Prior) -> Result<()> {
    if low >= high {
        return Err(Error::InvalidDimension {
            reason: format!("low ({low}) must be strictly less than high ({high})"),
        });
    }
    if prior == Prior::LogUniform && low < 1 {
        return Err(Error::InvalidDimension {
            reason: format!("log-uniform prior requires low >= 1, got {low}"),
        });
    }
    Ok(())
}

/// Uniform draw over an arbitrary internal-space interval.
fn uniform_in(rng: &mut fastrand::Rng, lo: f64, hi: f64) -> f64 {
    lo + rng.f64() * (hi - lo)
}

/// Internal-space bounds under the given prior.
fn internal_span(low: f64, high: f64, prior: Prior) -> (f64, f64) {
    match prior {
        Prior::Uniform => (low, high),
        Prior::LogUniform => (low.ln(), high.ln()),
    }
}

/// Forward transform: raw value into internal space.
fn apply_forward(v: f64, prior: Prior) -> f64 {
    match prior {
        Prior::Uniform => v,
        Prior::LogUniform => v.ln(),
    }
}

/// Inverse transform: internal-space value back to raw.
fn apply_inverse(v: f64, prior: Prior) -> f64 {
    match prior {
        Prior::Uniform => v,
        Prior::LogUniform => v.exp(),
    }
}

/// Round half-up: ties go toward positive infinity.
#[allow(clippy::cast_possible_truncation)]
fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuous_rejects_inverted_bounds() {
        assert!(matches!(
            Dimension::continuous(1.0, 0.0),
            Err(Error::InvalidDimension { .. })
        ));
        assert!(matches!(
            Dimension::continuous(1.0, 1.0),
            Err(Error::InvalidDimension { .. })
        ));
    }

    #[test]
    fn log_continuous_rejects_non_positive_low() {
        assert!(Dimension::log_continuous(0.0, 1.0).is_err());
        assert!(Dimension::log_continuous(-1.0, 1.0).is_err());
        assert!(Dimension::log_continuous(1e-6, 1e6).is_ok());
    }

    #[test]
    fn integer_rejects_inverted_bounds() {
        assert!(Dimension::integer(10, 1).is_err());
        assert!(Dimension::integer(5, 5).is_err());
        assert!(Dimension::log_integer(0, 10).is_err());
    }

    #[test]
    fn categorical_rejects_empty() {
        assert!(Dimension::categorical(0).is_err());
        assert!(Dimension::categorical(1).is_ok());
    }

    #[test]
    fn sample_stays_in_bounds() {
        let mut rng = fastrand::Rng::with_seed(7);
        let dim = Dimension::log_continuous(1e-4, 1e2).unwrap();
        for _ in 0..200 {
            let v = dim.sample(&mut rng).as_float().unwrap();
            assert!((1e-4..=1e2).contains(&v), "sample {v} out of bounds");
        }
        let dim = Dimension::integer(-3, 12).unwrap();
        for _ in 0..200 {
            let v = dim.sample(&mut rng).as_int().unwrap();
            assert!((-3..=12).contains(&v));
        }
    }

    #[test]
    fn integer_round_trip_is_exact() {
        let dim = Dimension::integer(-5, 17).unwrap();
        for v in -5..=17 {
            let t = dim.to_normalized(&ParamValue::Int(v)).unwrap();
            assert_eq!(dim.from_normalized(t), ParamValue::Int(v));
        }
    }

    #[test]
    fn log_integer_round_trip_is_exact() {
        let dim = Dimension::log_integer(1, 1024).unwrap();
        for v in [1, 2, 3, 7, 64, 100, 999, 1024] {
            let t = dim.to_normalized(&ParamValue::Int(v)).unwrap();
            assert_eq!(dim.from_normalized(t), ParamValue::Int(v));
        }
    }

    #[test]
    fn categorical_round_trip_is_exact() {
        let dim = Dimension::categorical(7).unwrap();
        for i in 0..7 {
            let t = dim.to_normalized(&ParamValue::Categorical(i)).unwrap();
            assert_eq!(dim.from_normalized(t), ParamValue::Categorical(i));
        }
    }

    #[test]
    fn continuous_round_trip_within_tolerance() {
        let dim = Dimension::log_continuous(1e-6, 1e6).unwrap();
        for v in [1e-6, 3.7e-3, 1.0, 42.0, 9.9e5] {
            let t = dim.to_normalized(&ParamValue::Float(v)).unwrap();
            let back = dim.from_normalized(t).as_float().unwrap();
            assert!((back - v).abs() / v < 1e-9, "{back} vs {v}");
        }
    }

    #[test]
    fn rounding_ties_go_up() {
        // [0, 10] uniform: t = 0.25 lands exactly on 2.5 and must round to 3.
        let dim = Dimension::integer(0, 10).unwrap();
        assert_eq!(dim.from_normalized(0.25), ParamValue::Int(3));
        // Negative midpoint: -2.5 rounds toward positive infinity, i.e. -2.
        let dim = Dimension::integer(-10, 0).unwrap();
        assert_eq!(dim.from_normalized(0.75), ParamValue::Int(-2));
    }

    #[test]
    fn from_normalized_clamps() {
        let dim = Dimension::continuous(0.0, 1.0).unwrap();
        assert_eq!(dim.from_normalized(-0.5), ParamValue::Float(0.0));
        assert_eq!(dim.from_normalized(1.5), ParamValue::Float(1.0));
        let dim = Dimension::categorical(3).unwrap();
        assert_eq!(dim.from_normalized(1.0), ParamValue::Categorical(2));
    }

    #[test]
    fn to_normalized_rejects_mismatched_variant() {
        let dim = Dimension::continuous(0.0, 1.0).unwrap();
        assert!(dim.to_normalized(&ParamValue::Int(1)).is_err());
        let dim = Dimension::categorical(2).unwrap();
        assert!(dim.to_normalized(&ParamValue::Categorical(5)).is_err());
    }
}
