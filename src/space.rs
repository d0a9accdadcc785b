//! Named, ordered collections of dimensions.
//!
//! A [`Space`] maps parameter names to [`Dimension`]s in insertion order and
//! provides the bidirectional transform between a human-facing
//! [`Assignment`] and the flat normalized vector the surrogate consumes.
//! The column order is fixed at construction and never changes.
//!
//! # Example
//!
//! ```
//! use hypertune::dimension::Dimension;
//! use hypertune::space::Space;
//!
//! let space = Space::new()
//!     .add("learning_rate", Dimension::log_continuous(1e-5, 1e-1).unwrap())
//!     .unwrap()
//!     .add("n_layers", Dimension::integer(1, 8).unwrap())
//!     .unwrap();
//!
//! let mut rng = fastrand::Rng::with_seed(0);
//! let assignment = space.sample(&mut rng);
//! let vector = space.transform(&assignment).unwrap();
//! assert_eq!(vector.len(), 2);
//! assert_eq!(space.inverse(&vector).unwrap(), assignment);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dimension::{Dimension, ParamValue};
use crate::error::{Error, Result};

/// A parameter assignment: one raw value per named parameter.
pub type Assignment = BTreeMap<String, ParamValue>;

/// An ordered mapping of parameter names to dimensions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Space {
    dims: Vec<(String, Dimension)>,
}

impl Space {
    /// Creates an empty space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a named dimension, preserving insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateParameter`] if the name is already taken.
    pub fn add(mut self, name: impl Into<String>, dim: Dimension) -> Result<Self> {
        let name = name.into();
        if self.dims.iter().any(|(n, _)| *n == name) {
            return Err(Error::DuplicateParameter(name));
        }
        self.dims.push((name, dim));
        Ok(self)
    }

    /// Returns the number of dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dims.len()
    }

    /// Returns `true` if the space has no dimensions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    /// Iterates over `(name, dimension)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Dimension)> {
        self.dims.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Draws a full random assignment, one value per dimension.
    #[must_use]
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Assignment {
        self.dims
            .iter()
            .map(|(name, dim)| (name.clone(), dim.sample(rng)))
            .collect()
    }

    /// Transforms an assignment into a normalized vector in `[0, 1]^d`,
    /// one column per dimension in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownParameter`] if the assignment is missing a
    /// parameter, or a per-dimension error for mismatched value kinds.
    pub fn transform(&self, assignment: &Assignment) -> Result<Vec<f64>> {
        self.dims
            .iter()
            .map(|(name, dim)| {
                let value = assignment
                    .get(name)
                    .ok_or_else(|| Error::UnknownParameter(name.clone()))?;
                dim.to_normalized(value)
            })
            .collect()
    }

    /// Inverse of [`transform`](Self::transform): maps a normalized vector
    /// back to an assignment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the vector length differs
    /// from the space dimensionality.
    pub fn inverse(&self, vector: &[f64]) -> Result<Assignment> {
        if vector.len() != self.dims.len() {
            return Err(Error::DimensionMismatch {
                expected: self.dims.len(),
                got: vector.len(),
            });
        }
        Ok(self
            .dims
            .iter()
            .zip(vector)
            .map(|((name, dim), &t)| (name.clone(), dim.from_normalized(t)))
            .collect())
    }
}
