//! params — named constrained parameters and their flat optimizer layout.
//!
//! Purpose
//! -------
//! Represent the model-space parameter set handed to a dynamics provider as a
//! mapping from names to scalars, vectors or matrices ([`ParamSet`]), and
//! describe the identity flattening between that mapping and the
//! optimizer's unconstrained vector `θ` ([`ParamLayout`]).
//!
//! Key behaviors
//! -------------
//! - Typed accessors (`scalar`, `vector`, `matrix`) that fail with
//!   `MissingParameter` / `ParameterKindMismatch` instead of panicking.
//! - `ParamLayout::of` records names (sorted, via `BTreeMap` order) and
//!   shapes; `flatten` writes values in that order (arrays row-major) and
//!   `unflatten` reverses it.
//!
//! Invariants & assumptions
//! ------------------------
//! - A parameter set carries fitted quantities only. Exogenous data such as
//!   covariate panels are passed separately through `StepContext`.
//! - `unflatten(flatten(x)) == x` for any set with the layout's names and
//!   shapes.
use crate::{
    kalman::errors::{KalmanError, KalmanResult},
    optimization::loglik_optimizer::Theta,
};
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;

/// A single named parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Scalar(f64),
    Vector(Array1<f64>),
    Matrix(Array2<f64>),
}

impl ParamValue {
    /// Number of scalar entries.
    pub fn len(&self) -> usize {
        match self {
            ParamValue::Scalar(_) => 1,
            ParamValue::Vector(v) => v.len(),
            ParamValue::Matrix(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shape(&self) -> ParamShape {
        match self {
            ParamValue::Scalar(_) => ParamShape::Scalar,
            ParamValue::Vector(v) => ParamShape::Vector(v.len()),
            ParamValue::Matrix(m) => ParamShape::Matrix(m.nrows(), m.ncols()),
        }
    }
}

/// Named constrained parameters of a state-space model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    values: BTreeMap<String, ParamValue>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    /// Builder-style scalar insert.
    pub fn with_scalar(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, ParamValue::Scalar(value));
        self
    }

    /// Builder-style vector insert.
    pub fn with_vector(mut self, name: impl Into<String>, value: Array1<f64>) -> Self {
        self.insert(name, ParamValue::Vector(value));
        self
    }

    /// Builder-style matrix insert.
    pub fn with_matrix(mut self, name: impl Into<String>, value: Array2<f64>) -> Self {
        self.insert(name, ParamValue::Matrix(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names in layout order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Total number of scalar entries across all values.
    pub fn n_values(&self) -> usize {
        self.values.values().map(ParamValue::len).sum()
    }

    /// Fetch a scalar parameter.
    ///
    /// # Errors
    /// - `MissingParameter` if absent; `ParameterKindMismatch` if not a scalar.
    pub fn scalar(&self, name: &str) -> KalmanResult<f64> {
        match self.require(name)? {
            ParamValue::Scalar(v) => Ok(*v),
            _ => Err(kind_mismatch(name, "scalar")),
        }
    }

    /// Fetch a vector parameter.
    pub fn vector(&self, name: &str) -> KalmanResult<&Array1<f64>> {
        match self.require(name)? {
            ParamValue::Vector(v) => Ok(v),
            _ => Err(kind_mismatch(name, "vector")),
        }
    }

    /// Fetch a matrix parameter.
    pub fn matrix(&self, name: &str) -> KalmanResult<&Array2<f64>> {
        match self.require(name)? {
            ParamValue::Matrix(m) => Ok(m),
            _ => Err(kind_mismatch(name, "matrix")),
        }
    }

    fn require(&self, name: &str) -> KalmanResult<&ParamValue> {
        self.values
            .get(name)
            .ok_or_else(|| KalmanError::MissingParameter { name: name.to_string() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamShape {
    Scalar,
    Vector(usize),
    Matrix(usize, usize),
}

impl ParamShape {
    fn len(&self) -> usize {
        match *self {
            ParamShape::Scalar => 1,
            ParamShape::Vector(n) => n,
            ParamShape::Matrix(r, c) => r * c,
        }
    }
}

/// Identity mapping between a [`ParamSet`] and a flat `θ` vector.
///
/// Used by the estimator when no link/unlink pair is supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamLayout {
    entries: Vec<(String, ParamShape)>,
}

impl ParamLayout {
    /// Capture names and shapes of `params`.
    pub fn of(params: &ParamSet) -> Self {
        let entries =
            params.values.iter().map(|(name, value)| (name.clone(), value.shape())).collect();
        Self { entries }
    }

    /// Length of the flat vector.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, shape)| shape.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write `params` into a flat vector in layout order.
    ///
    /// # Errors
    /// - `MissingParameter` if a layout name is absent.
    /// - `ShapeMismatch` (step 0, matrix `"params"`) if a value's shape
    ///   differs from the layout.
    pub fn flatten(&self, params: &ParamSet) -> KalmanResult<Theta> {
        let mut out = Vec::with_capacity(self.len());
        for (name, shape) in &self.entries {
            let value = params.require(name)?;
            if value.shape() != *shape {
                return Err(KalmanError::ShapeMismatch {
                    step: 0,
                    matrix: "params",
                    expected: (shape.len(), 1),
                    found: (value.len(), 1),
                });
            }
            match value {
                ParamValue::Scalar(v) => out.push(*v),
                ParamValue::Vector(v) => out.extend(v.iter().copied()),
                ParamValue::Matrix(m) => out.extend(m.iter().copied()),
            }
        }
        Ok(Array1::from(out))
    }

    /// Rebuild a parameter set from a flat vector.
    ///
    /// # Errors
    /// - `ThetaLengthMismatch` if `theta.len()` differs from [`Self::len`].
    pub fn unflatten(&self, theta: &Theta) -> KalmanResult<ParamSet> {
        if theta.len() != self.len() {
            return Err(KalmanError::ThetaLengthMismatch {
                expected: self.len(),
                found: theta.len(),
            });
        }
        let mut params = ParamSet::new();
        let mut offset = 0;
        for (name, shape) in &self.entries {
            let n = shape.len();
            let chunk = theta.slice(ndarray::s![offset..offset + n]);
            let value = match *shape {
                ParamShape::Scalar => ParamValue::Scalar(chunk[0]),
                ParamShape::Vector(_) => ParamValue::Vector(chunk.to_owned()),
                ParamShape::Matrix(r, c) => ParamValue::Matrix(
                    Array2::from_shape_vec((r, c), chunk.to_vec()).map_err(|_| {
                        KalmanError::ShapeMismatch {
                            step: 0,
                            matrix: "params",
                            expected: (r, c),
                            found: (n, 1),
                        }
                    })?,
                ),
            };
            params.insert(name.clone(), value);
            offset += n;
        }
        Ok(params)
    }
}

fn kind_mismatch(name: &str, expected: &'static str) -> KalmanError {
    KalmanError::ParameterKindMismatch { name: name.to_string(), expected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Typed accessors and their errors.
    // - Identity flatten/unflatten through `ParamLayout`.
    // -------------------------------------------------------------------------

    fn sample() -> ParamSet {
        ParamSet::new()
            .with_scalar("q", 0.1)
            .with_vector("beta", array![1.0, 2.0])
            .with_matrix("B", array![[1.0, 2.0], [3.0, 4.0]])
    }

    #[test]
    // Purpose
    // -------
    // Accessors return values of the right kind and name the problem
    // otherwise.
    fn accessors_check_presence_and_kind() {
        // Arrange
        let params = sample();

        // Act / Assert
        assert_eq!(params.scalar("q").unwrap(), 0.1);
        assert_eq!(params.vector("beta").unwrap(), &array![1.0, 2.0]);
        assert_eq!(
            params.scalar("h").unwrap_err(),
            KalmanError::MissingParameter { name: "h".to_string() }
        );
        assert_eq!(
            params.matrix("q").unwrap_err(),
            KalmanError::ParameterKindMismatch { name: "q".to_string(), expected: "matrix" }
        );
    }

    #[test]
    // Purpose
    // -------
    // Flattening follows sorted names with row-major arrays and round-trips.
    //
    // Given
    // -----
    // - {B: [[1,2],[3,4]], beta: [1,2], q: 0.1}.
    //
    // Expect
    // ------
    // - θ = [1, 2, 3, 4, 1, 2, 0.1] ("B" < "beta" < "q"), and unflatten
    //   restores the original set.
    fn layout_flattens_sorted_row_major_and_round_trips() {
        // Arrange
        let params = sample();
        let layout = ParamLayout::of(&params);

        // Act
        let theta = layout.flatten(&params).unwrap();
        let back = layout.unflatten(&theta).unwrap();

        // Assert
        assert_eq!(layout.len(), 7);
        assert_eq!(theta, array![1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 0.1]);
        assert_eq!(back, params);
    }

    #[test]
    // Purpose
    // -------
    // A θ of the wrong length is rejected.
    fn unflatten_rejects_wrong_length() {
        let layout = ParamLayout::of(&sample());
        let err = layout.unflatten(&array![1.0]).unwrap_err();
        assert_eq!(err, KalmanError::ThetaLengthMismatch { expected: 7, found: 1 });
    }
}
