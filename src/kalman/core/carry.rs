//! carry — the recursion state threaded between filter steps.
use crate::kalman::errors::{KalmanError, KalmanResult};
use ndarray::{Array1, Array2};

/// Predicted state `a` and covariance `P` entering a filter step.
///
/// Built once as `carry0` by the caller and superseded every step; only the
/// latest pair is kept as mutable recursion state.
#[derive(Debug, Clone, PartialEq)]
pub struct Carry {
    pub a: Array1<f64>,
    pub p: Array2<f64>,
}

impl Carry {
    /// Validate and build a carry.
    ///
    /// # Errors
    /// - `KalmanError::ShapeMismatch` (step 0, matrix `"P"`) when `p` is not
    ///   `k×k` with `k = a.len()`, or when `k == 0`.
    /// - `KalmanError::NumericalSingularity` (step 0, matrix `"P"`) when any
    ///   entry of `a` or `p` is non-finite.
    pub fn new(a: Array1<f64>, p: Array2<f64>) -> KalmanResult<Self> {
        let k = a.len();
        if k == 0 || p.dim() != (k, k) {
            return Err(KalmanError::ShapeMismatch {
                step: 0,
                matrix: "P",
                expected: (k, k),
                found: p.dim(),
            });
        }
        if !a.iter().chain(p.iter()).all(|v| v.is_finite()) {
            return Err(KalmanError::NumericalSingularity { step: 0, matrix: "P" });
        }
        Ok(Self { a, p })
    }

    /// Zero mean with `P = scale · I_k`, a large-`scale` stand-in for a
    /// diffuse prior.
    pub fn diffuse(k: usize, scale: f64) -> KalmanResult<Self> {
        Self::new(Array1::zeros(k), Array2::eye(k) * scale)
    }

    /// State dimension.
    pub fn k(&self) -> usize {
        self.a.len()
    }
}
