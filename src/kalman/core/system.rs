//! system — per-step system matrices and the run's dimension contract.
//!
//! A linear Gaussian state-space model at step `t` reads
//!
//! ```text
//! y_t     = Z_t α_t + ε_t,          ε_t ~ N(0, H_t)
//! α_{t+1} = T_t α_t + R_t η_t,      η_t ~ N(0, Q_t)
//! ```
//!
//! with `p` observed series, `k` states and `m` state disturbances.
//! [`SystemMatrices`] bundles `(Z, T, H, R, Q)` for one step and
//! [`ModelDims`] fixes `(p, k, m)` for a whole filter run; every step is
//! checked against it.
use crate::kalman::errors::{KalmanError, KalmanResult};
use ndarray::{Array2, ArrayView1};

/// Dimensions shared by every step of one filter run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDims {
    /// Observation dimension.
    pub p: usize,
    /// State dimension.
    pub k: usize,
    /// State-disturbance dimension.
    pub m: usize,
}

/// The five system matrices returned by a dynamics provider for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemMatrices {
    /// Design matrix `Z_t` (`p×k`).
    pub z: Array2<f64>,
    /// Transition matrix `T_t` (`k×k`).
    pub t: Array2<f64>,
    /// Observation-noise covariance `H_t` (`p×p`).
    pub h: Array2<f64>,
    /// State-noise loading `R_t` (`k×m`).
    pub r: Array2<f64>,
    /// State-noise covariance `Q_t` (`m×m`).
    pub q: Array2<f64>,
}

impl SystemMatrices {
    pub fn new(
        z: Array2<f64>, t: Array2<f64>, h: Array2<f64>, r: Array2<f64>, q: Array2<f64>,
    ) -> Self {
        Self { z, t, h, r, q }
    }

    /// Check every matrix against `dims`, reporting the first offender.
    ///
    /// # Errors
    /// - `KalmanError::ShapeMismatch` naming the matrix and `step`.
    pub fn validate(&self, dims: &ModelDims, step: usize) -> KalmanResult<()> {
        let ModelDims { p, k, m } = *dims;
        let checks: [(&'static str, &Array2<f64>, (usize, usize)); 5] = [
            ("Z", &self.z, (p, k)),
            ("T", &self.t, (k, k)),
            ("H", &self.h, (p, p)),
            ("R", &self.r, (k, m)),
            ("Q", &self.q, (m, m)),
        ];
        for (matrix, value, expected) in checks {
            if value.dim() != expected {
                return Err(KalmanError::ShapeMismatch {
                    step,
                    matrix,
                    expected,
                    found: value.dim(),
                });
            }
        }
        Ok(())
    }

    /// `R_t Q_t R_tᵀ`, the state-noise covariance in state coordinates.
    pub fn state_noise_cov(&self) -> Array2<f64> {
        self.r.dot(&self.q).dot(&self.r.t())
    }
}

/// Neutralize missing entries of `y` in the design and noise matrices.
///
/// For every non-finite `y[i]`, row `i` of `z` is zeroed and row/column `i`
/// of `h` are replaced by the unit vector `e_i`. Combined with the filter's
/// zero innovation for missing entries, the state update, innovation
/// quadratic form and log-determinant then coincide with a run where the
/// missing component is dropped from the observation vector.
///
/// Dynamics providers call this before returning their matrices.
pub fn mask_missing_rows(z: &mut Array2<f64>, h: &mut Array2<f64>, y: ArrayView1<f64>) {
    for (i, value) in y.iter().enumerate() {
        if value.is_finite() {
            continue;
        }
        if i < z.nrows() {
            z.row_mut(i).fill(0.0);
        }
        if i < h.nrows() && i < h.ncols() {
            h.row_mut(i).fill(0.0);
            h.column_mut(i).fill(0.0);
            h[[i, i]] = 1.0;
        }
    }
}
