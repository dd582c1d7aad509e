//! linalg — linear-algebra backend used by the filter and simulator.
//!
//! Purpose
//! -------
//! Isolate every factorization and triangular solve behind a small strategy
//! trait, [`LinalgBackend`], so that the numeric backend is an explicit value
//! passed to the filter engine, estimator and simulator at construction time.
//!
//! Key behaviors
//! -------------
//! - Cholesky factor of a symmetric positive-definite matrix (`F_t`).
//! - Forward solve `L X = B` and transposed solve `Lᵀ X = B` for a lower
//!   triangular `L`.
//! - A square-root factor `S` with `S Sᵀ = A` for positive *semi*-definite
//!   noise covariances, used to draw correlated Gaussian noise.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are dense `ndarray` matrices; symmetric inputs are assumed to be
//!   symmetric up to rounding (callers symmetrize before factorizing).
//! - Failures are reported as `None`; callers attach step/matrix context when
//!   turning them into `KalmanError::NumericalSingularity`.
//!
//! Conventions
//! -----------
//! - [`NalgebraBackend`] copies into `nalgebra::DMatrix`, factorizes, and
//!   copies back. The matrices in a state-space model are small, so the copies
//!   are negligible next to the `O(n³)` work.
//! - PSD factors first try a Cholesky factorization and fall back to a
//!   symmetric eigendecomposition with negative rounding noise clipped to
//!   zero, so exact zero covariances (e.g. `Q = 0` in score-driven models)
//!   produce exact zero factors.
use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView2};

/// Relative tolerance on negative eigenvalues accepted as rounding noise when
/// factorizing a PSD matrix.
pub const PSD_TOL: f64 = 1e-10;

/// Strategy trait for the dense linear algebra the filter depends on.
pub trait LinalgBackend: Send + Sync {
    /// Lower Cholesky factor `L` with `A = L Lᵀ`, or `None` if `A` is not
    /// numerically positive-definite.
    fn cholesky(&self, a: ArrayView2<f64>) -> Option<Array2<f64>>;

    /// Solve `L X = B` for lower-triangular `L`.
    fn solve_lower(&self, l: ArrayView2<f64>, b: ArrayView2<f64>) -> Option<Array2<f64>>;

    /// Solve `Lᵀ X = B` for lower-triangular `L`.
    fn solve_lower_transpose(&self, l: ArrayView2<f64>, b: ArrayView2<f64>)
        -> Option<Array2<f64>>;

    /// Square-root factor `S` with `S Sᵀ = A` for symmetric PSD `A`; `None`
    /// when `A` has a materially negative eigenvalue or non-finite entries.
    fn psd_factor(&self, a: ArrayView2<f64>) -> Option<Array2<f64>>;

    /// Solve `A X = B` for symmetric positive-definite `A` through its
    /// Cholesky factor.
    fn solve_spd(&self, a: ArrayView2<f64>, b: ArrayView2<f64>) -> Option<Array2<f64>> {
        let l = self.cholesky(a)?;
        let tmp = self.solve_lower(l.view(), b)?;
        self.solve_lower_transpose(l.view(), tmp.view())
    }
}

/// Default backend built on `nalgebra`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NalgebraBackend;

impl LinalgBackend for NalgebraBackend {
    fn cholesky(&self, a: ArrayView2<f64>) -> Option<Array2<f64>> {
        if !a.iter().all(|v| v.is_finite()) {
            return None;
        }
        let chol = to_dmatrix(a).cholesky()?;
        Some(to_array2(&chol.l()))
    }

    fn solve_lower(&self, l: ArrayView2<f64>, b: ArrayView2<f64>) -> Option<Array2<f64>> {
        let x = to_dmatrix(l).solve_lower_triangular(&to_dmatrix(b))?;
        Some(to_array2(&x))
    }

    fn solve_lower_transpose(
        &self, l: ArrayView2<f64>, b: ArrayView2<f64>,
    ) -> Option<Array2<f64>> {
        let x = to_dmatrix(l).tr_solve_lower_triangular(&to_dmatrix(b))?;
        Some(to_array2(&x))
    }

    fn psd_factor(&self, a: ArrayView2<f64>) -> Option<Array2<f64>> {
        if let Some(l) = self.cholesky(a) {
            return Some(l);
        }
        if !a.iter().all(|v| v.is_finite()) {
            return None;
        }
        let eig = to_dmatrix(a).symmetric_eigen();
        let scale = eig.eigenvalues.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
        if eig.eigenvalues.iter().any(|&lambda| lambda < -PSD_TOL * scale) {
            return None;
        }
        let n = a.nrows();
        let q = &eig.eigenvectors;
        Some(Array2::from_shape_fn((n, n), |(i, j)| {
            q[(i, j)] * eig.eigenvalues[j].max(0.0).sqrt()
        }))
    }
}

// ---- Helper methods ----

/// Copy an `ndarray` view into a column-major `DMatrix`.
fn to_dmatrix(a: ArrayView2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

fn to_array2(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Cholesky success on SPD input and failure on indefinite input.
    // - Triangular solves and the SPD solve built from them.
    // - PSD factors for singular covariances (including the zero matrix).
    // -------------------------------------------------------------------------

    fn assert_close(a: &Array2<f64>, b: &Array2<f64>, eps: f64) {
        assert_eq!(a.dim(), b.dim());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = eps);
        }
    }

    #[test]
    // Purpose
    // -------
    // The Cholesky factor reproduces the input and rejects indefinite
    // matrices.
    //
    // Given
    // -----
    // - A = [[4, 2], [2, 3]] (SPD) and B = [[1, 2], [2, 1]] (indefinite).
    //
    // Expect
    // ------
    // - L Lᵀ = A; `cholesky(B)` is `None`.
    fn cholesky_reconstructs_spd_and_rejects_indefinite() {
        // Arrange
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![[1.0, 2.0], [2.0, 1.0]];
        let backend = NalgebraBackend;

        // Act
        let l = backend.cholesky(a.view()).unwrap();

        // Assert
        assert_close(&l.dot(&l.t()), &a, 1e-12);
        assert_eq!(l[[0, 1]], 0.0);
        assert!(backend.cholesky(b.view()).is_none());
    }

    #[test]
    // Purpose
    // -------
    // Two triangular solves through the Cholesky factor invert A.
    fn solve_spd_matches_direct_inverse() {
        // Arrange
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let rhs = array![[1.0], [2.0]];
        let backend = NalgebraBackend;

        // Act
        let x = backend.solve_spd(a.view(), rhs.view()).unwrap();

        // Assert
        assert_close(&a.dot(&x), &rhs, 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Singular PSD matrices still receive a valid square-root factor, and
    // the zero matrix maps to an exact zero factor.
    fn psd_factor_handles_singular_and_zero() {
        // Arrange
        let rank_one = array![[1.0, 1.0], [1.0, 1.0]];
        let zero = Array2::<f64>::zeros((2, 2));
        let negative = array![[1.0, 0.0], [0.0, -1.0]];
        let backend = NalgebraBackend;

        // Act
        let s = backend.psd_factor(rank_one.view()).unwrap();
        let z = backend.psd_factor(zero.view()).unwrap();

        // Assert
        assert_close(&s.dot(&s.t()), &rank_one, 1e-10);
        assert!(z.iter().all(|&v| v == 0.0));
        assert!(backend.psd_factor(negative.view()).is_none());
    }
}
