//! inference::hessian — observed information, its inverse, and standard errors.
//!
//! Purpose
//! -------
//! Turn a finite-difference Hessian of the negative log-likelihood at the
//! optimum into a numerically stable inverse (the approximate covariance of
//! `θ̂`) and into per-parameter standard errors. This module handles the
//! conversion between `ndarray` and `nalgebra` types.
//!
//! Key behaviors
//! -------------
//! - Call [`hessian_of_gradient`] on the gradient of the cost `c(θ) = -ℓ(θ)` to
//!   obtain the observed information matrix `J(θ̂)`.
//! - Copy the resulting `ndarray` Hessian into a `nalgebra::DMatrix` for
//!   the eigendecomposition.
//! - Form the Moore–Penrose pseudoinverse `J⁺` by symmetric
//!   eigendecomposition with eigenvalue truncation.
//! - Provide a central-difference gradient with a caller-chosen relative
//!   step ([`central_gradient_scaled`]) for objectives without an analytic
//!   gradient.
//!
//! Invariants & assumptions
//! ------------------------
//! - [`hessian_of_gradient`] returns a finite, square `n×n` matrix with
//!   `n = θ̂.len()`, already symmetrized; this module does **not**
//!   re-symmetrize.
//! - Eigenvalues at most [`EIGEN_EPS`] are treated as numerically
//!   nonpositive and ignored, so directions where the likelihood is flat or
//!   not concave contribute nothing to `J⁺`.
//!
//! Conventions
//! -----------
//! - Hessians are on the **summed** log-likelihood scale (the Kalman
//!   log-likelihood is a sum over steps), so `J⁺` is directly the
//!   asymptotic covariance of `θ̂` in unconstrained space.
//! - No explicit matrix inverse is formed.
//! - Errors are reported via [`OptResult<T>`].
//!
//! Downstream usage
//! ----------------
//! - `kalman::estimator::fit` calls [`inverse_observed_information`] after
//!   optimization and stores the result in `FitResult::inverse_hessian`;
//!   `FitResult::standard_errors` uses [`standard_errors`].
//!
//! Testing notes
//! -------------
//! - Unit tests cover agreement of `J⁺` with
//!   the analytic inverse on quadratic objectives, and truncation of a
//!   singular direction.
use crate::optimization::{
    errors::OptResult, loglik_optimizer::finite_diff::hessian_of_gradient,
    numerical_stability::transformations::EIGEN_EPS,
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// inverse_observed_information — pseudoinverse of the observed information.
///
/// Parameters
/// ----------
/// - `f`: `&F`
///   Gradient map of the **negative** log-likelihood, `f: θ ↦ ∇c(θ)`. Must be
///   C¹ near `theta_hat` so that [`hessian_of_gradient`] can succeed.
/// - `theta_hat`: `&Array1<f64>`
///   Point at which the observed information is evaluated.
///
/// Returns
/// -------
/// `OptResult<Array2<f64>>`
///   The `n×n` pseudoinverse `J⁺` with `n = theta_hat.len()`.
///
/// Errors
/// ------
/// - Any error that [`hessian_of_gradient`] may return (dimension mismatches or
///   non-finite entries).
///
/// Examples
/// --------
/// ```rust
/// # use ndarray::array;
/// # use ssm_kalman::inference::hessian::inverse_observed_information;
/// // c(θ) = ½ θᵀ A θ with A = diag(4, 1) ⇒ ∇c = A θ, J⁺ = diag(1/4, 1).
/// let a = array![[4.0, 0.0], [0.0, 1.0]];
/// let f = |theta: &ndarray::Array1<f64>| a.dot(theta);
/// let inv = inverse_observed_information(&f, &array![1.0, -1.0]).unwrap();
/// assert!((inv[[0, 0]] - 0.25).abs() < 1e-6);
/// assert!((inv[[1, 1]] - 1.0).abs() < 1e-6);
/// ```
pub fn inverse_observed_information<F: Fn(&Array1<f64>) -> Array1<f64>>(
    f: &F, theta_hat: &Array1<f64>,
) -> OptResult<Array2<f64>> {
    let n = theta_hat.len();
    let obs_info = hessian_of_gradient(f, theta_hat)?;
    Ok(pseudo_inverse(DMatrix::from_fn(n, n, |i, j| obs_info[[i, j]]), n))
}

/// central_gradient_scaled — central differences with a scaled step.
///
/// Uses the step `rel_step · max(1, |θ_i|)` in coordinate `i`. A step much
/// larger than `sqrt(ε)` keeps rounding noise in the gradient small enough
/// for the gradient to be differentiated a second time by
/// [`hessian_of_gradient`].
pub fn central_gradient_scaled<F: Fn(&Array1<f64>) -> f64>(
    f: &F, theta: &Array1<f64>, rel_step: f64,
) -> Array1<f64> {
    let mut shifted = theta.clone();
    Array1::from_shape_fn(theta.len(), |i| {
        let h = rel_step * theta[i].abs().max(1.0);
        shifted[i] = theta[i] + h;
        let up = f(&shifted);
        shifted[i] = theta[i] - h;
        let down = f(&shifted);
        shifted[i] = theta[i];
        (up - down) / (2.0 * h)
    })
}

/// Square roots of the diagonal of a covariance matrix.
///
/// Negative diagonal entries (which can only arise from rounding) map to
/// zero.
pub fn standard_errors(cov: &Array2<f64>) -> Array1<f64> {
    cov.diag().mapv(|v| v.max(0.0).sqrt())
}

// ---- Helper methods ----

/// pseudo_inverse — truncated eigen pseudoinverse of a symmetric matrix.
///
/// With `J = Q Λ Qᵀ`, returns
/// `J⁺[i, j] = Σ_{k: λ_k > EIGEN_EPS} Q[i,k] Q[j,k] / λ_k`.
fn pseudo_inverse(obs_info_nalg: DMatrix<f64>, n: usize) -> Array2<f64> {
    let eigen_decomp = obs_info_nalg.symmetric_eigen();
    let q = eigen_decomp.eigenvectors;
    let eigenvals = eigen_decomp.eigenvalues;
    let mut inv = Array2::<f64>::zeros((n, n));
    for (k, &lambda) in eigenvals.iter().enumerate() {
        if lambda <= EIGEN_EPS {
            continue;
        }
        for i in 0..n {
            let coeff = q[(i, k)] / lambda;
            for j in 0..n {
                inv[[i, j]] += coeff * q[(j, k)];
            }
        }
    }
    inv
}
