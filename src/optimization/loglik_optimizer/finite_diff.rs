//! finite_diff — numerical derivatives of the optimizer cost.
//!
//! Purpose
//! -------
//! Supply gradients and Hessians when a [`LogLikelihood`] has no analytic
//! derivatives, on top of the `finitediff` crate.
//!
//! Key behaviors
//! -------------
//! - [`cost_gradient`] differences a fallible cost `c(θ)`. Central
//!   differences come first; a coordinate whose central difference is not
//!   finite is retried one-sided, forward and then backward, with a step
//!   scaled to `|θ_i|`.
//! - [`hessian_of_gradient`] differentiates a gradient map once more, central
//!   first and forward as a fallback, and returns the symmetric part.
//!
//! Invariants & assumptions
//! ------------------------
//! - The cost is `+∞` wherever the model rejects a proposal. A central
//!   difference taken next to such a region straddles an infinite value; the
//!   one-sided retry differences toward the side that is still finite.
//! - The first error raised by the cost during differencing wins and is
//!   returned as-is; no retry is attempted after a hard error.
//! - Everything returned here has passed [`validate_grad`] or
//!   [`validate_hessian`].
//!
//! Downstream usage
//! ----------------
//! - `adapter::ArgMinAdapter` calls [`cost_gradient`] for models without
//!   an analytic gradient.
//! - `inference::hessian` calls [`hessian_of_gradient`] at the optimum.
//!
//! [`LogLikelihood`]: crate::optimization::loglik_optimizer::LogLikelihood
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, Theta,
        types::Hessian,
        validation::{validate_grad, validate_hessian},
    },
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// Gradient of a fallible cost, robust to infinite neighbours.
///
/// # Errors
/// - The first error returned by `cost` while differencing.
/// - `OptError::InvalidGradient` when some coordinate has no finite
///   difference on either side (e.g. `c(θ)` itself is infinite).
pub fn cost_gradient<C>(cost: &C, theta: &Theta) -> Result<Grad, Error>
where
    C: Fn(&Theta) -> Result<f64, Error>,
{
    let failure: RefCell<Option<Error>> = RefCell::new(None);
    let plain = |t: &Theta| match cost(t) {
        Ok(value) => value,
        Err(err) => {
            failure.borrow_mut().get_or_insert(err);
            f64::NAN
        }
    };

    let mut grad = theta.central_diff(&plain);
    if let Some(err) = failure.take() {
        return Err(err);
    }
    if grad.iter().any(|g| !g.is_finite()) {
        let base = cost(theta)?;
        let mut probe = theta.clone();
        for i in 0..theta.len() {
            if grad[i].is_finite() {
                continue;
            }
            let h = f64::EPSILON.sqrt() * theta[i].abs().max(1.0);
            probe[i] = theta[i] + h;
            let forward = (cost(&probe)? - base) / h;
            grad[i] = if forward.is_finite() {
                forward
            } else {
                probe[i] = theta[i] - h;
                (base - cost(&probe)?) / h
            };
            probe[i] = theta[i];
        }
    }
    validate_grad(&grad, theta.len())?;
    Ok(grad)
}

/// Jacobian of a gradient map, symmetrized.
///
/// # Errors
/// Shape or finiteness errors from [`validate_hessian`] when neither the
/// central nor the forward Jacobian is usable.
///
/// # Example
/// ```rust
/// # use ndarray::array;
/// # use ssm_kalman::optimization::loglik_optimizer::{Theta, finite_diff::hessian_of_gradient};
/// // ∇c(θ) = (2θ₀ + θ₁, θ₀ + 4θ₁)
/// let grad = |t: &Theta| array![2.0 * t[0] + t[1], t[0] + 4.0 * t[1]];
/// let hess = hessian_of_gradient(&grad, &array![0.3, -1.0]).unwrap();
/// assert!((hess[[0, 1]] - 1.0).abs() < 1e-6);
/// assert!((hess[[1, 1]] - 4.0).abs() < 1e-6);
/// ```
pub fn hessian_of_gradient<F: Fn(&Theta) -> Grad>(grad: &F, theta: &Theta) -> OptResult<Hessian> {
    let dim = theta.len();
    let central = theta.central_hessian(grad);
    let hess = if validate_hessian(&central, dim).is_ok() {
        central
    } else {
        let forward = theta.forward_hessian(grad);
        validate_hessian(&forward, dim)?;
        forward
    };
    Ok((&hess + &hess.t()) * 0.5)
}
