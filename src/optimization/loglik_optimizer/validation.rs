//! validation — finiteness and shape checks at the optimizer boundary.
//!
//! Every check reports the first offending entry, so an error names a
//! coordinate of `θ`, of the gradient or of the Hessian rather than only
//! saying that something was non-finite.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{Grad, Theta, types::Hessian},
};

/// Reject a gradient tolerance that is non-finite or not strictly positive.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    match tol.and_then(|t| tolerance_problem(t).map(|reason| (t, reason))) {
        Some((tol, reason)) => Err(OptError::InvalidTolGrad { tol, reason }),
        None => Ok(()),
    }
}

/// Reject a cost tolerance that is non-finite or not strictly positive.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    match tol.and_then(|t| tolerance_problem(t).map(|reason| (t, reason))) {
        Some((tol, reason)) => Err(OptError::InvalidTolCost { tol, reason }),
        None => Ok(()),
    }
}

/// A gradient must have length `dim` and finite entries.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    match first_non_finite(grad.iter()) {
        Some((index, value)) => Err(OptError::InvalidGradient {
            index,
            value,
            reason: "Gradient elements must be finite.",
        }),
        None => Ok(()),
    }
}

/// Unwrap the solver's best parameter, which must exist and be finite.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    let theta = theta_hat.ok_or(OptError::MissingThetaHat)?;
    if let Some((index, value)) = first_non_finite(theta.iter()) {
        return Err(OptError::InvalidThetaHat {
            index,
            value,
            reason: "Parameter estimates must be finite.",
        });
    }
    Ok(theta)
}

/// The reported log-likelihood must be finite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if value.is_finite() { Ok(()) } else { Err(OptError::NonFiniteCost { value }) }
}

/// A Hessian must be `dim × dim` with finite entries.
pub fn validate_hessian(hessian: &Hessian, dim: usize) -> OptResult<()> {
    if hessian.dim() != (dim, dim) {
        return Err(OptError::HessianDimMismatch { expected: dim, found: hessian.dim() });
    }
    match hessian.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, col), &value)) => Err(OptError::InvalidHessian { row, col, value }),
        None => Ok(()),
    }
}

// ---- Helper methods ----

fn first_non_finite<'a>(values: impl Iterator<Item = &'a f64>) -> Option<(usize, f64)> {
    values.copied().enumerate().find(|(_, v)| !v.is_finite())
}

fn tolerance_problem(tol: f64) -> Option<&'static str> {
    if !tol.is_finite() {
        Some("Tolerance must be finite.")
    } else if tol <= 0.0 {
        Some("Tolerance must be positive.")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Tolerance screening for both the gradient and cost tolerances.
    // - Index reporting for non-finite gradients, estimates and Hessians.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Absent tolerances pass; zero, negative and NaN tolerances are rejected
    // with the matching variant.
    fn tolerances_must_be_positive_and_finite() {
        // Arrange / Act / Assert
        assert!(verify_tol_grad(None).is_ok());
        assert!(verify_tol_cost(Some(1e-8)).is_ok());
        assert!(matches!(
            verify_tol_grad(Some(0.0)),
            Err(OptError::InvalidTolGrad { reason: "Tolerance must be positive.", .. })
        ));
        assert!(matches!(
            verify_tol_cost(Some(f64::NAN)),
            Err(OptError::InvalidTolCost { reason: "Tolerance must be finite.", .. })
        ));
        assert!(matches!(verify_tol_cost(Some(-1.0)), Err(OptError::InvalidTolCost { .. })));
    }

    #[test]
    // Purpose
    // -------
    // The first non-finite coordinate is the one reported.
    //
    // Given
    // -----
    // - A gradient and an estimate with NaN / ∞ in positions 1 and 2.
    //
    // Expect
    // ------
    // - Index 1 for both; a length mismatch is reported before finiteness.
    fn first_offending_coordinate_is_reported() {
        // Arrange
        let grad = array![0.0, f64::NAN, f64::INFINITY];
        let theta = array![1.0, f64::NEG_INFINITY, f64::NAN];

        // Act
        let grad_err = validate_grad(&grad, 3).unwrap_err();
        let theta_err = validate_theta_hat(Some(theta)).unwrap_err();
        let dim_err = validate_grad(&grad, 2).unwrap_err();

        // Assert
        assert!(matches!(grad_err, OptError::InvalidGradient { index: 1, .. }));
        assert!(matches!(theta_err, OptError::InvalidThetaHat { index: 1, .. }));
        assert_eq!(dim_err, OptError::GradientDimMismatch { expected: 2, found: 3 });
        assert_eq!(validate_theta_hat(None).unwrap_err(), OptError::MissingThetaHat);
    }

    #[test]
    // Purpose
    // -------
    // Hessian checks report shape first, then the first non-finite entry in
    // row-major order.
    fn hessian_shape_and_entries() {
        // Arrange
        let good = array![[2.0, 0.5], [0.5, 1.0]];
        let bad = array![[2.0, 0.5], [f64::NAN, 1.0]];

        // Act / Assert
        assert!(validate_hessian(&good, 2).is_ok());
        assert!(matches!(
            validate_hessian(&bad, 2),
            Err(OptError::InvalidHessian { row: 1, col: 0, .. })
        ));
        assert!(matches!(
            validate_hessian(&good, 3),
            Err(OptError::HessianDimMismatch { expected: 3, found: (2, 2) })
        ));
        assert!(validate_value(-12.5).is_ok());
        assert!(validate_value(f64::NEG_INFINITY).is_err());
    }
}
