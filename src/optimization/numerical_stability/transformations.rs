//! Numerical stability utilities.
//!
//! Provides safe implementations of common nonlinear transforms
//! that are prone to overflow/underflow in naïve form.
//! The functions here follow guarded strategies similar to those
//! in major ML libraries (e.g. PyTorch, TensorFlow), using explicit
//! cutoffs (`x > 20.0`) to keep `f64` arithmetic in a well-conditioned regime.
//!
//! # Provided items
//! - [`LOGIT_EPS`]: clamp applied to probabilities before taking logits.
//! - [`EIGEN_EPS`]: eigenvalues at or below this magnitude are treated as zero
//!   when forming pseudo-inverses.
//! - [`safe_softplus(x)`]: stable version of `ln(1 + exp(x))`,
//!   mapping ℝ → (0, ∞) without overflow.
//! - [`safe_softplus_inv(x)`]: inverse of softplus, mapping
//!   (0, ∞) → ℝ without catastrophic cancellation.
//! - [`safe_logistic(x)`]: `1 / (1 + exp(-x))`, mapping ℝ → (0, 1); it is
//!   also the derivative of softplus.
//! - [`safe_logit(p)`]: inverse of the logistic map on (0, 1).
//!
//! # Rationale
//! These transforms are building blocks in optimization and
//! probabilistic modeling whenever parameters must be kept
//! strictly positive or constrained away from unstable boundaries
//! (variances, persistence coefficients inside (0, 1)).

/// Clamp used by [`safe_logit`] to keep probabilities away from {0, 1}.
pub const LOGIT_EPS: f64 = 1e-12;

/// Eigenvalue magnitude below which a direction is treated as singular.
pub const EIGEN_EPS: f64 = 1e-10;

/// Numerically stable softplus: `softplus(x) = ln(1 + exp(x))`.
///
/// Computes softplus without overflow for large positive `x` and
/// with good precision for large negative `x`:
///
/// - For sufficiently large `x`, `softplus(x) ≈ x + ln1p(exp(-x)) ≈ x`.
/// - Otherwise, it falls back to `ln1p(exp(x))`.
///
/// The cutoff used here (`x > 20.0`) is a practical threshold that
/// keeps the calculation in a well-conditioned regime for `f64`.
pub fn safe_softplus(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}

/// Stable inverse of softplus on `(0, ∞)`: solves for `t` in
/// `softplus(t) = x`, returning `t = ln(exp(x) - 1)`.
///
/// - For sufficiently large `x`, `ln(exp(x) - 1) ≈ x`.
/// - Otherwise, it uses `ln(expm1(x))`.
///
/// # Parameters
/// - `x`: a positive real (the softplus output), must be finite and `> 0`.
pub fn safe_softplus_inv(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp_m1().ln() }
}

/// Numerically stable logistic function `σ(x) = 1 / (1 + exp(-x))`.
///
/// Branches on the sign of `x` so that `exp` is only ever evaluated on a
/// non-positive argument.
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Inverse of [`safe_logistic`]: `logit(p) = ln(p / (1 - p))`.
///
/// `p` is clamped into `[LOGIT_EPS, 1 - LOGIT_EPS]` first, so boundary
/// values map to large but finite reals.
pub fn safe_logit(p: f64) -> f64 {
    let p = p.clamp(LOGIT_EPS, 1.0 - LOGIT_EPS);
    p.ln() - (-p).ln_1p()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement of the guarded transforms with naïve formulas on safe grids.
    // - Inverse pairs (softplus / softplus_inv, logistic / logit).
    // - Tail behavior without overflow.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Softplus matches `ln(1 + e^x)` where the naïve formula is safe and
    // round-trips through its inverse.
    fn softplus_matches_naive_and_inverts() {
        for &x in &[-10.0, -1.0, 0.0, 0.5, 3.0, 15.0] {
            let naive = (1.0_f64 + f64::exp(x)).ln();
            assert_relative_eq!(safe_softplus(x), naive, max_relative = 1e-12);
            assert_relative_eq!(safe_softplus_inv(safe_softplus(x)), x, epsilon = 1e-9);
        }
    }

    #[test]
    // Purpose
    // -------
    // Large inputs never overflow.
    fn softplus_tails_are_finite() {
        assert_eq!(safe_softplus(800.0), 800.0);
        assert!(safe_softplus(-800.0) >= 0.0);
        assert_eq!(safe_softplus_inv(800.0), 800.0);
    }

    #[test]
    // Purpose
    // -------
    // Logistic is symmetric, bounded, and inverted by logit.
    fn logistic_and_logit_are_inverse() {
        for &x in &[-30.0, -2.0, 0.0, 1.5, 30.0] {
            let p = safe_logistic(x);
            assert!(p > 0.0 && p < 1.0);
            assert_relative_eq!(safe_logistic(-x), 1.0 - p, epsilon = 1e-15);
            if x.abs() < 20.0 {
                assert_relative_eq!(safe_logit(p), x, epsilon = 1e-9);
            }
        }
        assert!(safe_logit(0.0).is_finite());
        assert!(safe_logit(1.0).is_finite());
    }
}
