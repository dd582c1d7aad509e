//! options — configuration for fitting and simulation.
//!
//! - [`FitOptions`]: optimizer settings ([`MLEOptions`]) plus whether to
//!   compute the inverse Hessian at the optimum.
//! - [`SimOptions`]: master RNG seed and whether paths run on the rayon pool.
use crate::optimization::loglik_optimizer::MLEOptions;

/// Options controlling [`fit`](crate::kalman::estimator::fit).
///
/// Default: `MLEOptions::default()` (L-BFGS, Armijo backtracking,
/// `tol_grad = 1e-6`, `max_iter = 300`) and `compute_inverse_hessian = true`.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    pub mle: MLEOptions,
    pub compute_inverse_hessian: bool,
}

impl FitOptions {
    pub fn new(mle: MLEOptions, compute_inverse_hessian: bool) -> Self {
        Self { mle, compute_inverse_hessian }
    }
}

impl Default for FitOptions {
    fn default() -> Self {
        Self { mle: MLEOptions::default(), compute_inverse_hessian: true }
    }
}

/// Options controlling [`simulate`](crate::kalman::simulator::simulate).
///
/// Path `i` draws from a ChaCha stream seeded with `seed` and stream id `i`,
/// so results do not depend on `parallel` or on thread scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimOptions {
    pub seed: u64,
    pub parallel: bool,
}

impl SimOptions {
    pub fn new(seed: u64, parallel: bool) -> Self {
        Self { seed, parallel }
    }
}

impl Default for SimOptions {
    fn default() -> Self {
        Self { seed: 0, parallel: true }
    }
}
