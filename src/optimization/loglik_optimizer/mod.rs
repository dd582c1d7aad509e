//! loglik_optimizer — argmin-backed maximization of log-likelihoods.
//!
//! Purpose
//! -------
//! Maximize a log-likelihood `ℓ(θ)` over unconstrained parameters. A model
//! implements [`LogLikelihood`]; [`maximize`] runs L-BFGS with the line
//! search, tolerances and history size carried by [`MLEOptions`].
//!
//! Key behaviors
//! -------------
//! - [`adapter::ArgMinAdapter`] turns `ℓ` into the cost `c(θ) = -ℓ(θ)`;
//!   `ℓ = -∞` (a rejected proposal) becomes `c = +∞` so line searches
//!   shrink past it.
//! - [`finite_diff`] supplies gradients for models without an analytic one
//!   and the Hessian used for standard errors.
//! - [`validation`] holds the finiteness and shape checks shared by the
//!   options, the adapter and [`OptimOutcome`].
//!
//! Conventions
//! -----------
//! - `LogLikelihood::grad` returns `∇ℓ`, never `∇c`.
//! - Reported values ([`OptimOutcome::value`]) are on the `ℓ` scale.
//! - Errors are [`OptError`](crate::optimization::errors::OptError) values;
//!   nothing here panics on bad model output.
//!
//! Downstream usage
//! ----------------
//! - `kalman::estimator` wraps the filter likelihood in a `LogLikelihood`
//!   and calls [`maximize`], retrying with backtracking when another line
//!   search fails.

pub mod adapter;
pub mod api;
pub mod finite_diff;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use ssm_kalman::optimization::loglik_optimizer::prelude::*;
//
// to import the main optimizer surface in a single line.

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
