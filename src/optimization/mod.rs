//! optimization — likelihood maximization and parameter transforms.
//!
//! Purpose
//! -------
//! Everything the estimator needs to move through unconstrained parameter
//! space: the L-BFGS maximizer ([`loglik_optimizer`]), the scalar maps from
//! `ℝ` onto positive and unit-interval parameters ([`numerical_stability`]),
//! and the [`errors::OptError`] type both report through.
//!
//! Invariants & assumptions
//! ------------------------
//! - The optimizer maximizes `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`; every
//!   reported value is on the `ℓ` scale.
//! - `ℓ = -∞` marks a rejected proposal, not a failure: line searches
//!   shrink past it.
//! - argmin errors never escape raw; they arrive as `OptError::Backend`.
//!
//! Conventions
//! -----------
//! - Progress is logged through the `log` facade, and only when
//!   `MLEOptions::verbose` is set.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use ssm_kalman::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
