//! numerical_stability — numerically robust parameter transforms.
//!
//! Purpose
//! -------
//! Collect numerically stable scalar transforms used to map unconstrained
//! optimizer coordinates into constrained model quantities (variances,
//! persistence coefficients) and back. Link/unlink functions of the
//! state-space models are built from these primitives.
//!
//! Key behaviors
//! -------------
//! - Provide stable scalar transforms (`safe_softplus`, its inverse,
//!   `safe_logistic`, `safe_logit`) for mapping reals into strictly positive
//!   or (0, 1) parameters without overflow/underflow.
//! - Centralize small numerical tolerances (`LOGIT_EPS`, `EIGEN_EPS`) so
//!   downstream modules share consistent guards.
//!
//! Invariants & assumptions
//! ------------------------
//! - All public transforms assume finite `f64` inputs; domain validation is
//!   enforced by the callers.
//!
//! Conventions
//! -----------
//! - Pure functions only: no logging, I/O or global state.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] cover agreement with naïve formulas,
//!   inverse pairs, and tail behavior.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    EIGEN_EPS, LOGIT_EPS, safe_logistic, safe_logit, safe_softplus, safe_softplus_inv,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use ssm_kalman::optimization::numerical_stability::prelude::*;
//
// to import the main numerical-stability surface in a single line.

pub mod prelude {
    pub use super::transformations::{
        EIGEN_EPS, LOGIT_EPS, safe_logistic, safe_logit, safe_softplus, safe_softplus_inv,
    };
}
