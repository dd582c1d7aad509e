//! inference — post-estimation uncertainty for fitted state-space models.
//!
//! Purpose
//! -------
//! Provide the observed-information machinery used to attach an approximate
//! covariance matrix and standard errors to maximum-likelihood estimates.
//!
//! Key behaviors
//! -------------
//! - Build the observed information `J(θ̂)` as a finite-difference Hessian of
//!   the negative log-likelihood in unconstrained optimizer space.
//! - Invert it through a truncated symmetric eigendecomposition
//!   ([`hessian::inverse_observed_information`]).
//! - Report standard errors as square roots of the inverse's diagonal
//!   ([`hessian::standard_errors`]).
//!
//! Conventions
//! -----------
//! - Parameters `θ` live in **unconstrained optimizer space**; mapping the
//!   uncertainty into model space (delta method) is left to callers.
//! - Failures are reported through `OptResult`; the estimator downgrades
//!   them to a missing inverse Hessian rather than failing the fit.

pub mod hessian;

pub use self::hessian::{central_gradient_scaled, inverse_observed_information, standard_errors};
