//! ssm_kalman — linear Gaussian state-space models: filtering, maximum
//! likelihood and simulation.
//!
//! Purpose
//! -------
//! Serve as the crate root. The crate runs the Kalman filter over a
//! multivariate observation panel with system matrices supplied per step by a
//! caller-defined dynamics provider (so score-driven / GAS transitions fit
//! the same interface), accumulates the Gaussian log-likelihood, estimates
//! parameters with an L-BFGS optimizer, and simulates forward paths from a
//! fitted model.
//!
//! Key behaviors
//! -------------
//! - [`kalman`]: filter engine, likelihood, estimator, simulator, reference
//!   models and the [`kalman::KalmanError`] surface.
//! - [`optimization`]: the argmin-backed log-likelihood maximizer, stable
//!   parameter transforms and [`optimization::errors::OptError`].
//! - [`inference`]: observed-information inverse and standard errors at the
//!   optimum.
//!
//! Conventions
//! -----------
//! - `ndarray` types at every public boundary; `nalgebra` only behind the
//!   linear-algebra backend.
//! - The library logs through the `log` facade and never installs a logger.
//!
//! Testing notes
//! -------------
//! - Unit tests live beside each module; `tests/` holds the end-to-end
//!   pipeline test.

pub mod inference;
pub mod kalman;
pub mod optimization;
