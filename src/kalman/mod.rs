//! kalman — linear Gaussian state-space filtering, estimation and simulation.
//!
//! Purpose
//! -------
//! Bundle the Kalman filter engine, its likelihood, the maximum-likelihood
//! estimator, the path simulator and the reference models under a single
//! namespace. Model-specific behavior enters only through the
//! [`Dynamics`] trait, which maps `(y_t, a_t, P_t, params, step context)` to
//! the system matrices `(Z_t, T_t, H_t, R_t, Q_t)` of each step; score-driven
//! (GAS) models use the pre-update state and the observation to build a
//! transition that depends on the current prediction error.
//!
//! Key behaviors
//! -------------
//! - [`core`] holds the recursion ([`FilterEngine`]), typed step records
//!   ([`StepRecord`], [`FilterOutput`]), parameters ([`ParamSet`]) and the
//!   linear-algebra backend ([`LinalgBackend`], [`NalgebraBackend`]).
//! - [`estimator`] maximizes the log-likelihood over an unconstrained vector
//!   with L-BFGS, mapping singular proposals to `ℓ = -∞`.
//! - [`simulator`] draws independent forward paths, in parallel by default.
//! - [`models`] provides [`LocalLevel`] and [`ScoreDrivenRegression`].
//! - [`errors`] defines [`KalmanError`] and [`KalmanResult`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Dimensions `(p, k, m)` are fixed for a run; state dimensions that change
//!   over time are not supported.
//! - Exogenous covariates are passed explicitly and reach the dynamics through
//!   the step context; they are never part of the parameter set.
//! - Every filter run is single-threaded and holds no global state.
//!
//! Conventions
//! -----------
//! - Observation panels are `n×p` with one row per step; non-finite entries
//!   are missing.
//! - Indexing is 0-based throughout.
//! - Log-likelihoods omit the `2π` constant unless the method name says
//!   otherwise.
//!
//! Downstream usage
//! ----------------
//! 1. Implement [`Dynamics`] (or pick a model from [`models`]).
//! 2. Build a [`Carry`] and an initial [`ParamSet`].
//! 3. Call [`fit`] with optional link/unlink closures and [`FitOptions`].
//! 4. Call [`simulate`] on the [`FitResult`] with [`SimOptions`].
//!
//! Testing notes
//! -------------
//! - Unit tests sit beside each module; `tests/integration_kalman_pipeline.rs`
//!   drives the public API end to end (hand-computed recursion, missing-data
//!   equivalence, Riccati convergence, fitting and simulation moments).

pub mod core;
pub mod errors;
pub mod estimator;
pub mod models;
pub mod simulator;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    carry::Carry,
    dynamics::{Dynamics, StepContext},
    filter::{FilterEngine, FilterMode},
    likelihood::{loglikelihood, loglikelihood_terms, loglikelihood_with_constant},
    linalg::{LinalgBackend, NalgebraBackend},
    options::{FitOptions, SimOptions},
    params::{ParamLayout, ParamSet, ParamValue},
    record::{FilterOutput, StepRecord},
    system::{ModelDims, SystemMatrices, mask_missing_rows},
};

pub use self::errors::{KalmanError, KalmanResult};

pub use self::estimator::{Estimator, FitResult, LinkFn, UnlinkFn, fit};

pub use self::models::{LocalLevel, ScoreDrivenRegression};

pub use self::simulator::{SimulationOutput, Simulator, simulate};

// ---- Optional convenience prelude for downstream crates -------------------
//
//     use ssm_kalman::kalman::prelude::*;

pub mod prelude {
    pub use super::{
        Carry, Dynamics, Estimator, FilterEngine, FilterMode, FilterOutput, FitOptions, FitResult,
        KalmanError, KalmanResult, LocalLevel, ParamSet, ScoreDrivenRegression, SimOptions,
        SimulationOutput, Simulator, StepContext, SystemMatrices, fit, mask_missing_rows,
        simulate,
    };
}
