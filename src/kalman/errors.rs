//! Errors for the state-space layer (filter recursion, parameter handling,
//! estimation and simulation).
//!
//! This module defines [`KalmanError`] and the [`KalmanResult`] alias used by
//! every public entry point under `kalman`. Optimizer failures are carried
//! through [`KalmanError::Optimization`]; the reverse conversion lives next to
//! `OptError`.
//!
//! ## Conventions
//! - **Step indices are 0-based** and refer to rows of the observation panel.
//! - `matrix` fields name the offending quantity using the usual state-space
//!   symbols (`"Z"`, `"T"`, `"H"`, `"R"`, `"Q"`, `"F"`, `"P"`, ...).
//! - Shapes are reported as `(rows, cols)`.
//! - Non-convergence of the optimizer is **not** an error; it is reported via
//!   `FitResult::converged`.
use crate::optimization::errors::OptError;

/// Result alias for state-space operations that may produce [`KalmanError`].
pub type KalmanResult<T> = Result<T, KalmanError>;

/// Unified error type for filtering, estimation and simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum KalmanError {
    // ---- Numerical ----
    /// A matrix that must be positive-definite (or PSD, for noise factors)
    /// could not be factorized, or the recursion produced non-finite values.
    NumericalSingularity { step: usize, matrix: &'static str },

    // ---- Shapes ----
    /// A system matrix or input does not match the run's declared dimensions.
    ShapeMismatch {
        step: usize,
        matrix: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Observation panel has no rows (or no columns).
    EmptyObservations,

    // ---- Estimator configuration ----
    /// Exactly one of `link` / `unlink` was supplied.
    MissingLinkPair,

    /// Optimizer vector length differs from what the link expects.
    ThetaLengthMismatch { expected: usize, found: usize },

    /// Log-likelihood at the initial guess or at the optimum is not finite.
    NonFiniteLogLikelihood { value: f64 },

    // ---- Parameters ----
    /// A parameter required by the dynamics is absent from the set.
    MissingParameter { name: String },

    /// A parameter exists but holds the wrong kind of value.
    ParameterKindMismatch { name: String, expected: &'static str },

    /// A constrained parameter lies outside the domain its unlink accepts.
    ParameterOutOfDomain { name: String, value: f64, reason: &'static str },

    // ---- Covariates ----
    /// The dynamics needs covariates but none were supplied.
    MissingCovariates,

    /// The covariate panel is too short for the requested step.
    CovariateRowsOutOfRange { step: usize, needed: usize, available: usize },

    // ---- Simulation ----
    /// `n_steps` and `n_paths` must both be positive.
    InvalidSimulationSize { n_steps: usize, n_paths: usize },

    // ---- Optimizer ----
    /// Optimizer/backend failure.
    Optimization(OptError),
}

impl std::error::Error for KalmanError {}

impl std::fmt::Display for KalmanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Numerical ----
            KalmanError::NumericalSingularity { step, matrix } => {
                write!(f, "Matrix {matrix} is not positive-definite or not finite at step {step}.")
            }
            // ---- Shapes ----
            KalmanError::ShapeMismatch { step, matrix, expected, found } => {
                write!(
                    f,
                    "Shape mismatch for {matrix} at step {step}: expected {expected:?}, found {found:?}"
                )
            }
            KalmanError::EmptyObservations => {
                write!(f, "Observation panel is empty.")
            }
            // ---- Estimator configuration ----
            KalmanError::MissingLinkPair => {
                write!(f, "link and unlink must be supplied together.")
            }
            KalmanError::ThetaLengthMismatch { expected, found } => {
                write!(f, "Parameter vector length mismatch: expected {expected}, found {found}")
            }
            KalmanError::NonFiniteLogLikelihood { value } => {
                write!(f, "Log-likelihood is not finite: {value}")
            }
            // ---- Parameters ----
            KalmanError::MissingParameter { name } => {
                write!(f, "Missing parameter '{name}'.")
            }
            KalmanError::ParameterKindMismatch { name, expected } => {
                write!(f, "Parameter '{name}' must be a {expected}.")
            }
            KalmanError::ParameterOutOfDomain { name, value, reason } => {
                write!(f, "Parameter '{name}' = {value} is out of domain: {reason}")
            }
            // ---- Covariates ----
            KalmanError::MissingCovariates => {
                write!(f, "Dynamics requires covariates but none were supplied.")
            }
            KalmanError::CovariateRowsOutOfRange { step, needed, available } => {
                write!(
                    f,
                    "Covariates too short at step {step}: need {needed} rows, have {available}"
                )
            }
            // ---- Simulation ----
            KalmanError::InvalidSimulationSize { n_steps, n_paths } => {
                write!(
                    f,
                    "Simulation size must be positive; got n_steps = {n_steps}, n_paths = {n_paths}"
                )
            }
            // ---- Optimizer ----
            KalmanError::Optimization(err) => {
                write!(f, "Optimization failed: {err}")
            }
        }
    }
}

impl From<OptError> for KalmanError {
    fn from(err: OptError) -> Self {
        KalmanError::Optimization(err)
    }
}

impl KalmanError {
    /// Whether the error marks an infeasible parameter proposal that an
    /// optimizer should reject rather than abort on.
    pub fn is_recoverable_proposal(&self) -> bool {
        matches!(
            self,
            KalmanError::NumericalSingularity { .. } | KalmanError::ShapeMismatch { .. }
        )
    }
}
