//! errors — the optimizer's error type.
//!
//! One enum covers bad configuration, non-finite numerics (costs, gradients,
//! Hessians, estimates), failures inside argmin, and state-space model errors
//! that surfaced while the objective was evaluated.
use argmin::core::{ArgminError, Error};

use crate::kalman::errors::KalmanError;

pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// The model has no analytic gradient; differences are used instead.
    GradientNotImplemented,
    GradientDimMismatch { expected: usize, found: usize },
    InvalidGradient { index: usize, value: f64, reason: &'static str },

    // ---- Configuration ----
    InvalidTolGrad { tol: f64, reason: &'static str },
    InvalidTolCost { tol: f64, reason: &'static str },
    InvalidMaxIter { max_iter: usize, reason: &'static str },
    NoTolerancesProvided,
    InvalidLineSearch { name: String, reason: &'static str },
    InvalidLBFGSMem { mem: usize, reason: &'static str },

    // ---- Evaluation ----
    /// `ℓ(θ)` was `NaN` or `+∞`.
    NonFiniteCost { value: f64 },
    /// A starting point with a non-finite coordinate.
    InvalidThetaInput { index: usize, value: f64 },
    /// The state-space layer failed for a reason other than a rejected
    /// proposal (missing parameter, malformed covariates, ...).
    ModelFailure { text: String },

    // ---- Outcome ----
    InvalidThetaHat { index: usize, value: f64, reason: &'static str },
    MissingThetaHat,
    HessianDimMismatch { expected: usize, found: (usize, usize) },
    InvalidHessian { row: usize, col: usize, value: f64 },

    // ---- argmin ----
    /// An error raised by argmin itself; `kind` names argmin's category.
    Backend { kind: &'static str, text: String },
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptError::GradientNotImplemented => write!(f, "No analytic gradient available"),
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient has {found} entries, expected {expected}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Gradient entry {index} is {value}: {reason}")
            }
            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Gradient tolerance {tol} rejected: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Cost tolerance {tol} rejected: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Iteration cap {max_iter} rejected: {reason}")
            }
            OptError::NoTolerancesProvided => {
                write!(f, "At least one of tol_grad, tol_cost or max_iter is required")
            }
            OptError::InvalidLineSearch { name, reason } => {
                write!(f, "Unknown line search '{name}': {reason}")
            }
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "L-BFGS history size {mem} rejected: {reason}")
            }
            OptError::NonFiniteCost { value } => write!(f, "Log-likelihood evaluated to {value}"),
            OptError::InvalidThetaInput { index, value } => {
                write!(f, "Starting parameter {index} is {value}; all entries must be finite")
            }
            OptError::ModelFailure { text } => write!(f, "Model evaluation failed: {text}"),
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Estimate {index} is {value}: {reason}")
            }
            OptError::MissingThetaHat => write!(f, "Solver finished without a best parameter"),
            OptError::HessianDimMismatch { expected, found } => {
                write!(f, "Hessian is {}x{}, expected {expected}x{expected}", found.0, found.1)
            }
            OptError::InvalidHessian { row, col, value } => {
                write!(f, "Hessian entry ({row}, {col}) is {value}; all entries must be finite")
            }
            OptError::Backend { kind, text } => write!(f, "argmin error ({kind}): {text}"),
        }
    }
}

impl From<Error> for OptError {
    fn from(err: Error) -> Self {
        let err = match err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match err.downcast::<ArgminError>() {
            Ok(argmin_err) => {
                let (kind, text) = match argmin_err {
                    ArgminError::InvalidParameter { text } => ("invalid parameter", text),
                    ArgminError::NotImplemented { text } => ("not implemented", text),
                    ArgminError::NotInitialized { text } => ("not initialized", text),
                    ArgminError::ConditionViolated { text } => ("condition violated", text),
                    ArgminError::CheckpointNotFound { text } => ("checkpoint not found", text),
                    ArgminError::PotentialBug { text } => ("potential bug", text),
                    ArgminError::ImpossibleError { text } => ("impossible", text),
                    other => ("other", other.to_string()),
                };
                OptError::Backend { kind, text }
            }
            Err(err) => OptError::Backend { kind: "foreign", text: err.to_string() },
        }
    }
}

impl From<KalmanError> for OptError {
    fn from(err: KalmanError) -> Self {
        match err {
            KalmanError::Optimization(opt_err) => opt_err,
            other => OptError::ModelFailure { text: other.to_string() },
        }
    }
}
