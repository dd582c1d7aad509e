//! traits — the model-facing optimizer surface.
//!
//! A model implements [`LogLikelihood`] and is maximized under an
//! [`MLEOptions`] (tolerances, line search, L-BFGS history). The run reports
//! an [`OptimOutcome`] on the log-likelihood scale.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        validation::{validate_theta_hat, validate_value, verify_tol_cost, verify_tol_grad},
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;
use std::str::FromStr;

/// A log-likelihood `ℓ(θ)` over unconstrained parameters.
///
/// `value` returns `Ok(f64::NEG_INFINITY)` for a proposal the model cannot
/// evaluate (outside its domain, singular covariance); the optimizer steps
/// away from it. Errors are reserved for failures that should end the run.
///
/// `check` is called once on the starting point. `grad`, when implemented,
/// returns `∇ℓ`; without it the optimizer differences the cost numerically.
pub trait LogLikelihood {
    type Data: 'static;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Line search run inside each L-BFGS iteration.
///
/// `Backtracking` (Armijo) only compares trial costs and so tolerates the
/// infinite cost of a rejected proposal; `MoreThuente` and `HagerZhang`
/// also use trial gradients. Parsed case-insensitively from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
    Backtracking,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let searcher = match s.to_ascii_lowercase().as_str() {
            "backtracking" => LineSearcher::Backtracking,
            "morethuente" => LineSearcher::MoreThuente,
            "hagerzhang" => LineSearcher::HagerZhang,
            _ => {
                return Err(OptError::InvalidLineSearch {
                    name: s.to_string(),
                    reason: "Valid options are case insensitive 'MoreThuente', 'HagerZhang' or 'Backtracking'.",
                });
            }
        };
        Ok(searcher)
    }
}

/// Optimizer configuration.
///
/// The default is backtracking L-BFGS with history 7, `tol_grad = 1e-6`
/// and at most 300 iterations. `verbose` logs the starting likelihood and,
/// with the `obs_slog` feature, attaches argmin's terminal observer.
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub verbose: bool,
    /// L-BFGS history size; `None` uses `DEFAULT_LBFGS_MEM`.
    pub lbfgs_mem: Option<usize>,
}

impl MLEOptions {
    /// # Errors
    /// `OptError::InvalidLBFGSMem` for a history size of zero.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, verbose: bool, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if lbfgs_mem == Some(0) {
            return Err(OptError::InvalidLBFGSMem {
                mem: 0,
                reason: "L-BFGS memory must be greater than zero.",
            });
        }
        Ok(Self { tols, line_searcher, verbose, lbfgs_mem })
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances { tol_grad: Some(1e-6), tol_cost: None, max_iter: Some(300) },
            line_searcher: LineSearcher::Backtracking,
            verbose: false,
            lbfgs_mem: None,
        }
    }
}

/// Stopping rules: gradient norm, cost change and iteration cap.
///
/// Each is optional, but at least one must be set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// # Errors
    /// - `OptError::NoTolerancesProvided` when every rule is `None`.
    /// - `OptError::InvalidTolGrad` / `OptError::InvalidTolCost` for a
    ///   tolerance that is non-finite or `<= 0`.
    /// - `OptError::InvalidMaxIter` for `max_iter == 0`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if (tol_grad, tol_cost, max_iter) == (None, None, None) {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_grad(tol_grad)?;
        verify_tol_cost(tol_cost)?;
        if max_iter == Some(0) {
            return Err(OptError::InvalidMaxIter {
                max_iter: 0,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

/// Result of [`maximize`](crate::optimization::loglik_optimizer::maximize).
///
/// `value` is `ℓ(θ̂)`, not the cost. `converged` is true only when the
/// solver met a tolerance; stopping at `max_iter` leaves it false, with the
/// reason in `status`. `aborted` marks a run the solver abandoned, e.g. a
/// line search that could not evaluate a trial point. `fn_evals` carries
/// argmin's counters.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub aborted: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// Validate raw solver output and classify its termination.
    ///
    /// # Errors
    /// `OptError::MissingThetaHat`, `OptError::InvalidThetaHat` or
    /// `OptError::NonFiniteCost` when the solver produced no usable optimum.
    pub fn new(
        theta_hat: Option<Theta>, value: f64, termination: TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat)?;
        validate_value(value)?;
        let (converged, aborted, status) = match termination {
            TerminationStatus::NotTerminated => (false, false, "Not terminated".to_string()),
            TerminationStatus::Terminated(reason) => (
                matches!(
                    reason,
                    TerminationReason::SolverConverged | TerminationReason::TargetCostReached
                ),
                matches!(reason, TerminationReason::SolverExit(_)),
                format!("{reason:?}"),
            ),
        };
        Ok(Self {
            theta_hat,
            value,
            converged,
            aborted,
            status,
            iterations: iterations as usize,
            fn_evals,
            grad_norm: grad.map(|g| g.l2_norm()),
        })
    }
}
