//! estimator — maximum-likelihood fitting of state-space models.
//!
//! Purpose
//! -------
//! Wrap the filter engine inside the L-BFGS log-likelihood maximizer. The
//! optimizer searches an unconstrained vector `θ`; a link/unlink pair maps it
//! to and from the model's constrained [`ParamSet`].
//!
//! Key behaviors
//! -------------
//! - `link`/`unlink` must be supplied together; supplying exactly one is
//!   rejected with `MissingLinkPair` before any filtering. Without either,
//!   the identity flattening of [`ParamLayout`] is used.
//! - A proposal for which the filter raises `NumericalSingularity` or
//!   `ShapeMismatch` evaluates to `ℓ = -∞`, which the line search rejects;
//!   those errors never escape the optimization loop. An initial guess that
//!   already fails is reported with the filter's error.
//! - If a More–Thuente or Hager–Zhang run fails inside the backend, or the
//!   solver abandons it (a trial step it cannot evaluate), the fit is retried
//!   once with Armijo backtracking from the best point of the failed run. If
//!   every attempt fails the fit still returns, at the best point evaluated,
//!   with `converged = false`.
//! - At the optimum the filter is re-run once to materialize the full step
//!   records; the gradient and (optionally) the inverse observed information
//!   are obtained by finite differences. The gradient steps one-sided next to
//!   a rejected region.
//!
//! Invariants & assumptions
//! ------------------------
//! - Exogenous covariates are an explicit argument threaded to the dynamics
//!   through `StepContext`; they are never stored in the parameter set.
//! - The filter's own errors during the final replay at the optimum
//!   propagate to the caller.
//!
//! Conventions
//! -----------
//! - `FitResult::gradient` and `FitResult::inverse_hessian` live in `θ`
//!   space; the gradient is that of `ℓ`, the inverse Hessian that of `-ℓ`.
//! - Rejected proposals are logged at `debug`, retries and non-convergence at
//!   `warn`, and the fit summary at `info`.
use crate::{
    inference::hessian::{central_gradient_scaled, inverse_observed_information, standard_errors},
    kalman::{
        core::{
            carry::Carry,
            dynamics::Dynamics,
            filter::FilterEngine,
            linalg::{LinalgBackend, NalgebraBackend},
            options::FitOptions,
            params::{ParamLayout, ParamSet},
            record::FilterOutput,
        },
        errors::{KalmanError, KalmanResult},
    },
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{
            Cost, Grad, LineSearcher, LogLikelihood, MLEOptions, Theta, finite_diff::cost_gradient,
            maximize,
        },
    },
};
use ndarray::{Array1, Array2, ArrayView2};
use std::cell::RefCell;

/// Relative step of the inner gradient used to build the observed
/// information.
pub const HESSIAN_GRAD_STEP: f64 = 1e-4;

/// Maps an unconstrained vector to constrained parameters.
pub type LinkFn<'a> = dyn Fn(&Theta) -> KalmanResult<ParamSet> + 'a;

/// Maps constrained parameters to an unconstrained vector.
pub type UnlinkFn<'a> = dyn Fn(&ParamSet) -> KalmanResult<Theta> + 'a;

/// Resolved reparameterization used during a fit.
pub enum LinkPair<'a> {
    /// Flatten/unflatten by name and shape.
    Identity(ParamLayout),
    /// Caller-supplied bijection.
    Custom { link: &'a LinkFn<'a>, unlink: &'a UnlinkFn<'a> },
}

impl<'a> LinkPair<'a> {
    /// Resolve the optional pair against the initial guess.
    ///
    /// # Errors
    /// - `MissingLinkPair` when exactly one of `link`/`unlink` is given.
    pub fn resolve(
        initial_guess: &ParamSet, link: Option<&'a LinkFn<'a>>, unlink: Option<&'a UnlinkFn<'a>>,
    ) -> KalmanResult<Self> {
        match (link, unlink) {
            (None, None) => Ok(LinkPair::Identity(ParamLayout::of(initial_guess))),
            (Some(link), Some(unlink)) => Ok(LinkPair::Custom { link, unlink }),
            _ => Err(KalmanError::MissingLinkPair),
        }
    }

    pub fn link(&self, theta: &Theta) -> KalmanResult<ParamSet> {
        match self {
            LinkPair::Identity(layout) => layout.unflatten(theta),
            LinkPair::Custom { link, .. } => link(theta),
        }
    }

    pub fn unlink(&self, params: &ParamSet) -> KalmanResult<Theta> {
        match self {
            LinkPair::Identity(layout) => layout.flatten(params),
            LinkPair::Custom { unlink, .. } => unlink(params),
        }
    }
}

/// The fit objective: `θ ↦ ℓ(link(θ))` through one filter pass.
pub struct KalmanObjective<'a, D: ?Sized, B: LinalgBackend> {
    engine: &'a FilterEngine<B>,
    observations: ArrayView2<'a, f64>,
    covariates: Option<ArrayView2<'a, f64>>,
    carry0: &'a Carry,
    dynamics: &'a D,
    link: &'a LinkPair<'a>,
}

impl<'a, D: Dynamics + ?Sized, B: LinalgBackend> KalmanObjective<'a, D, B> {
    pub fn new(
        engine: &'a FilterEngine<B>, observations: ArrayView2<'a, f64>,
        covariates: Option<ArrayView2<'a, f64>>, carry0: &'a Carry, dynamics: &'a D,
        link: &'a LinkPair<'a>,
    ) -> Self {
        Self { engine, observations, covariates, carry0, dynamics, link }
    }

    /// Run the filter at `θ`, propagating every error.
    pub fn evaluate(&self, theta: &Theta) -> KalmanResult<FilterOutput> {
        let params = self.link.link(theta)?;
        self.engine.run(self.observations, self.dynamics, &params, self.covariates, self.carry0)
    }

    /// Finite-difference `∇ℓ(θ)`, one-sided in coordinates that border a
    /// rejected region.
    ///
    /// # Errors
    /// - Errors of the filter other than rejected proposals.
    /// - `InvalidGradient` when a coordinate has no finite difference.
    pub fn gradient(&self, theta: &Theta) -> KalmanResult<Grad> {
        let cost = |t: &Theta| self.loglik(t).map(|ll| -ll).map_err(argmin::core::Error::from);
        let grad = cost_gradient(&cost, theta).map_err(OptError::from)?;
        Ok(-grad)
    }

    /// `ℓ(θ)`, with infeasible proposals mapped to `-∞`.
    fn loglik(&self, theta: &Theta) -> OptResult<f64> {
        match self.evaluate(theta) {
            Ok(out) => {
                let ll = out.loglikelihood();
                Ok(if ll.is_finite() { ll } else { f64::NEG_INFINITY })
            }
            Err(err) if err.is_recoverable_proposal() => {
                log::debug!("rejecting proposal {theta}: {err}");
                Ok(f64::NEG_INFINITY)
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl<'a, D: Dynamics + ?Sized, B: LinalgBackend> LogLikelihood for KalmanObjective<'a, D, B> {
    type Data = ();

    fn value(&self, theta: &Theta, _data: &()) -> OptResult<Cost> {
        self.loglik(theta)
    }

    fn check(&self, theta: &Theta, _data: &()) -> OptResult<()> {
        match theta.iter().position(|v| !v.is_finite()) {
            Some(index) => Err(OptError::InvalidThetaInput { index, value: theta[index] }),
            None => Ok(()),
        }
    }
}

/// Output of [`fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Constrained parameters at the optimum.
    pub params: ParamSet,
    /// Unconstrained optimum `θ̂`.
    pub theta_hat: Theta,
    /// `ℓ(θ̂)` without the `2π` constant.
    pub loglikelihood: f64,
    pub iterations: usize,
    /// `true` only when the solver met its convergence criteria.
    pub converged: bool,
    /// Termination status reported by the optimizer.
    pub status: String,
    /// Finite-difference `∇ℓ(θ̂)`.
    pub gradient: Grad,
    /// Pseudoinverse of the observed information of `-ℓ` at `θ̂`.
    pub inverse_hessian: Option<Array2<f64>>,
    /// Filter output at the optimum.
    pub filter: FilterOutput,
    /// Number of observed scalar entries.
    pub n_obs: usize,
}

impl FitResult {
    /// Number of free parameters.
    pub fn n_params(&self) -> usize {
        self.theta_hat.len()
    }

    /// Standard errors of `θ̂` (unconstrained space).
    pub fn standard_errors(&self) -> Option<Array1<f64>> {
        self.inverse_hessian.as_ref().map(standard_errors)
    }

    pub fn loglikelihood_with_constant(&self) -> f64 {
        self.filter.loglikelihood_with_constant()
    }

    /// Akaike information criterion, `2k − 2ℓ`.
    pub fn aic(&self) -> f64 {
        2.0 * self.n_params() as f64 - 2.0 * self.loglikelihood_with_constant()
    }

    /// Bayesian information criterion, `k ln n − 2ℓ`.
    pub fn bic(&self) -> f64 {
        self.n_params() as f64 * (self.n_obs as f64).ln() - 2.0 * self.loglikelihood_with_constant()
    }
}

/// Maximum-likelihood estimator parameterized by its linear-algebra backend.
#[derive(Debug, Clone)]
pub struct Estimator<B: LinalgBackend = NalgebraBackend> {
    engine: FilterEngine<B>,
}

impl Default for Estimator<NalgebraBackend> {
    fn default() -> Self {
        Self::new(NalgebraBackend)
    }
}

impl<B: LinalgBackend> Estimator<B> {
    pub fn new(backend: B) -> Self {
        Self { engine: FilterEngine::new(backend) }
    }

    /// Fit the model by maximum likelihood.
    ///
    /// # Errors
    /// - `MissingLinkPair` if exactly one of `link`/`unlink` is supplied.
    /// - `EmptyObservations` for an empty panel.
    /// - Any filter error at the initial guess, and
    ///   `NonFiniteLogLikelihood` if `ℓ` is not finite there.
    /// - Link/unlink and dynamics errors other than singularities or shape
    ///   mismatches, and any filter error in the final run at the optimum.
    /// - `InvalidGradient` when the gradient at the optimum has no finite
    ///   difference in some coordinate.
    #[allow(clippy::too_many_arguments)]
    pub fn fit<D: Dynamics + ?Sized>(
        &self, observations: ArrayView2<f64>, initial_guess: &ParamSet,
        covariates: Option<ArrayView2<f64>>, carry0: &Carry, dynamics: &D,
        link: Option<&LinkFn<'_>>, unlink: Option<&UnlinkFn<'_>>, options: &FitOptions,
    ) -> KalmanResult<FitResult> {
        let link_pair = LinkPair::resolve(initial_guess, link, unlink)?;
        if observations.nrows() == 0 || observations.ncols() == 0 {
            return Err(KalmanError::EmptyObservations);
        }

        let theta0 = link_pair.unlink(initial_guess)?;
        let objective = KalmanObjective::new(
            &self.engine,
            observations.view(),
            covariates.as_ref().map(|c| c.view()),
            carry0,
            dynamics,
            &link_pair,
        );
        let ll0 = objective.evaluate(&theta0)?.loglikelihood();
        if !ll0.is_finite() {
            return Err(KalmanError::NonFiniteLogLikelihood { value: ll0 });
        }

        let optimum = optimize(&objective, &theta0, &options.mle)?;
        let params = link_pair.link(&optimum.theta_hat)?;
        let filter = self.engine.run(observations, dynamics, &params, covariates, carry0)?;
        let loglikelihood = filter.loglikelihood();
        if !loglikelihood.is_finite() {
            return Err(KalmanError::NonFiniteLogLikelihood { value: loglikelihood });
        }

        let gradient = objective.gradient(&optimum.theta_hat)?;
        let ll_fn = |theta: &Theta| objective.loglik(theta).unwrap_or(f64::NAN);
        let inverse_hessian = if options.compute_inverse_hessian {
            observed_information_inverse(&ll_fn, &optimum.theta_hat)
        } else {
            None
        };

        let n_obs = filter.n_observed();
        log::info!(
            "fit: ell = {:.6}, iterations = {}, converged = {}, status = {}",
            loglikelihood,
            optimum.iterations,
            optimum.converged,
            optimum.status
        );
        if !optimum.converged {
            log::warn!("optimizer stopped without convergence: {}", optimum.status);
        }

        Ok(FitResult {
            params,
            theta_hat: optimum.theta_hat,
            loglikelihood,
            iterations: optimum.iterations,
            converged: optimum.converged,
            status: optimum.status,
            gradient,
            inverse_hessian,
            filter,
            n_obs,
        })
    }
}

/// Fit with the default `nalgebra` backend. See [`Estimator::fit`].
#[allow(clippy::too_many_arguments)]
pub fn fit<D: Dynamics + ?Sized>(
    observations: ArrayView2<f64>, initial_guess: &ParamSet, covariates: Option<ArrayView2<f64>>,
    carry0: &Carry, dynamics: &D, link: Option<&LinkFn<'_>>, unlink: Option<&UnlinkFn<'_>>,
    options: &FitOptions,
) -> KalmanResult<FitResult> {
    Estimator::default().fit(
        observations,
        initial_guess,
        covariates,
        carry0,
        dynamics,
        link,
        unlink,
        options,
    )
}

// ---- Helper methods ----

struct Optimum {
    theta_hat: Theta,
    iterations: usize,
    converged: bool,
    status: String,
}

/// Run the maximizer, retrying once with backtracking when another line
/// search fails or is abandoned by the solver.
fn optimize<F: LogLikelihood<Data = ()>>(
    objective: &F, theta0: &Theta, mle: &MLEOptions,
) -> KalmanResult<Optimum> {
    let mut attempts = vec![mle.clone()];
    if mle.line_searcher != LineSearcher::Backtracking {
        attempts.push(MLEOptions { line_searcher: LineSearcher::Backtracking, ..mle.clone() });
    }

    let tracked = BestSeen::new(objective);
    let mut start = theta0.clone();
    let mut iterations = 0;
    let mut status = "optimizer failed".to_string();
    for (i, opts) in attempts.iter().enumerate() {
        let last_attempt = i + 1 == attempts.len();
        match maximize(&tracked, start.clone(), &(), opts) {
            Ok(outcome) => {
                iterations += outcome.iterations;
                if !outcome.aborted || last_attempt {
                    return Ok(Optimum {
                        theta_hat: outcome.theta_hat,
                        iterations,
                        converged: outcome.converged,
                        status: outcome.status,
                    });
                }
                log::warn!("line search {:?} abandoned: {}", opts.line_searcher, outcome.status);
                start = outcome.theta_hat;
                status = outcome.status;
            }
            Err(err) if is_fatal(&err) => return Err(err.into()),
            Err(err) => {
                log::warn!("line search {:?} failed: {err}", opts.line_searcher);
                if let Some(best) = tracked.best() {
                    start = best;
                }
                status = format!("optimizer failed: {err}");
            }
        }
    }

    let theta_hat = tracked.best().unwrap_or_else(|| theta0.clone());
    Ok(Optimum { theta_hat, iterations, converged: false, status })
}

/// Delegates to a log-likelihood and remembers the best finite point seen.
struct BestSeen<'f, F> {
    inner: &'f F,
    best: RefCell<Option<(Theta, f64)>>,
}

impl<'f, F: LogLikelihood<Data = ()>> BestSeen<'f, F> {
    fn new(inner: &'f F) -> Self {
        Self { inner, best: RefCell::new(None) }
    }

    fn best(&self) -> Option<Theta> {
        self.best.borrow().as_ref().map(|(theta, _)| theta.clone())
    }
}

impl<'f, F: LogLikelihood<Data = ()>> LogLikelihood for BestSeen<'f, F> {
    type Data = ();

    fn value(&self, theta: &Theta, data: &()) -> OptResult<Cost> {
        let ll = self.inner.value(theta, data)?;
        if ll.is_finite() {
            let mut best = self.best.borrow_mut();
            if best.as_ref().map_or(true, |(_, top)| ll > *top) {
                *best = Some((theta.clone(), ll));
            }
        }
        Ok(ll)
    }

    fn check(&self, theta: &Theta, data: &()) -> OptResult<()> {
        self.inner.check(theta, data)
    }

    fn grad(&self, theta: &Theta, data: &()) -> OptResult<Grad> {
        self.inner.grad(theta, data)
    }
}

/// Errors that signal a broken model rather than a hard region of θ.
fn is_fatal(err: &OptError) -> bool {
    matches!(err, OptError::ModelFailure { .. } | OptError::InvalidThetaInput { .. })
}

/// Pseudoinverse of the Hessian of `-ℓ`, or `None` if it is not finite.
fn observed_information_inverse<F: Fn(&Theta) -> f64>(
    ll_fn: &F, theta_hat: &Theta,
) -> Option<Array2<f64>> {
    let cost = |theta: &Theta| -ll_fn(theta);
    let cost_grad = |theta: &Theta| central_gradient_scaled(&cost, theta, HESSIAN_GRAD_STEP);
    match inverse_observed_information(&cost_grad, theta_hat) {
        Ok(inv) if inv.iter().all(|v| v.is_finite()) => Some(inv),
        Ok(_) => {
            log::warn!("inverse Hessian is not finite");
            None
        }
        Err(err) => {
            log::warn!("inverse Hessian unavailable: {err}");
            None
        }
    }
}
