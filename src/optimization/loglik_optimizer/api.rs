//! api — `maximize`, the single entry point of the optimizer.
//!
//! Builds an L-BFGS solver around the configured line search, runs it through
//! argmin's `Executor` on the cost `c(θ) = -ℓ(θ)`, and reports the best
//! point on the log-likelihood scale.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        traits::{LineSearcher, LogLikelihood, MLEOptions},
        types::{
            BacktrackingLS, DEFAULT_ARMIJO_C, DEFAULT_BACKTRACK_RHO, DEFAULT_LBFGS_MEM,
            HagerZhangLS, Lbfgs, MoreThuenteLS,
        },
    },
};
use argmin::{
    core::{CostFunction, Executor, IterState, Solver, State},
    solver::linesearch::condition::ArmijoCondition,
};

/// Maximize `ℓ(θ)` with L-BFGS, starting from `theta0`.
///
/// `f.check(theta0, data)` runs first. Iterations stop on the gradient or
/// cost tolerance, or after `opts.tols.max_iter` iterations; the outcome
/// records which.
///
/// # Errors
/// - Anything `f.check` rejects.
/// - Invalid solver configuration (tolerances, line-search constants).
/// - Errors raised by `f` during the run, and line-search failures.
///
/// # Example
/// ```no_run
/// use ndarray::array;
/// use ssm_kalman::optimization::{
///     errors::OptResult,
///     loglik_optimizer::{maximize, traits::LineSearcher, LogLikelihood, MLEOptions, Theta, Tolerances},
/// };
///
/// struct Bowl;
/// impl LogLikelihood for Bowl {
///     type Data = ();
///     fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
///         Ok(-theta.dot(theta))
///     }
///     fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let tols = Tolerances::new(Some(1e-6), None, Some(200))?;
/// let opts = MLEOptions::new(tols, LineSearcher::HagerZhang, false, None)?;
/// let out = maximize(&Bowl, array![0.1, -0.2, 0.3], &(), &opts)?;
/// println!("θ̂ = {:?}", out.theta_hat);
/// # Ok::<(), ssm_kalman::optimization::errors::OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    if opts.verbose {
        log_start(&problem, &theta0);
    }
    match opts.line_searcher {
        LineSearcher::Backtracking => {
            let search = BacktrackingLS::new(ArmijoCondition::new(DEFAULT_ARMIJO_C)?)
                .rho(DEFAULT_BACKTRACK_RHO)?;
            execute(problem, lbfgs(search, opts)?, theta0, opts)
        }
        LineSearcher::MoreThuente => execute(problem, lbfgs(MoreThuenteLS::new(), opts)?, theta0, opts),
        LineSearcher::HagerZhang => execute(problem, lbfgs(HagerZhangLS::new(), opts)?, theta0, opts),
    }
}

// ---- Helper methods ----

fn lbfgs<L>(search: L, opts: &MLEOptions) -> OptResult<Lbfgs<L>> {
    let mut solver = Lbfgs::new(search, opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM));
    if let Some(tol) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(tol)?;
    }
    if let Some(tol) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(tol)?;
    }
    Ok(solver)
}

fn execute<'a, F, S>(
    problem: ArgMinAdapter<'a, F>, solver: S, theta0: Theta, opts: &MLEOptions,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: Solver<ArgMinAdapter<'a, F>, IterState<Theta, Grad, (), (), (), f64>> + Send + 'static,
{
    let max_iters = opts.tols.max_iter.map(|m| m as u64);
    let executor = Executor::new(problem, solver).configure(|state| {
        let state = state.param(theta0);
        match max_iters {
            Some(n) => state.max_iters(n),
            None => state,
        }
    });
    #[cfg(feature = "obs_slog")]
    let executor = if opts.verbose {
        executor.add_observer(
            argmin_observer_slog::SlogLogger::term_noblock(),
            argmin::core::observers::ObserverMode::Always,
        )
    } else {
        executor
    };

    let result = executor.run()?;
    let mut state = result.state().clone();
    log::debug!(
        "L-BFGS stopped after {} iterations: {:?}",
        state.get_iter(),
        state.get_termination_status()
    );
    let gradient = state.take_gradient();
    OptimOutcome::new(
        state.take_best_param(),
        -state.get_best_cost(),
        state.get_termination_status().clone(),
        state.get_iter(),
        state.get_func_counts().clone(),
        gradient,
    )
}

fn log_start<F: LogLikelihood>(problem: &ArgMinAdapter<'_, F>, theta0: &Theta) {
    match problem.cost(theta0) {
        Ok(cost) => log::info!("L-BFGS start: dim = {}, ell(theta0) = {:.6}", theta0.len(), -cost),
        Err(err) => log::warn!("L-BFGS start: ell(theta0) unavailable: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::OptError,
        loglik_optimizer::{Cost, Tolerances},
    };
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Each line search reaching the maximum of a concave quadratic.
    // - Backtracking through a region where ℓ = -∞.
    // - `check` gating the run and iteration caps being honoured.
    // -------------------------------------------------------------------------

    // ℓ(θ) = -(θ₀ - 1)² - 2(θ₁ + 0.5)²; with `walled`, -∞ for θ₀ ≤ 0.
    struct Ridge {
        walled: bool,
    }

    impl LogLikelihood for Ridge {
        type Data = ();

        fn value(&self, theta: &Theta, _: &()) -> OptResult<Cost> {
            if self.walled && theta[0] <= 0.0 {
                return Ok(f64::NEG_INFINITY);
            }
            Ok(-(theta[0] - 1.0).powi(2) - 2.0 * (theta[1] + 0.5).powi(2))
        }

        fn check(&self, theta: &Theta, _: &()) -> OptResult<()> {
            if theta.len() != 2 {
                return Err(OptError::ModelFailure { text: "expected two parameters".into() });
            }
            Ok(())
        }
    }

    fn options(line_searcher: LineSearcher, max_iter: usize) -> MLEOptions {
        let tols = Tolerances::new(Some(1e-6), None, Some(max_iter)).unwrap();
        MLEOptions::new(tols, line_searcher, false, None).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // All three line searches find the maximizer (1, -0.5) with ℓ = 0.
    fn every_line_search_reaches_the_maximum() {
        for searcher in
            [LineSearcher::Backtracking, LineSearcher::MoreThuente, LineSearcher::HagerZhang]
        {
            // Act
            let out = maximize(&Ridge { walled: false }, array![1.5, 0.5], &(), &options(searcher, 200))
                .unwrap();

            // Assert
            assert!(out.converged, "{searcher:?}: {}", out.status);
            assert!(!out.aborted);
            assert_abs_diff_eq!(out.theta_hat[0], 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(out.theta_hat[1], -0.5, epsilon = 1e-5);
            assert_abs_diff_eq!(out.value, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    // Purpose
    // -------
    // A first step that overshoots into θ₀ ≤ 0 is shrunk by backtracking
    // instead of aborting the run.
    //
    // Given
    // -----
    // - θ = (3, -0.5): the unit steepest-descent step lands at θ₀ = -1.
    //
    // Expect
    // ------
    // - The run converges to the interior maximum.
    fn backtracking_recovers_from_rejected_steps() {
        // Act
        let out = maximize(
            &Ridge { walled: true },
            array![3.0, -0.5],
            &(),
            &options(LineSearcher::Backtracking, 300),
        )
        .unwrap();

        // Assert
        assert!(out.converged);
        assert_abs_diff_eq!(out.theta_hat[0], 1.0, epsilon = 1e-5);
        assert!(out.theta_hat[0] > 0.0);
    }

    #[test]
    // Purpose
    // -------
    // `check` runs before any evaluation, and `max_iter` caps the run.
    fn check_gates_and_iteration_cap_applies() {
        // Act
        let ridge = Ridge { walled: false };
        let rejected = maximize(&ridge, array![1.0], &(), &options(LineSearcher::Backtracking, 10));
        let capped =
            maximize(&ridge, array![4.0, 3.0], &(), &options(LineSearcher::Backtracking, 1)).unwrap();

        // Assert
        assert!(matches!(rejected, Err(OptError::ModelFailure { .. })));
        assert!(capped.iterations <= 1);
        assert!(!capped.converged);
    }
}
