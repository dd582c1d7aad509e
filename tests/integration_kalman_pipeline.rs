//! Integration tests for the state-space filtering, estimation and
//! simulation pipeline.
//!
//! Purpose
//! -------
//! - Validate the public API end to end: filter runs against closed-form
//!   recursions, likelihood behavior around the data-generating parameters,
//!   maximum-likelihood fits with and without a custom link, and the
//!   distribution of simulated paths.
//!
//! Coverage
//! --------
//! - `kalman::core::filter`:
//!   - Scalar recursion against hand-computed values.
//!   - Monotone convergence of `P_t` to the Riccati steady state.
//!   - Equivalence of a fully missing series with the reduced model.
//! - `kalman::estimator`:
//!   - Softplus-linked fit of a local level model, gradient at the optimum,
//!     standard errors and information criteria.
//!   - `MissingLinkPair` and robustness to infeasible proposals.
//!   - Score-driven regression fit.
//! - `kalman::simulator`:
//!   - Sample moments of terminal observations against the model-implied
//!     predictive mean and covariance.
//!   - Simulation from a `FitResult`, seeding and parallel execution.
//!
//! Exclusions
//! ----------
//! - Low-level building blocks (parameter layouts, PSD factors, transforms)
//!   are covered by unit tests.
use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::{Array2, Axis, array, s};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use ssm_kalman::{
    kalman::{
        FilterEngine, FitOptions, KalmanError, KalmanResult, LocalLevel, ParamSet,
        ScoreDrivenRegression, SimOptions, Simulator, fit, simulate,
    },
    optimization::loglik_optimizer::{LineSearcher, MLEOptions, Theta, Tolerances},
};

/// Purpose
/// -------
/// Draw one path of a local level model with `n_series` noisy readings of a
/// shared random walk.
///
/// Returns
/// -------
/// - An `n × n_series` panel; the level starts at 0.
fn simulate_local_level(n: usize, n_series: usize, h: f64, q: f64, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut level = 0.0;
    let mut y = Array2::zeros((n, n_series));
    for t in 0..n {
        for j in 0..n_series {
            let eps: f64 = rng.sample(StandardNormal);
            y[[t, j]] = level + h.sqrt() * eps;
        }
        let eta: f64 = rng.sample(StandardNormal);
        level += q.sqrt() * eta;
    }
    y
}

/// Purpose
/// -------
/// Draw a panel from the score-driven regression with one coefficient.
///
/// Returns
/// -------
/// - `(y, covariates)` with `y` of shape `n × p` and covariates of shape
///   `(n·p) × 1`.
fn simulate_score_driven(
    n: usize, p: usize, phi: f64, beta_bar: f64, alpha: f64, h: f64, seed: u64,
) -> (Array2<f64>, Array2<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let covariates = Array2::from_shape_simple_fn((n * p, 1), || {
        let x: f64 = rng.sample(StandardNormal);
        1.0 + 0.5 * x
    });
    let mut y = Array2::zeros((n, p));
    let mut beta = beta_bar;
    for t in 0..n {
        let m = covariates.slice(s![t * p..(t + 1) * p, 0]);
        let mut mv = 0.0;
        let mut mm = 0.0;
        for j in 0..p {
            let eps: f64 = rng.sample(StandardNormal);
            y[[t, j]] = m[j] * beta + h.sqrt() * eps;
            mv += m[j] * (y[[t, j]] - m[j] * beta);
            mm += m[j] * m[j];
        }
        beta = phi * beta + (1.0 - phi) * beta_bar + alpha * mv / mm;
    }
    (y, covariates)
}

#[test]
// Purpose
// -------
// The filter reproduces the closed-form scalar Kalman recursion step by
// step, including the log-likelihood.
//
// Given
// -----
// - Z = T = R = 1, H = 1, Q = 0.1, a0 = 0, P0 = 1.
// - y = [1.0, -0.5, 0.2].
//
// Expect
// ------
// - a_{t+1} = a_t + P_t/(P_t + H) (y_t − a_t),
//   P_{t+1} = P_t + Q − P_t²/(P_t + H), and
//   ℓ = −0.5 Σ (ln F_t + v_t²/F_t), all to 1e-12.
fn scalar_filter_matches_closed_form_recursion() {
    // Arrange
    let y = array![[1.0], [-0.5], [0.2]];
    let (h, q) = (1.0, 0.1);
    let carry = LocalLevel::initial_carry(0.0, 1.0).expect("valid carry");

    // Act
    let out = FilterEngine::default()
        .run(y.view(), &LocalLevel::new(1), &LocalLevel::params(h, q), None, &carry)
        .expect("filter should run on finite data");

    // Assert
    let (mut a, mut p, mut ll) = (0.0, 1.0, 0.0);
    for (t, record) in out.records().iter().enumerate() {
        let f = p + h;
        let v = y[[t, 0]] - a;
        ll += -0.5 * (f.ln() + v * v / f);
        assert_relative_eq!(record.innovation_cov[[0, 0]], f, epsilon = 1e-12);
        assert_relative_eq!(record.innovation[0], v, epsilon = 1e-12);
        a += p / f * v;
        p = p + q - p * p / f;
        assert_relative_eq!(record.state[0], a, epsilon = 1e-12);
        assert_relative_eq!(record.covariance[[0, 0]], p, epsilon = 1e-12);
    }
    assert_relative_eq!(out.loglikelihood(), ll, epsilon = 1e-12);
    assert_relative_eq!(out.states()[[0, 0]], 0.5, epsilon = 1e-12);
    assert_relative_eq!(out.states()[[1, 0]], 0.125, epsilon = 1e-12);
}

#[test]
// Purpose
// -------
// For a time-invariant model the predicted covariance decreases
// monotonically from a large initial value to the Riccati steady state.
//
// Given
// -----
// - Local level with two series, h = 1, q = 0.1 (equivalent to one series
//   with h/2), P0 = 100, 60 steps.
//
// Expect
// ------
// - trace(P_t) is non-increasing and ends at
//   P* = (q + sqrt(q² + 4 q h/2)) / 2 to 1e-8.
fn covariance_converges_monotonically_to_riccati_solution() {
    // Arrange
    let y = simulate_local_level(60, 2, 1.0, 0.1, 3);
    let carry = LocalLevel::initial_carry(0.0, 100.0).expect("valid carry");
    let (h_eff, q): (f64, f64) = (0.5, 0.1);
    let steady = (q + (q * q + 4.0 * q * h_eff).sqrt()) / 2.0;

    // Act
    let out = FilterEngine::default()
        .run(y.view(), &LocalLevel::new(2), &LocalLevel::params(1.0, q), None, &carry)
        .expect("filter should run");

    // Assert
    let traces: Vec<f64> = out.records().iter().map(|r| r.covariance.diag().sum()).collect();
    assert!(traces[0] < 100.0);
    for w in traces.windows(2) {
        assert!(w[1] <= w[0] + 1e-12, "trace increased: {} -> {}", w[0], w[1]);
    }
    assert_abs_diff_eq!(traces[traces.len() - 1], steady, epsilon = 1e-8);
}

#[test]
// Purpose
// -------
// A series that is never observed leaves states, covariances and the
// likelihood exactly as in the model without that series, and a step with
// no observations propagates the prediction.
//
// Given
// -----
// - 40 steps of a two-series local level where the second column is NaN.
// - The same first column fed to a one-series model.
// - Then the same two-series panel with step 10 entirely missing.
//
// Expect
// ------
// - Identical states, covariances and ℓ (with and without the constant).
// - At the all-missing step: a' = a and P' = P + q.
fn missing_series_matches_reduced_model() {
    // Arrange
    let full = simulate_local_level(40, 2, 0.8, 0.2, 5);
    let mut panel = full.clone();
    panel.column_mut(1).fill(f64::NAN);
    let reduced = full.slice(s![.., 0..1]).to_owned();
    let params = LocalLevel::params(0.8, 0.2);
    let carry = LocalLevel::initial_carry(0.0, 5.0).expect("valid carry");
    let engine = FilterEngine::default();

    // Act
    let with_missing =
        engine.run(panel.view(), &LocalLevel::new(2), &params, None, &carry).expect("masked run");
    let one_series =
        engine.run(reduced.view(), &LocalLevel::new(1), &params, None, &carry).expect("reduced run");
    let mut gap = full.clone();
    gap.row_mut(10).fill(f64::NAN);
    let with_gap = engine.run(gap.view(), &LocalLevel::new(2), &params, None, &carry).expect("gap run");

    // Assert
    for (a, b) in with_missing.records().iter().zip(one_series.records()) {
        assert_relative_eq!(a.state[0], b.state[0], epsilon = 1e-12);
        assert_relative_eq!(a.covariance[[0, 0]], b.covariance[[0, 0]], epsilon = 1e-12);
    }
    assert_relative_eq!(with_missing.loglikelihood(), one_series.loglikelihood(), epsilon = 1e-10);
    assert_relative_eq!(
        with_missing.loglikelihood_with_constant(),
        one_series.loglikelihood_with_constant(),
        epsilon = 1e-10
    );
    assert_eq!(with_missing.n_observed(), 40);

    let before = &with_gap.records()[9];
    let at_gap = &with_gap.records()[10];
    assert_relative_eq!(at_gap.state[0], before.state[0], epsilon = 1e-12);
    assert_relative_eq!(at_gap.covariance[[0, 0]], before.covariance[[0, 0]] + 0.2, epsilon = 1e-12);
    assert_eq!(at_gap.n_observed, 0);
    assert_eq!(at_gap.loglik_term(), 0.0);
}

#[test]
// Purpose
// -------
// A softplus-linked fit of the local level model reaches a local maximum
// near the data-generating parameters.
//
// Given
// -----
// - 300 draws from a single-series local level with h = 1.0, q = 0.3.
// - Initial guess h = 0.4, q = 1.2 and the model's link/unlink pair.
//
// Expect
// ------
// - Convergence, |∇ℓ(θ̂)| < 0.05 in θ-space, ℓ(θ̂) ≥ ℓ(θ₀).
// - ℓ drops when h or q is moved far from the estimate.
// - Finite, positive standard errors; BIC > AIC for n = 300.
fn local_level_fit_reaches_local_maximum() {
    // Arrange
    let y = simulate_local_level(300, 1, 1.0, 0.3, 17);
    let model = LocalLevel::new(1);
    let carry = LocalLevel::initial_carry(y[[0, 0]], 10.0).expect("valid carry");
    let guess = LocalLevel::params(0.4, 1.2);
    let link = |theta: &Theta| model.link(theta);
    let unlink = |params: &ParamSet| model.unlink(params);
    let engine = FilterEngine::default();
    let ll_at = |params: &ParamSet| -> f64 {
        engine.run(y.view(), &model, params, None, &carry).expect("filter run").loglikelihood()
    };

    // Act
    let res = fit(
        y.view(),
        &guess,
        None,
        &carry,
        &model,
        Some(&link),
        Some(&unlink),
        &FitOptions::default(),
    )
    .expect("fit should succeed on simulated data");

    // Assert
    let h = res.params.scalar("h").expect("h present");
    let q = res.params.scalar("q").expect("q present");
    assert!(res.converged, "status: {}", res.status);
    assert!(res.gradient.iter().all(|g| g.abs() < 0.05), "gradient = {}", res.gradient);
    assert!(res.loglikelihood >= ll_at(&guess));
    assert!(h > 0.5 && h < 1.6, "h = {h}");
    assert!(q > 0.1 && q < 0.7, "q = {q}");
    assert!(ll_at(&LocalLevel::params(3.0 * h, q)) < res.loglikelihood);
    assert!(ll_at(&LocalLevel::params(h, 5.0 * q)) < res.loglikelihood);
    assert!(ll_at(&LocalLevel::params(h, 0.1 * q)) < res.loglikelihood);

    let se = res.standard_errors().expect("inverse Hessian available");
    assert_eq!(se.len(), 2);
    assert!(se.iter().all(|v| v.is_finite() && *v > 0.0));
    assert!(res.bic() > res.aic());
    assert_relative_eq!(res.loglikelihood, res.filter.loglikelihood(), epsilon = 1e-12);
}

#[test]
// Purpose
// -------
// The estimator rejects a one-sided link pair and survives infeasible
// proposals under the identity link.
//
// Given
// -----
// - A local level panel.
// - `link` without `unlink`.
// - An identity-link fit started with More–Thuente, where proposals with
//   negative variances make `F` singular.
//
// Expect
// ------
// - `MissingLinkPair` for the one-sided pair.
// - The identity-link fit returns positive variances and a finite ℓ.
fn estimator_guards_link_pair_and_infeasible_proposals() {
    // Arrange
    let y = simulate_local_level(120, 1, 0.5, 0.05, 23);
    let model = LocalLevel::new(1);
    let carry = LocalLevel::initial_carry(y[[0, 0]], 1.0).expect("valid carry");
    let guess = LocalLevel::params(2.0, 1.0);
    let link = |theta: &Theta| model.link(theta);
    let tols = Tolerances::new(Some(1e-6), None, Some(200)).expect("valid tolerances");
    let mle = MLEOptions::new(tols, LineSearcher::MoreThuente, false, None).expect("valid options");
    let options = FitOptions::new(mle, false);

    // Act
    let one_sided = fit(y.view(), &guess, None, &carry, &model, Some(&link), None, &options);
    let identity = fit(y.view(), &guess, None, &carry, &model, None, None, &options);

    // Assert
    assert!(matches!(one_sided, Err(KalmanError::MissingLinkPair)));
    let res = identity.expect("singular proposals must not escape the fit");
    assert!(res.loglikelihood.is_finite());
    assert!(res.params.scalar("h").expect("h present") > 0.0);
    assert!(res.params.scalar("q").expect("q present") > 0.0);
    assert!(res.inverse_hessian.is_none());
}

#[test]
// Purpose
// -------
// Simulated terminal observations have the model-implied predictive mean
// and covariance.
//
// Given
// -----
// - Two-series local level, h = 0.5, q = 0.2, carry a = 1.0, P = 0.3.
// - 5 steps, 20 000 paths.
//
// Expect
// ------
// - Replay at the last step: mean Z a = [1, 1] and
//   F = (0.3 + 4 · 0.2) 11ᵀ + 0.5 I = [[1.6, 1.1], [1.1, 1.6]].
// - Sample mean within 0.05 and sample covariance within 0.08 of them.
fn simulated_moments_match_predictive_distribution() {
    // Arrange
    let model = LocalLevel::new(2);
    let params = LocalLevel::params(0.5, 0.2);
    let carry = LocalLevel::initial_carry(1.0, 0.3).expect("valid carry");
    let n_paths = 20_000;

    // Act
    let out = Simulator::default()
        .simulate_from(&params, &carry, 2, 5, n_paths, &model, None, &SimOptions::new(9, true))
        .expect("simulation should succeed");

    // Assert
    let f_last = &out.predictive_covariances()[4];
    assert_relative_eq!(f_last[[0, 0]], 1.6, epsilon = 1e-12);
    assert_relative_eq!(f_last[[0, 1]], 1.1, epsilon = 1e-12);
    let means = out.predictive_means(&carry);

    let terminal = out.y.index_axis(Axis(1), 4).to_owned();
    let mean = terminal.mean_axis(Axis(0)).expect("non-empty sample");
    let centered = &terminal - &mean;
    let cov = centered.t().dot(&centered) / (n_paths as f64 - 1.0);
    for i in 0..2 {
        assert_abs_diff_eq!(mean[i], means[[4, i]], epsilon = 0.05);
        for j in 0..2 {
            assert_abs_diff_eq!(cov[[i, j]], f_last[[i, j]], epsilon = 0.08);
        }
    }
}

#[test]
// Purpose
// -------
// Simulation from a fit starts at the terminal carry, is reproducible for a
// fixed seed, and does not depend on parallel execution.
//
// Given
// -----
// - A local level fit on 150 draws.
// - 8 steps, 16 paths, seed 11, in parallel and sequentially.
//
// Expect
// ------
// - Shapes (16, 8, 1) for y/eps, (16, 8, 1) for eta, (16, 1) for d_0.
// - Identical outputs for both runs; the replay mean stays at the terminal
//   filtered level.
fn simulation_from_fit_is_reproducible() {
    // Arrange
    let y = simulate_local_level(150, 1, 0.7, 0.1, 31);
    let model = LocalLevel::new(1);
    let carry = LocalLevel::initial_carry(y[[0, 0]], 10.0).expect("valid carry");
    let link = |theta: &Theta| model.link(theta);
    let unlink = |params: &ParamSet| model.unlink(params);
    let res = fit(
        y.view(),
        &LocalLevel::params(1.0, 0.2),
        None,
        &carry,
        &model,
        Some(&link),
        Some(&unlink),
        &FitOptions::default(),
    )
    .expect("fit should succeed");

    // Act
    let par = simulate(&res, 8, 16, &model, None, &SimOptions::new(11, true)).expect("parallel");
    let seq = simulate(&res, 8, 16, &model, None, &SimOptions::new(11, false)).expect("sequential");

    // Assert
    assert_eq!(par.y.dim(), (16, 8, 1));
    assert_eq!(par.eps.dim(), (16, 8, 1));
    assert_eq!(par.eta.dim(), (16, 8, 1));
    assert_eq!(par.initial_deviation.dim(), (16, 1));
    assert_eq!(par, seq);
    let terminal = res.filter.terminal_carry().expect("non-empty fit");
    for record in par.replay.records() {
        assert_relative_eq!(record.state[0], terminal.a[0], epsilon = 1e-12);
    }
}

#[test]
// Purpose
// -------
// The score-driven regression can be fitted through its link pair and
// simulated from the result.
//
// Given
// -----
// - 120 cross-sections of 4 observations with one regressor, generated with
//   φ = 0.8, β̄ = 1.0, α = 0.3, h = 0.5.
// - Initial guess φ = 0.5, β̄ = 0.0, α = 0.1, h = 1.0.
//
// Expect
// ------
// - A finite ℓ(θ̂) ≥ ℓ(θ₀), parameters inside their domains and h̃ within
//   a loose band of the truth.
// - Simulation over 3 steps with fresh covariates yields (10, 3, 4) paths.
fn score_driven_regression_fits_and_simulates() -> KalmanResult<()> {
    // Arrange
    let (y, covariates) = simulate_score_driven(120, 4, 0.8, 1.0, 0.3, 0.5, 41);
    let model = ScoreDrivenRegression::new(4, 1);
    let carry = model.initial_carry(&array![1.0])?;
    let guess = ScoreDrivenRegression::params(array![0.5], array![0.0], 0.1, 1.0);
    let link = |theta: &Theta| model.link(theta);
    let unlink = |params: &ParamSet| model.unlink(params);
    let ll0 = FilterEngine::default()
        .run(y.view(), &model, &guess, Some(covariates.view()), &carry)?
        .loglikelihood();

    // Act
    let res = fit(
        y.view(),
        &guess,
        Some(covariates.view()),
        &carry,
        &model,
        Some(&link),
        Some(&unlink),
        &FitOptions::default(),
    )?;
    let future = Array2::from_elem((3 * 4, 1), 1.0);
    let sims = simulate(&res, 3, 10, &model, Some(future.view()), &SimOptions::default())?;

    // Assert
    assert!(res.loglikelihood.is_finite());
    assert!(res.loglikelihood >= ll0);
    let phi = res.params.vector("phi")?;
    assert!(phi[0] > 0.0 && phi[0] < 1.0);
    assert!(res.params.scalar("alpha")? > 0.0);
    let h = res.params.scalar("h")?;
    assert!(h > 0.25 && h < 1.0, "h = {h}");
    assert_eq!(res.theta_hat.len(), 4);
    assert_eq!(sims.y.dim(), (10, 3, 4));
    assert_eq!(sims.eta.dim(), (10, 3, 1));
    assert!(sims.eta.iter().all(|v| *v == 0.0));
    Ok(())
}
