//! simulator — Monte Carlo paths from a fitted state-space model.
//!
//! Purpose
//! -------
//! Draw `n_paths` trajectories of length `n_steps` from the model implied by
//! a parameter set, starting from the terminal carry of a fit (or any carry
//! supplied by the caller).
//!
//! Key behaviors
//! -------------
//! - The filter is replayed once in [`FilterMode::Replay`] over a zero panel:
//!   with the gain fixed at zero it propagates the predictive mean `a_t` and
//!   covariance `P_t` and records every step's system matrices. The
//!   dynamics sees `StepContext::replay = true`, so score-driven providers
//!   keep their transition at the no-information value.
//! - Each path draws a deviation `d_0 ~ N(0, P_0)` and then, for every step,
//!   `ε_t ~ N(0, H_t)`, `y_t = Z_t (a_t + d_t) + ε_t`,
//!   `η_t ~ N(0, Q_t)` and `d_{t+1} = T_t d_t + R_t η_t`. The simulated
//!   state is `a_t + d_t`, so `y_t` has mean `Z_t a_t` and covariance
//!   `F_t = Z_t P_t Z_tᵀ + H_t`, the replay record's innovation covariance.
//! - Paths are independent and, by default, drawn in parallel with `rayon`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Path `i` uses `ChaCha8Rng::seed_from_u64(seed)` on stream `i`, so
//!   results depend only on `(seed, i)` and are identical whether paths run
//!   in parallel or sequentially.
//! - Noise and initial covariances must be PSD; factors come from
//!   [`LinalgBackend::psd_factor`], which accepts singular matrices.
//! - Covariates, when the dynamics needs them, are indexed from the first
//!   simulated step.
//!
//! Conventions
//! -----------
//! - Output arrays are `(n_paths, n_steps, ·)`.
use crate::kalman::{
    core::{
        carry::Carry,
        dynamics::Dynamics,
        filter::{FilterEngine, FilterMode},
        linalg::{LinalgBackend, NalgebraBackend},
        options::SimOptions,
        params::ParamSet,
        record::FilterOutput,
    },
    errors::{KalmanError, KalmanResult},
    estimator::FitResult,
};
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;

/// Simulated panels plus the replay that produced their moments.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutput {
    /// Observations, `(n_paths, n_steps, p)`.
    pub y: Array3<f64>,
    /// State disturbances `η_t`, `(n_paths, n_steps, m)`.
    pub eta: Array3<f64>,
    /// Observation disturbances `ε_t`, `(n_paths, n_steps, p)`.
    pub eps: Array3<f64>,
    /// Initial deviations `d_0`, `(n_paths, k)`.
    pub initial_deviation: Array2<f64>,
    /// Replay-mode filter run over the horizon.
    pub replay: FilterOutput,
}

impl SimulationOutput {
    pub fn n_paths(&self) -> usize {
        self.y.len_of(Axis(0))
    }

    pub fn n_steps(&self) -> usize {
        self.y.len_of(Axis(1))
    }

    /// Predictive means `Z_t a_t`, stacked as `n_steps × p`.
    pub fn predictive_means(&self, carry0: &Carry) -> Array2<f64> {
        let dims = self.replay.dims();
        let mut out = Array2::zeros((self.replay.len(), dims.p));
        let mut a = carry0.a.clone();
        for (t, record) in self.replay.records().iter().enumerate() {
            out.row_mut(t).assign(&record.system.z.dot(&a));
            a = record.state.clone();
        }
        out
    }

    /// Predictive covariances `F_t`.
    pub fn predictive_covariances(&self) -> Vec<Array2<f64>> {
        self.replay.records().iter().map(|r| r.innovation_cov.clone()).collect()
    }
}

/// Path simulator parameterized by its linear-algebra backend.
#[derive(Debug, Clone)]
pub struct Simulator<B: LinalgBackend = NalgebraBackend> {
    engine: FilterEngine<B>,
}

impl Default for Simulator<NalgebraBackend> {
    fn default() -> Self {
        Self::new(NalgebraBackend)
    }
}

impl<B: LinalgBackend> Simulator<B> {
    pub fn new(backend: B) -> Self {
        Self { engine: FilterEngine::new(backend).with_mode(FilterMode::Replay) }
    }

    /// Simulate from a fit, starting at its terminal carry.
    ///
    /// # Errors
    /// See [`Simulator::simulate_from`].
    pub fn simulate<D: Dynamics + ?Sized>(
        &self, fit: &FitResult, n_steps: usize, n_paths: usize, dynamics: &D,
        covariates: Option<ArrayView2<f64>>, options: &SimOptions,
    ) -> KalmanResult<SimulationOutput> {
        let carry0 = fit.filter.terminal_carry().ok_or(KalmanError::EmptyObservations)?;
        let n_series = fit.filter.dims().p;
        self.simulate_from(
            &fit.params,
            &carry0,
            n_series,
            n_steps,
            n_paths,
            dynamics,
            covariates,
            options,
        )
    }

    /// Simulate `n_series`-dimensional observations from explicit parameters
    /// and an initial carry.
    ///
    /// # Errors
    /// - `InvalidSimulationSize` if `n_steps` or `n_paths` is zero.
    /// - Any error of the replay filter run.
    /// - `NumericalSingularity` (`"P"`, `"Q"` or `"H"`) when a covariance
    ///   has no PSD factor.
    #[allow(clippy::too_many_arguments)]
    pub fn simulate_from<D: Dynamics + ?Sized>(
        &self, params: &ParamSet, carry0: &Carry, n_series: usize, n_steps: usize,
        n_paths: usize, dynamics: &D, covariates: Option<ArrayView2<f64>>, options: &SimOptions,
    ) -> KalmanResult<SimulationOutput> {
        if n_steps == 0 || n_paths == 0 {
            return Err(KalmanError::InvalidSimulationSize { n_steps, n_paths });
        }
        let placeholder = Array2::<f64>::zeros((n_steps, n_series));
        let replay = self.engine.run(placeholder.view(), dynamics, params, covariates, carry0)?;

        let plan = PathPlan::new(self.engine.backend(), carry0, &replay)?;
        let draw = |path: usize| plan.draw(options.seed, path);
        let paths: Vec<PathDraw> = if options.parallel {
            (0..n_paths).into_par_iter().map(draw).collect()
        } else {
            (0..n_paths).map(draw).collect()
        };

        let dims = replay.dims();
        let mut y = Array3::zeros((n_paths, n_steps, dims.p));
        let mut eta = Array3::zeros((n_paths, n_steps, dims.m));
        let mut eps = Array3::zeros((n_paths, n_steps, dims.p));
        let mut initial_deviation = Array2::zeros((n_paths, dims.k));
        for (i, path) in paths.into_iter().enumerate() {
            y.index_axis_mut(Axis(0), i).assign(&path.y);
            eta.index_axis_mut(Axis(0), i).assign(&path.eta);
            eps.index_axis_mut(Axis(0), i).assign(&path.eps);
            initial_deviation.row_mut(i).assign(&path.d0);
        }
        log::debug!("simulated {n_paths} paths of {n_steps} steps (seed {})", options.seed);

        Ok(SimulationOutput { y, eta, eps, initial_deviation, replay })
    }
}

/// Simulate with the default `nalgebra` backend. See [`Simulator::simulate`].
pub fn simulate<D: Dynamics + ?Sized>(
    fit: &FitResult, n_steps: usize, n_paths: usize, dynamics: &D,
    covariates: Option<ArrayView2<f64>>, options: &SimOptions,
) -> KalmanResult<SimulationOutput> {
    Simulator::default().simulate(fit, n_steps, n_paths, dynamics, covariates, options)
}

// ---- Helper methods ----

struct PathDraw {
    y: Array2<f64>,
    eta: Array2<f64>,
    eps: Array2<f64>,
    d0: Array1<f64>,
}

/// Per-step quantities shared by every path.
struct PathPlan<'a> {
    replay: &'a FilterOutput,
    a0: &'a Array1<f64>,
    p0_factor: Array2<f64>,
    q_factors: Vec<Array2<f64>>,
    h_factors: Vec<Array2<f64>>,
}

impl<'a> PathPlan<'a> {
    fn new<B: LinalgBackend>(
        backend: &B, carry0: &'a Carry, replay: &'a FilterOutput,
    ) -> KalmanResult<Self> {
        let singular = |step: usize, matrix: &'static str| KalmanError::NumericalSingularity {
            step,
            matrix,
        };
        let p0_factor = backend.psd_factor(carry0.p.view()).ok_or_else(|| singular(0, "P"))?;
        let mut q_factors = Vec::with_capacity(replay.len());
        let mut h_factors = Vec::with_capacity(replay.len());
        for (t, record) in replay.records().iter().enumerate() {
            q_factors.push(backend.psd_factor(record.system.q.view()).ok_or_else(|| singular(t, "Q"))?);
            h_factors.push(backend.psd_factor(record.system.h.view()).ok_or_else(|| singular(t, "H"))?);
        }
        Ok(Self { replay, a0: &carry0.a, p0_factor, q_factors, h_factors })
    }

    fn draw(&self, seed: u64, path: usize) -> PathDraw {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(path as u64);

        let dims = self.replay.dims();
        let n = self.replay.len();
        let mut y = Array2::zeros((n, dims.p));
        let mut eta = Array2::zeros((n, dims.m));
        let mut eps = Array2::zeros((n, dims.p));

        let d0 = self.p0_factor.dot(&standard_normal(&mut rng, dims.k));
        let mut d = d0.clone();
        let mut a = self.a0;
        for (t, record) in self.replay.records().iter().enumerate() {
            let sys = &record.system;
            let eps_t = self.h_factors[t].dot(&standard_normal(&mut rng, dims.p));
            let y_t = sys.z.dot(&(a + &d)) + &eps_t;
            let eta_t = self.q_factors[t].dot(&standard_normal(&mut rng, dims.m));
            d = sys.t.dot(&d) + sys.r.dot(&eta_t);

            y.row_mut(t).assign(&y_t);
            eps.row_mut(t).assign(&eps_t);
            eta.row_mut(t).assign(&eta_t);
            a = &record.state;
        }
        PathDraw { y, eta, eps, d0 }
    }
}

fn standard_normal<R: Rng>(rng: &mut R, n: usize) -> Array1<f64> {
    Array1::from_shape_simple_fn(n, || rng.sample(StandardNormal))
}
