//! filter — the predict/update recursion of the Kalman filter.
//!
//! Purpose
//! -------
//! Run the forward recursion over an observation panel (one row per step),
//! consulting a [`Dynamics`] provider for the system matrices of each step
//! and emitting one immutable [`StepRecord`] per step.
//!
//! Key behaviors
//! -------------
//! For step `t`, with predicted `(a, P)`:
//! 1. `(Z, T, H, R, Q) = dynamics.system(y_t, a, P, params, ctx)`.
//! 2. `v = y_t − Z a` (zero in components where `y_t` is not finite).
//! 3. `F = Z P Zᵀ + H`, symmetrized, factorized as `F = L Lᵀ`.
//! 4. `L X = Z P` and `Lᵀ G = X` give `G = F⁻¹ Z P`; the gain is
//!    `K = T Gᵀ = T P Zᵀ F⁻¹`.
//! 5. `a' = T a + K v`, `P' = T P Tᵀ + R Q Rᵀ − K F Kᵀ`, with
//!    `K F Kᵀ = (T Xᵀ)(T Xᵀ)ᵀ` and `P'` symmetrized.
//! 6. `L w = v`, `quad = wᵀw`, `logdet = 2 Σ ln L_ii`.
//!
//! In [`FilterMode::Replay`] step 4 is skipped (`K = 0`): the recursion
//! propagates the model-implied predictive mean and covariance while still
//! reporting `F` and its diagnostics.
//!
//! Invariants & assumptions
//! ------------------------
//! - Steps run strictly in order; step `t + 1` consumes step `t`'s output.
//! - `(p, k, m)` are fixed by the panel width, `carry0`, and the first
//!   step's `Q`; every step is validated against them.
//! - A failed factorization or a non-finite propagated state aborts the run
//!   with `NumericalSingularity`; no partial output is returned.
//!
//! Conventions
//! -----------
//! - The backend is an explicit value (`FilterEngine::new(backend)`), not
//!   process-wide state.
//! - The filter does not log; callers decide how to report failures.
use crate::kalman::{
    core::{
        carry::Carry,
        dynamics::{Dynamics, StepContext},
        linalg::{LinalgBackend, NalgebraBackend},
        params::ParamSet,
        record::{FilterOutput, StepRecord},
        system::{ModelDims, SystemMatrices},
    },
    errors::{KalmanError, KalmanResult},
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};

/// Whether the measurement update is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    /// Standard Kalman filter.
    #[default]
    Update,
    /// Gain fixed at zero; observations are placeholders.
    Replay,
}

/// Forward filter parameterized by its linear-algebra backend.
#[derive(Debug, Clone)]
pub struct FilterEngine<B: LinalgBackend = NalgebraBackend> {
    backend: B,
    mode: FilterMode,
}

impl Default for FilterEngine<NalgebraBackend> {
    fn default() -> Self {
        Self::new(NalgebraBackend)
    }
}

impl<B: LinalgBackend> FilterEngine<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, mode: FilterMode::Update }
    }

    pub fn with_mode(mut self, mode: FilterMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run the recursion over every row of `observations`.
    ///
    /// # Errors
    /// - `EmptyObservations` for a panel without rows or columns.
    /// - `ShapeMismatch` when `carry0` or any step's matrices disagree with
    ///   the run's dimensions.
    /// - `NumericalSingularity` when `F_t` is not positive-definite or the
    ///   recursion produces non-finite values.
    /// - Any error returned by the dynamics provider.
    pub fn run<D: Dynamics + ?Sized>(
        &self, observations: ArrayView2<f64>, dynamics: &D, params: &ParamSet,
        covariates: Option<ArrayView2<f64>>, carry0: &Carry,
    ) -> KalmanResult<FilterOutput> {
        let (n, p) = observations.dim();
        if n == 0 || p == 0 {
            return Err(KalmanError::EmptyObservations);
        }
        let k = carry0.a.len();
        if k == 0 || carry0.p.dim() != (k, k) {
            return Err(KalmanError::ShapeMismatch {
                step: 0,
                matrix: "P",
                expected: (k, k),
                found: carry0.p.dim(),
            });
        }

        let replay = self.mode == FilterMode::Replay;
        let mut a = carry0.a.clone();
        let mut cov = carry0.p.clone();
        let mut dims: Option<ModelDims> = None;
        let mut records: Vec<StepRecord> = Vec::with_capacity(n);

        for (t, y) in observations.outer_iter().enumerate() {
            let system = {
                let ctx = StepContext {
                    index: t,
                    covariates: covariates.as_ref().map(|c| c.view()),
                    previous: records.last().map(|r| &r.system),
                    replay,
                };
                dynamics.system(y, a.view(), cov.view(), params, &ctx)?
            };
            let step_dims = *dims.get_or_insert(ModelDims { p, k, m: system.q.nrows() });
            system.validate(&step_dims, t)?;

            let record = self.step(t, y, &a, &cov, system)?;
            a.assign(&record.state);
            cov.assign(&record.covariance);
            records.push(record);
        }

        let dims = dims.ok_or(KalmanError::EmptyObservations)?;
        Ok(FilterOutput::new(records, dims))
    }

    fn step(
        &self, t: usize, y: ArrayView1<f64>, a: &Array1<f64>, cov: &Array2<f64>,
        system: SystemMatrices,
    ) -> KalmanResult<StepRecord> {
        let singular = |matrix: &'static str| KalmanError::NumericalSingularity { step: t, matrix };

        let za = system.z.dot(a);
        let innovation: Array1<f64> =
            Zip::from(&y).and(&za).map_collect(|&yi, &zai| if yi.is_finite() { yi - zai } else { 0.0 });
        let n_observed = y.iter().filter(|v| v.is_finite()).count();

        let zp = system.z.dot(cov);
        let mut f = zp.dot(&system.z.t()) + &system.h;
        symmetrize(&mut f);
        let l = self.backend.cholesky(f.view()).ok_or_else(|| singular("F"))?;

        let w = self
            .backend
            .solve_lower(l.view(), innovation.view().insert_axis(Axis(1)))
            .ok_or_else(|| singular("F"))?;
        let quad: f64 = w.iter().map(|x| x * x).sum();
        let logdet = 2.0 * l.diag().iter().map(|d| d.ln()).sum::<f64>();

        let mut state = system.t.dot(a);
        let mut next_cov = system.t.dot(cov).dot(&system.t.t()) + system.state_noise_cov();
        let gain = match self.mode {
            FilterMode::Update => {
                let x = self.backend.solve_lower(l.view(), zp.view()).ok_or_else(|| singular("F"))?;
                let g = self
                    .backend
                    .solve_lower_transpose(l.view(), x.view())
                    .ok_or_else(|| singular("F"))?;
                let gain = system.t.dot(&g.t());
                state = state + gain.dot(&innovation);
                let half = system.t.dot(&x.t());
                next_cov = next_cov - half.dot(&half.t());
                gain
            }
            FilterMode::Replay => Array2::zeros((a.len(), y.len())),
        };
        symmetrize(&mut next_cov);

        if !state.iter().chain(next_cov.iter()).all(|v| v.is_finite()) {
            return Err(singular("P"));
        }

        Ok(StepRecord {
            state,
            covariance: next_cov,
            system,
            innovation,
            innovation_cov: f,
            gain,
            logdet,
            quad,
            n_observed,
        })
    }
}

/// In-place `(M + Mᵀ) / 2`.
fn symmetrize(m: &mut Array2<f64>) {
    let sym = (&*m + &m.t()) * 0.5;
    *m = sym;
}
