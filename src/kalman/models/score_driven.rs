//! score_driven — regression with score-driven time-varying coefficients.
//!
//! Purpose
//! -------
//! Cross-sections of `p` observations share `r` coefficients `β_t` that move
//! with the scaled score of the previous prediction error:
//!
//! ```text
//! y_t     = M_t β_t + ε_t,                    ε_t ~ N(0, h I_p)
//! v_t     = y_t − M_t β_t
//! s_t     = α (M_tᵀ M_t)⁻¹ M_tᵀ v_t
//! β_{t+1} = (I − B) β̄ + B β_t + s_t,          B = diag(φ)
//! ```
//!
//! Key behaviors
//! -------------
//! - The state is augmented with a constant, `α_t = [β_t; 1]`, so the
//!   intercept `(I − B) β̄ + s_t` is the last column of `T_t`. The
//!   transition is deterministic: `R = 0`, `Q = 0` (`m = 1`) and the carry
//!   covariance is zero, hence `K_t = 0` and the filter follows the
//!   recursion above exactly while `F_t = H`.
//! - `M_t` is rows `[t·p, (t+1)·p)` of the covariate panel.
//! - Missing entries of `y_t` drop their rows from both the score and the
//!   likelihood. With fewer observed rows than regressors, and in replay
//!   mode, the score is zero.
//!
//! Conventions
//! -----------
//! - Parameters: `"phi"` (vector, entries in `(0, 1)`), `"beta_bar"`
//!   (vector), `"alpha"` and `"h"` (positive scalars).
//! - `θ = [logit φ, β̄, softplus⁻¹ α, softplus⁻¹ h]`, length `2r + 2`.
use crate::{
    kalman::{
        core::{
            carry::Carry,
            dynamics::{Dynamics, StepContext},
            linalg::{LinalgBackend, NalgebraBackend},
            params::ParamSet,
            system::{SystemMatrices, mask_missing_rows},
        },
        errors::{KalmanError, KalmanResult},
        models::local_level::positive,
    },
    optimization::{
        loglik_optimizer::Theta,
        numerical_stability::transformations::{
            safe_logistic, safe_logit, safe_softplus, safe_softplus_inv,
        },
    },
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};

/// Score-driven regression over `n_series` observations and `n_regressors`
/// coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreDrivenRegression<B: LinalgBackend = NalgebraBackend> {
    n_series: usize,
    n_regressors: usize,
    backend: B,
}

impl ScoreDrivenRegression<NalgebraBackend> {
    pub fn new(n_series: usize, n_regressors: usize) -> Self {
        Self::with_backend(n_series, n_regressors, NalgebraBackend)
    }

    pub fn params(phi: Array1<f64>, beta_bar: Array1<f64>, alpha: f64, h: f64) -> ParamSet {
        ParamSet::new()
            .with_vector("phi", phi)
            .with_vector("beta_bar", beta_bar)
            .with_scalar("alpha", alpha)
            .with_scalar("h", h)
    }
}

impl<B: LinalgBackend> ScoreDrivenRegression<B> {
    pub fn with_backend(n_series: usize, n_regressors: usize, backend: B) -> Self {
        Self { n_series, n_regressors, backend }
    }

    pub fn n_series(&self) -> usize {
        self.n_series
    }

    pub fn n_regressors(&self) -> usize {
        self.n_regressors
    }

    /// State dimension `r + 1`.
    pub fn state_dim(&self) -> usize {
        self.n_regressors + 1
    }

    /// Carry `a = [β_0; 1]`, `P = 0`.
    pub fn initial_carry(&self, beta0: &Array1<f64>) -> KalmanResult<Carry> {
        self.check_len("beta0", beta0.len(), 0)?;
        let k = self.state_dim();
        let mut a = Array1::ones(k);
        a.slice_mut(s![..self.n_regressors]).assign(beta0);
        Carry::new(a, Array2::zeros((k, k)))
    }

    pub fn link(&self, theta: &Theta) -> KalmanResult<ParamSet> {
        let r = self.n_regressors;
        if theta.len() != 2 * r + 2 {
            return Err(KalmanError::ThetaLengthMismatch { expected: 2 * r + 2, found: theta.len() });
        }
        Ok(ScoreDrivenRegression::params(
            theta.slice(s![..r]).mapv(safe_logistic),
            theta.slice(s![r..2 * r]).to_owned(),
            safe_softplus(theta[2 * r]),
            safe_softplus(theta[2 * r + 1]),
        ))
    }

    /// # Errors
    /// - `ParameterOutOfDomain` when an entry of `phi` is outside `(0, 1)` or
    ///   `alpha`/`h` is not strictly positive.
    /// - `ShapeMismatch` when a vector does not have `r` entries.
    pub fn unlink(&self, params: &ParamSet) -> KalmanResult<Theta> {
        let phi = params.vector("phi")?;
        let beta_bar = params.vector("beta_bar")?;
        self.check_len("phi", phi.len(), 0)?;
        self.check_len("beta_bar", beta_bar.len(), 0)?;
        if let Some(&bad) = phi.iter().find(|v| !(v.is_finite() && **v > 0.0 && **v < 1.0)) {
            return Err(KalmanError::ParameterOutOfDomain {
                name: "phi".to_string(),
                value: bad,
                reason: "entries must lie in (0, 1)",
            });
        }
        let alpha = positive(params, "alpha")?;
        let h = positive(params, "h")?;

        let mut theta = Vec::with_capacity(2 * self.n_regressors + 2);
        theta.extend(phi.iter().map(|&v| safe_logit(v)));
        theta.extend(beta_bar.iter().copied());
        theta.push(safe_softplus_inv(alpha));
        theta.push(safe_softplus_inv(h));
        Ok(Array1::from(theta))
    }

    /// Scaled score `α (MᵀM)⁻¹ Mᵀ v` over the observed rows of `y`.
    fn score(
        &self, y: ArrayView1<f64>, m: ArrayView2<f64>, beta: ArrayView1<f64>, alpha: f64,
        ctx: &StepContext<'_>,
    ) -> KalmanResult<Array1<f64>> {
        let r = self.n_regressors;
        let n_observed = y.iter().filter(|v| v.is_finite()).count();
        if ctx.replay || n_observed < r {
            return Ok(Array1::zeros(r));
        }

        let fitted = m.dot(&beta);
        let mut m_obs = m.to_owned();
        let mut v = Array1::zeros(y.len());
        for (i, &yi) in y.iter().enumerate() {
            if yi.is_finite() {
                v[i] = yi - fitted[i];
            } else {
                m_obs.row_mut(i).fill(0.0);
            }
        }
        let gram = m_obs.t().dot(&m_obs);
        let rhs = m_obs.t().dot(&v).insert_axis(Axis(1));
        let x = self
            .backend
            .solve_spd(gram.view(), rhs.view())
            .ok_or(KalmanError::NumericalSingularity { step: ctx.index, matrix: "M'M" })?;
        Ok(x.column(0).mapv(|xi| alpha * xi))
    }

    fn check_len(&self, name: &'static str, found: usize, step: usize) -> KalmanResult<()> {
        if found == self.n_regressors {
            Ok(())
        } else {
            Err(KalmanError::ShapeMismatch {
                step,
                matrix: name,
                expected: (self.n_regressors, 1),
                found: (found, 1),
            })
        }
    }
}

impl<B: LinalgBackend> Dynamics for ScoreDrivenRegression<B> {
    fn system(
        &self, y: ArrayView1<f64>, a: ArrayView1<f64>, _p: ArrayView2<f64>, params: &ParamSet,
        ctx: &StepContext<'_>,
    ) -> KalmanResult<SystemMatrices> {
        let (p, r, k) = (self.n_series, self.n_regressors, self.state_dim());
        let phi = params.vector("phi")?;
        let beta_bar = params.vector("beta_bar")?;
        let alpha = params.scalar("alpha")?;
        let h = params.scalar("h")?;
        self.check_len("phi", phi.len(), ctx.index)?;
        self.check_len("beta_bar", beta_bar.len(), ctx.index)?;
        if a.len() != k {
            return Err(KalmanError::ShapeMismatch {
                step: ctx.index,
                matrix: "a",
                expected: (k, 1),
                found: (a.len(), 1),
            });
        }

        let m = ctx.covariate_rows(p)?;
        if m.dim() != (p, r) {
            return Err(KalmanError::ShapeMismatch {
                step: ctx.index,
                matrix: "covariates",
                expected: (p, r),
                found: m.dim(),
            });
        }

        let beta = a.slice(s![..r]);
        let score = self.score(y, m, beta, alpha, ctx)?;

        let mut t = Array2::zeros((k, k));
        for i in 0..r {
            t[[i, i]] = phi[i];
            t[[i, r]] = (1.0 - phi[i]) * beta_bar[i] + score[i];
        }
        t[[r, r]] = 1.0;

        let mut z = Array2::zeros((p, k));
        z.slice_mut(s![.., ..r]).assign(&m);
        let mut obs_cov = Array2::eye(p) * h;
        mask_missing_rows(&mut z, &mut obs_cov, y);

        Ok(SystemMatrices::new(z, t, obs_cov, Array2::zeros((k, 1)), Array2::zeros((1, 1))))
    }
}
