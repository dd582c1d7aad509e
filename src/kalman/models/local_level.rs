//! local_level — random walk plus noise, observed by one or more series.
//!
//! `y_t = 1_p μ_t + ε_t`, `ε_t ~ N(0, h I_p)`; `μ_{t+1} = μ_t + η_t`,
//! `η_t ~ N(0, q)`. Missing entries of `y_t` are masked, so any subset of the
//! series may be absent at a step.
//!
//! Parameters are the scalars `"h"` and `"q"`; both are strictly positive and
//! reach the optimizer through `θ = [softplus⁻¹(h), softplus⁻¹(q)]`.
use crate::{
    kalman::{
        core::{
            carry::Carry,
            dynamics::{Dynamics, StepContext},
            params::ParamSet,
            system::{SystemMatrices, mask_missing_rows},
        },
        errors::{KalmanError, KalmanResult},
    },
    optimization::{
        loglik_optimizer::Theta,
        numerical_stability::transformations::{safe_softplus, safe_softplus_inv},
    },
};
use ndarray::{Array2, ArrayView1, ArrayView2, array};

/// Local level model for `n_series` observed series sharing one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalLevel {
    n_series: usize,
}

impl LocalLevel {
    pub fn new(n_series: usize) -> Self {
        Self { n_series }
    }

    pub fn n_series(&self) -> usize {
        self.n_series
    }

    /// Parameter set with observation variance `h` and level variance `q`.
    pub fn params(h: f64, q: f64) -> ParamSet {
        ParamSet::new().with_scalar("h", h).with_scalar("q", q)
    }

    /// Carry with level `a0` and variance `p0`.
    pub fn initial_carry(a0: f64, p0: f64) -> KalmanResult<Carry> {
        Carry::new(array![a0], array![[p0]])
    }

    /// `θ ↦ {h, q}` through softplus.
    pub fn link(&self, theta: &Theta) -> KalmanResult<ParamSet> {
        if theta.len() != 2 {
            return Err(KalmanError::ThetaLengthMismatch { expected: 2, found: theta.len() });
        }
        Ok(Self::params(safe_softplus(theta[0]), safe_softplus(theta[1])))
    }

    /// `{h, q} ↦ θ`.
    ///
    /// # Errors
    /// - `MissingParameter` / `ParameterKindMismatch` for a malformed set.
    /// - `ParameterOutOfDomain` when `h` or `q` is not strictly positive.
    pub fn unlink(&self, params: &ParamSet) -> KalmanResult<Theta> {
        let h = positive(params, "h")?;
        let q = positive(params, "q")?;
        Ok(array![safe_softplus_inv(h), safe_softplus_inv(q)])
    }
}

impl Dynamics for LocalLevel {
    fn system(
        &self, y: ArrayView1<f64>, _a: ArrayView1<f64>, _p: ArrayView2<f64>, params: &ParamSet,
        _ctx: &StepContext<'_>,
    ) -> KalmanResult<SystemMatrices> {
        let h = params.scalar("h")?;
        let q = params.scalar("q")?;
        let mut z = Array2::ones((self.n_series, 1));
        let mut obs_cov = Array2::eye(self.n_series) * h;
        mask_missing_rows(&mut z, &mut obs_cov, y);
        Ok(SystemMatrices::new(z, array![[1.0]], obs_cov, array![[1.0]], array![[q]]))
    }
}

/// Read a scalar that must be finite and `> 0`.
pub(crate) fn positive(params: &ParamSet, name: &str) -> KalmanResult<f64> {
    let value = params.scalar(name)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(KalmanError::ParameterOutOfDomain {
            name: name.to_string(),
            value,
            reason: "must be finite and strictly positive",
        })
    }
}
