//! dynamics — the interface between the filter and a concrete model.
//!
//! Purpose
//! -------
//! Define the single canonical signature through which the filter obtains
//! the system matrices for each step: [`Dynamics::system`] receives the
//! current observation, the *pre-update* predicted state and covariance, the
//! parameter set, and a [`StepContext`] carrying the step index plus the
//! optional extras some models need (covariates, previous step's matrices).
//!
//! Key behaviors
//! -------------
//! - Score-driven models read the predicted state and the observation to
//!   build a transition that depends on the current prediction error.
//! - Regression-type models slice their covariate rows with
//!   [`StepContext::covariate_rows`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Implementations are pure: no side effects, no interior mutability
//!   observed across calls. The filter may call a provider many times with
//!   different parameter sets during estimation.
//! - Returned matrices must have the same shapes at every step of a run.
//! - Missing observation entries (non-finite) should be handled with
//!   [`mask_missing_rows`](super::system::mask_missing_rows).
use crate::kalman::{
    core::{params::ParamSet, system::SystemMatrices},
    errors::{KalmanError, KalmanResult},
};
use ndarray::{ArrayView1, ArrayView2, s};

/// Per-step context handed to a dynamics provider.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// 0-based step index (row of the observation panel).
    pub index: usize,
    /// Exogenous covariate panel for the whole run, if any.
    pub covariates: Option<ArrayView2<'a, f64>>,
    /// System matrices produced at the previous step (`None` at step 0).
    pub previous: Option<&'a SystemMatrices>,
    /// `true` when the observations are placeholders (simulation replay);
    /// providers must not extract information from `y` in that case.
    pub replay: bool,
}

impl<'a> StepContext<'a> {
    /// Rows `[index·rows_per_step, (index+1)·rows_per_step)` of the
    /// covariate panel.
    ///
    /// # Errors
    /// - `MissingCovariates` if no panel was supplied.
    /// - `CovariateRowsOutOfRange` if the panel is too short.
    pub fn covariate_rows(&self, rows_per_step: usize) -> KalmanResult<ArrayView2<'a, f64>> {
        let covariates = self.covariates.ok_or(KalmanError::MissingCovariates)?;
        let start = self.index * rows_per_step;
        let end = start + rows_per_step;
        if end > covariates.nrows() {
            return Err(KalmanError::CovariateRowsOutOfRange {
                step: self.index,
                needed: end,
                available: covariates.nrows(),
            });
        }
        Ok(covariates.slice_move(s![start..end, ..]))
    }
}

/// A model's per-step system-matrix provider.
pub trait Dynamics {
    /// Produce `(Z_t, T_t, H_t, R_t, Q_t)` for the step described by `ctx`.
    ///
    /// `a` and `p` are the predicted state and covariance *before* the
    /// step's observation is absorbed.
    fn system(
        &self, y: ArrayView1<f64>, a: ArrayView1<f64>, p: ArrayView2<f64>, params: &ParamSet,
        ctx: &StepContext<'_>,
    ) -> KalmanResult<SystemMatrices>;
}

impl<D: Dynamics + ?Sized> Dynamics for &D {
    fn system(
        &self, y: ArrayView1<f64>, a: ArrayView1<f64>, p: ArrayView2<f64>, params: &ParamSet,
        ctx: &StepContext<'_>,
    ) -> KalmanResult<SystemMatrices> {
        (**self).system(y, a, p, params, ctx)
    }
}
