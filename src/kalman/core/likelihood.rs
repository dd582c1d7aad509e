//! likelihood — reduction of step records into a Gaussian log-likelihood.
//!
//! `ℓ = -0.5 Σ_t (ln det F_t + v_tᵀ F_t⁻¹ v_t)`. The `2π` normalizing constant
//! does not depend on parameters and is omitted by [`loglikelihood`]; use
//! [`loglikelihood_with_constant`] when absolute values matter (information
//! criteria, comparisons across data sets).
use crate::kalman::core::record::StepRecord;
use ndarray::Array1;
use std::f64::consts::PI;

/// Sum of per-step contributions, constant omitted.
pub fn loglikelihood(records: &[StepRecord]) -> f64 {
    records.iter().map(StepRecord::loglik_term).sum()
}

/// Per-step contributions `-0.5 (logdet_t + quad_t)`.
pub fn loglikelihood_terms(records: &[StepRecord]) -> Array1<f64> {
    records.iter().map(StepRecord::loglik_term).collect()
}

/// Log-likelihood including `-0.5 · Σ_t n_observed_t · ln 2π`.
pub fn loglikelihood_with_constant(records: &[StepRecord]) -> f64 {
    let n_obs: usize = records.iter().map(|r| r.n_observed).sum();
    loglikelihood(records) - 0.5 * n_obs as f64 * (2.0 * PI).ln()
}
