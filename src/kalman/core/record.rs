//! record — typed per-step snapshots and the filter's output sequence.
//!
//! Each [`StepRecord`] is created once after a recursion step and never
//! mutated. [`FilterOutput`] owns the ordered records plus the run's
//! [`ModelDims`] and offers stacked views for downstream consumers.
use crate::kalman::core::{
    carry::Carry,
    likelihood,
    system::{ModelDims, SystemMatrices},
};
use ndarray::{Array1, Array2};

/// Snapshot taken after one predict/update step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// Next predicted state `a_{t+1} = T a_t + K v_t`.
    pub state: Array1<f64>,
    /// Next predicted covariance `P_{t+1}`.
    pub covariance: Array2<f64>,
    /// Matrices returned by the dynamics provider for this step.
    pub system: SystemMatrices,
    /// Innovation `v_t` (zero in missing components).
    pub innovation: Array1<f64>,
    /// Innovation covariance `F_t`.
    pub innovation_cov: Array2<f64>,
    /// Gain `K_t = T_t P_t Z_tᵀ F_t⁻¹` (`k×p`; zero in replay mode).
    pub gain: Array2<f64>,
    /// `ln det F_t`.
    pub logdet: f64,
    /// `v_tᵀ F_t⁻¹ v_t`.
    pub quad: f64,
    /// Number of finite entries in `y_t`.
    pub n_observed: usize,
}

impl StepRecord {
    /// Log-likelihood contribution `-0.5 (logdet + quad)`.
    pub fn loglik_term(&self) -> f64 {
        -0.5 * (self.logdet + self.quad)
    }
}

/// Ordered step records of one filter run.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutput {
    records: Vec<StepRecord>,
    dims: ModelDims,
}

impl FilterOutput {
    pub(crate) fn new(records: Vec<StepRecord>, dims: ModelDims) -> Self {
        Self { records, dims }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&StepRecord> {
        self.records.last()
    }

    pub fn dims(&self) -> ModelDims {
        self.dims
    }

    /// Terminal `(a, P)` pair, i.e. the carry a continuation would start from.
    pub fn terminal_carry(&self) -> Option<Carry> {
        self.last().map(|r| Carry { a: r.state.clone(), p: r.covariance.clone() })
    }

    /// States stacked as an `n×k` matrix.
    pub fn states(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.len(), self.dims.k), |(t, j)| self.records[t].state[j])
    }

    /// Innovations stacked as an `n×p` matrix.
    pub fn innovations(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.len(), self.dims.p), |(t, j)| self.records[t].innovation[j])
    }

    /// Gaussian log-likelihood without the `2π` constant.
    pub fn loglikelihood(&self) -> f64 {
        likelihood::loglikelihood(&self.records)
    }

    /// Gaussian log-likelihood including `-0.5 · n_obs · ln 2π`.
    pub fn loglikelihood_with_constant(&self) -> f64 {
        likelihood::loglikelihood_with_constant(&self.records)
    }

    /// Total number of observed scalar entries.
    pub fn n_observed(&self) -> usize {
        self.records.iter().map(|r| r.n_observed).sum()
    }
}
