//! adapter — presents a `LogLikelihood` to argmin as a cost to minimize.
//!
//! The cost is `c(θ) = -ℓ(θ)`. A log-likelihood of exactly `-∞` marks a
//! proposal the model rejects (a singular innovation covariance, a variance
//! outside its domain) and becomes `c = +∞`, which argmin's line searches
//! treat as a failed trial step. `NaN` and `+∞` are errors.
//!
//! Models without an analytic gradient are differenced through
//! [`cost_gradient`], which steps around rejected neighbours.
use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        finite_diff::cost_gradient,
        traits::LogLikelihood,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};

/// A log-likelihood and its data, seen by argmin as a minimization problem.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    f: &'a F,
    data: &'a F::Data,
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<'a, F: LogLikelihood> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        match self.f.value(theta, self.data)? {
            ll if ll == f64::NEG_INFINITY => Ok(f64::INFINITY),
            ll if ll.is_finite() => Ok(-ll),
            ll => Err(OptError::NonFiniteCost { value: ll }.into()),
        }
    }
}

impl<'a, F: LogLikelihood> Gradient for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// `-∇ℓ(θ)` when the model supplies `∇ℓ`, otherwise a numerical gradient
    /// of the cost.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, theta.len())?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => cost_gradient(&|t: &Theta| self.cost(t), theta),
            Err(err) => Err(err.into()),
        }
    }
}
