//! loglik_optimizer::types — numeric aliases, solver defaults and line-search
//! types.
//!
//! `Theta` and `Grad` are the unconstrained parameter and gradient vectors,
//! `Hessian` is `θ.len() × θ.len()`, and `Cost` is `-ℓ(θ)`. The line-search
//! aliases fix argmin's generics to these shapes; the backtracking alias also
//! fixes the Armijo sufficient-decrease condition.
use argmin::solver::{
    linesearch::{
        BacktrackingLineSearch, HagerZhangLineSearch, MoreThuenteLineSearch,
        condition::ArmijoCondition,
    },
    quasinewton::LBFGS,
};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Unconstrained parameter vector `θ`.
pub type Theta = Array1<f64>;

/// `∇ℓ(θ)` or `∇c(θ)`, same length as `Theta`.
pub type Grad = Array1<f64>;

pub type Hessian = Array2<f64>;

pub type Cost = f64;

/// Evaluation counters reported by argmin (`"cost_count"`, `"gradient_count"`).
pub type FnEvalMap = HashMap<String, u64>;

/// Default history size (`m`) for L-BFGS runs.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// Sufficient-decrease constant `c₁` for the Armijo condition.
pub const DEFAULT_ARMIJO_C: f64 = 1e-4;

/// Step contraction factor used by the backtracking line search.
pub const DEFAULT_BACKTRACK_RHO: f64 = 0.5;

/// Hager–Zhang line search specialized to this crate’s numeric types.
pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

/// More–Thuente line search specialized to this crate’s numeric types.
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

/// Armijo backtracking line search specialized to this crate’s numeric types.
///
/// Only the trial cost is inspected, so infinite costs at rejected proposals
/// simply shrink the step.
pub type BacktrackingLS = BacktrackingLineSearch<Theta, Grad, ArmijoCondition<Cost>, Cost>;

/// L-BFGS over this crate's numeric types, generic in the line search.
pub type Lbfgs<L> = LBFGS<L, Theta, Grad, Cost>;
