//! models — reference dynamics providers.
//!
//! Two ready-made [`Dynamics`](crate::kalman::core::dynamics::Dynamics)
//! implementations, each with the link/unlink pair that maps its constrained
//! parameters to the optimizer's unconstrained vector:
//!
//! - [`LocalLevel`]: random walk plus noise observed by `p` series.
//! - [`ScoreDrivenRegression`]: regression whose coefficients follow the
//!   scaled score of the prediction error (a Gaussian GAS model).
//!
//! Link closures are built from the model methods, e.g.
//! `let link = |theta: &Theta| model.link(theta);`.

pub mod local_level;
pub mod score_driven;

pub use self::local_level::LocalLevel;
pub use self::score_driven::ScoreDrivenRegression;
