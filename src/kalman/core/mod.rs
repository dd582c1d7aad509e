//! core — the filtering engine and its building blocks.
//!
//! Purpose
//! -------
//! Hold everything a single filter pass needs: the linear-algebra backend,
//! system matrices and dimensions, the carry, parameters, the dynamics
//! interface, step records, the recursion itself and the likelihood
//! reduction, plus the option structs used by the estimator and simulator.
//!
//! Downstream usage
//! ----------------
//! - `kalman::estimator` wraps [`filter::FilterEngine`] inside the optimizer.
//! - `kalman::simulator` replays the engine in [`filter::FilterMode::Replay`].
//! - Model code implements [`dynamics::Dynamics`].

pub mod carry;
pub mod dynamics;
pub mod filter;
pub mod likelihood;
pub mod linalg;
pub mod options;
pub mod params;
pub mod record;
pub mod system;
