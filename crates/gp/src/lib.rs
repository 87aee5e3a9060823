//! This library implements zero mean [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) regression
//! for arbitrary covariance functions.
//!
//! GP methods are implemented by [GaussianProcess] parameterized by [GpParams].
//! The training covariance is factorized once at fit time with a symmetric
//! decomposition [Ldlt] (computed with `faer`) which is kept by the fitted model so that
//! other algorithms can reuse it to solve systems against it.
//!
//! Predictions are returned as values, variances or as gaussian [Distribution]s,
//! either joint (dense covariance) or marginal (variances only).
//!
//! Covariance functions are implemented in [covariance_functions] module.
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
pub mod covariance_functions;
mod distribution;
mod errors;
mod linalg;

mod parameters;
mod utils;

pub use algorithm::*;
pub use covariance_functions::*;
pub use distribution::*;
pub use errors::*;
pub use linalg::Ldlt;
pub use parameters::*;
pub use utils::{covariance_matrix, symmetric_covariance_matrix};
