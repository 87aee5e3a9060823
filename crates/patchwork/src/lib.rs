//! This library implements Patchwork Kriging, a [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process)
//! regression scaling to large datasets by partitioning the input space.
//!
//! Training points are split in groups by user provided [PatchworkFunctions]
//! and an independent zero mean GP (see [patchbox_gp::GaussianProcess]) is fitted
//! on every group. Predictions of neighbouring groups are stitched together by
//! constraining the group processes to agree at boundary locations, which
//! removes the discontinuities a plain local GP approach exhibits between groups.
//!
//! The model is implemented by [PatchworkGaussianProcess] parameterized by
//! [PatchworkParams]. Grouping functions are either given by closures through
//! [FnPatchworkFunctions] or by a ready made strategy like [IntervalFunctions].
//!
//! ```no_run
//! use patchbox_gp::Matern52;
//! use patchbox_patchwork::{FnPatchworkFunctions, PatchworkGaussianProcess};
//! use linfa::prelude::*;
//! use ndarray::{array, Array, Axis};
//!
//! let xt = Array::linspace(-2., 2., 40).insert_axis(Axis(1));
//! let yt = xt.column(0).mapv(|v: f64| v.abs().sqrt());
//!
//! let functions = FnPatchworkFunctions::<f64, bool>::builder()
//!     .group(|x| x[0] >= 0.)
//!     .boundary(|_, _| array![[0.]])
//!     .nearest_group(|_, q| *q)
//!     .build()
//!     .expect("grouping functions");
//!
//! let model = PatchworkGaussianProcess::params(Matern52::new(0.5, 1.), functions)
//!     .nugget(1e-8)
//!     .fit(&Dataset::new(xt, yt))
//!     .expect("Patchwork GP fitted");
//! let marginal = model
//!     .predict_marginal(&array![[-0.1], [0.1]])
//!     .expect("Patchwork GP prediction");
//! println!("mean = {}, variances = {:?}", marginal.mean, marginal.covariance);
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
mod block;
mod boundary;
mod dispatch;
mod errors;
mod features;
mod functions;
mod grouped;
mod parameters;

pub use algorithm::*;
pub use block::*;
pub use boundary::*;
pub use dispatch::*;
pub use errors::*;
pub use features::*;
pub use functions::*;
pub use grouped::*;
pub use parameters::*;
