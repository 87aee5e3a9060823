//! Gaussian distributions returned by predictions.
//!
//! A [Distribution] holds a mean vector and an optional covariance whose
//! representation is either a dense matrix ([JointDistribution]) or a vector
//! of variances ([MarginalDistribution]). Comparing a joint with a marginal
//! distribution does not type check.

use crate::errors::{GpError, Result};
use linfa::Float;
use ndarray::{Array1, Array2, Axis};

/// A gaussian distribution given by its mean and an optional covariance of type `C`
#[derive(Clone, Debug, PartialEq)]
pub struct Distribution<F: Float, C> {
    /// Mean vector
    pub mean: Array1<F>,
    /// Covariance, absent when only the mean was requested
    pub covariance: Option<C>,
}

/// Distribution with a dense covariance matrix
pub type JointDistribution<F> = Distribution<F, Array2<F>>;
/// Distribution with a diagonal covariance stored as variances
pub type MarginalDistribution<F> = Distribution<F, Array1<F>>;

/// Covariance representations usable in a [Distribution]
pub trait CovarianceRepr<F: Float>: Clone {
    /// Number of variables described by the covariance,
    /// `None` if the representation is inconsistent (ie a non square matrix)
    fn size(&self) -> Option<usize>;
    /// Variance of the `i`-th variable
    fn variance(&self, i: usize) -> F;
    /// Covariance restricted to the given variables
    fn subset(&self, indices: &[usize]) -> Self;
}

impl<F: Float> CovarianceRepr<F> for Array2<F> {
    fn size(&self) -> Option<usize> {
        (self.nrows() == self.ncols()).then_some(self.nrows())
    }

    fn variance(&self, i: usize) -> F {
        self[[i, i]]
    }

    fn subset(&self, indices: &[usize]) -> Self {
        self.select(Axis(0), indices).select(Axis(1), indices)
    }
}

impl<F: Float> CovarianceRepr<F> for Array1<F> {
    fn size(&self) -> Option<usize> {
        Some(self.len())
    }

    fn variance(&self, i: usize) -> F {
        self[i]
    }

    fn subset(&self, indices: &[usize]) -> Self {
        self.select(Axis(0), indices)
    }
}

impl<F: Float, C: CovarianceRepr<F>> Distribution<F, C> {
    /// A distribution with a mean only
    pub fn new(mean: Array1<F>) -> Self {
        Distribution {
            mean,
            covariance: None,
        }
    }

    /// A distribution with mean and covariance
    ///
    /// # Errors
    ///
    /// [GpError::ShapeMismatch] when the covariance size does not match the mean length
    pub fn with_covariance(mean: Array1<F>, covariance: C) -> Result<Self> {
        let dist = Distribution {
            mean,
            covariance: Some(covariance),
        };
        dist.size()?;
        Ok(dist)
    }

    /// Number of variables, checking the covariance is consistent with the mean
    pub fn size(&self) -> Result<usize> {
        if let Some(cov) = &self.covariance {
            match cov.size() {
                Some(n) if n == self.mean.len() => {}
                Some(n) => {
                    return Err(GpError::ShapeMismatch(format!(
                        "covariance of size {} for a mean of size {}",
                        n,
                        self.mean.len()
                    )))
                }
                None => {
                    return Err(GpError::ShapeMismatch(
                        "covariance matrix is not square".to_string(),
                    ))
                }
            }
        }
        Ok(self.mean.len())
    }

    /// Whether a covariance is attached
    pub fn has_covariance(&self) -> bool {
        self.covariance.is_some()
    }

    /// Variance of the `i`-th variable if a covariance is attached
    pub fn get_diagonal(&self, i: usize) -> Option<F> {
        self.covariance.as_ref().map(|c| c.variance(i))
    }

    /// Distribution of the given subset of variables, in the order of `indices`
    pub fn subset(&self, indices: &[usize]) -> Self {
        Distribution {
            mean: self.mean.select(Axis(0), indices),
            covariance: self.covariance.as_ref().map(|c| c.subset(indices)),
        }
    }
}

impl<F: Float> JointDistribution<F> {
    /// Drop the correlations keeping the variances
    pub fn marginal(&self) -> MarginalDistribution<F> {
        Distribution {
            mean: self.mean.clone(),
            covariance: self.covariance.as_ref().map(|c| c.diag().to_owned()),
        }
    }
}
