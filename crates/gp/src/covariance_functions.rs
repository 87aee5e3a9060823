//! A module for covariance functions `k(x, x')` governing the GP prior.
//!
//! The following stationary covariance functions are implemented:
//! * squared exponential,
//! * exponential,
//! * matern 3/2,
//! * matern 5/2,
//! * constant.
//!
//! Covariance functions can be summed with [Additive].

use crate::utils::euclidean_distance;
use linfa::Float;
use ndarray::{ArrayBase, Data, Ix1};
use std::fmt;

/// A trait for using a covariance function in GP regression
pub trait CovarianceFunction<F: Float>: Clone + fmt::Display + Send + Sync {
    /// Compute the prior covariance `k(x, y)` between the two given features,
    /// `x` and `y` are expected to have the same number of components.
    fn call(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> F;
}

/// Squared exponential covariance function
///
/// `k(x, y) = sigma^2 * exp(-(|x - y| / length_scale)^2)`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SquaredExponential<F: Float> {
    /// Distance at which correlation has decreased to `exp(-1)`
    pub length_scale: F,
    /// Prior standard deviation of the process
    pub sigma: F,
}

impl<F: Float> SquaredExponential<F> {
    /// Constructor
    pub fn new(length_scale: F, sigma: F) -> Self {
        SquaredExponential {
            length_scale,
            sigma,
        }
    }
}

impl<F: Float> Default for SquaredExponential<F> {
    fn default() -> Self {
        Self::new(F::one(), F::one())
    }
}

impl<F: Float> CovarianceFunction<F> for SquaredExponential<F> {
    fn call(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> F {
        let r = euclidean_distance(x, y) / self.length_scale;
        self.sigma * self.sigma * F::exp(-r * r)
    }
}

impl<F: Float> fmt::Display for SquaredExponential<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SquaredExponential(length_scale={}, sigma={})",
            self.length_scale, self.sigma
        )
    }
}

/// Exponential covariance function
///
/// `k(x, y) = sigma^2 * exp(-|x - y| / length_scale)`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Exponential<F: Float> {
    /// Distance at which correlation has decreased to `exp(-1)`
    pub length_scale: F,
    /// Prior standard deviation of the process
    pub sigma: F,
}

impl<F: Float> Exponential<F> {
    /// Constructor
    pub fn new(length_scale: F, sigma: F) -> Self {
        Exponential {
            length_scale,
            sigma,
        }
    }
}

impl<F: Float> Default for Exponential<F> {
    fn default() -> Self {
        Self::new(F::one(), F::one())
    }
}

impl<F: Float> CovarianceFunction<F> for Exponential<F> {
    fn call(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> F {
        let r = euclidean_distance(x, y) / self.length_scale;
        self.sigma * self.sigma * F::exp(-r)
    }
}

impl<F: Float> fmt::Display for Exponential<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Exponential(length_scale={}, sigma={})",
            self.length_scale, self.sigma
        )
    }
}

/// Matern 3/2 covariance function
///
/// `k(x, y) = sigma^2 * (1 + sqrt(3) * r) * exp(-sqrt(3) * r)` with `r = |x - y| / length_scale`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matern32<F: Float> {
    /// Length scale of the process
    pub length_scale: F,
    /// Prior standard deviation of the process
    pub sigma: F,
}

impl<F: Float> Matern32<F> {
    /// Constructor
    pub fn new(length_scale: F, sigma: F) -> Self {
        Matern32 {
            length_scale,
            sigma,
        }
    }
}

impl<F: Float> Default for Matern32<F> {
    fn default() -> Self {
        Self::new(F::one(), F::one())
    }
}

impl<F: Float> CovarianceFunction<F> for Matern32<F> {
    fn call(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> F {
        let sqrt3_r = F::cast(3.).sqrt() * euclidean_distance(x, y) / self.length_scale;
        self.sigma * self.sigma * (F::one() + sqrt3_r) * F::exp(-sqrt3_r)
    }
}

impl<F: Float> fmt::Display for Matern32<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Matern32(length_scale={}, sigma={})",
            self.length_scale, self.sigma
        )
    }
}

/// Matern 5/2 covariance function
///
/// `k(x, y) = sigma^2 * (1 + sqrt(5) * r + 5 / 3 * r^2) * exp(-sqrt(5) * r)` with `r = |x - y| / length_scale`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matern52<F: Float> {
    /// Length scale of the process
    pub length_scale: F,
    /// Prior standard deviation of the process
    pub sigma: F,
}

impl<F: Float> Matern52<F> {
    /// Constructor
    pub fn new(length_scale: F, sigma: F) -> Self {
        Matern52 {
            length_scale,
            sigma,
        }
    }
}

impl<F: Float> Default for Matern52<F> {
    fn default() -> Self {
        Self::new(F::one(), F::one())
    }
}

impl<F: Float> CovarianceFunction<F> for Matern52<F> {
    fn call(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> F {
        let r = euclidean_distance(x, y) / self.length_scale;
        let sqrt5_r = F::cast(5.).sqrt() * r;
        self.sigma
            * self.sigma
            * (F::one() + sqrt5_r + F::cast(5. / 3.) * r * r)
            * F::exp(-sqrt5_r)
    }
}

impl<F: Float> fmt::Display for Matern52<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Matern52(length_scale={}, sigma={})",
            self.length_scale, self.sigma
        )
    }
}

/// Constant covariance function, models an unknown offset shared by all features
///
/// `k(x, y) = sigma^2`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Constant<F: Float> {
    /// Prior standard deviation of the offset
    pub sigma: F,
}

impl<F: Float> Constant<F> {
    /// Constructor
    pub fn new(sigma: F) -> Self {
        Constant { sigma }
    }
}

impl<F: Float> Default for Constant<F> {
    fn default() -> Self {
        Self::new(F::one())
    }
}

impl<F: Float> CovarianceFunction<F> for Constant<F> {
    fn call(
        &self,
        _x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        _y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> F {
        self.sigma * self.sigma
    }
}

impl<F: Float> fmt::Display for Constant<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Constant(sigma={})", self.sigma)
    }
}

/// Sum of two covariance functions `k(x, y) = k1(x, y) + k2(x, y)`
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Additive<A, B> {
    lhs: A,
    rhs: B,
}

impl<A, B> Additive<A, B> {
    /// Constructor
    pub fn new(lhs: A, rhs: B) -> Self {
        Additive { lhs, rhs }
    }
}

impl<F: Float, A: CovarianceFunction<F>, B: CovarianceFunction<F>> CovarianceFunction<F>
    for Additive<A, B>
{
    fn call(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> F {
        self.lhs.call(x, y) + self.rhs.call(x, y)
    }
}

impl<A: fmt::Display, B: fmt::Display> fmt::Display for Additive<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} + {}", self.lhs, self.rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use paste::paste;

    macro_rules! test_covariance {
        ($cov:ident) => {
            paste! {
                #[test]
                fn [<test_ $cov:snake _properties>]() {
                    let cov = $cov::new(0.7, 2.);
                    let x = array![0.1, -0.3];
                    let y = array![0.4, 0.2];
                    let z = array![1.4, 2.2];

                    assert_abs_diff_eq!(cov.call(&x, &x), 4., epsilon = 1e-12);
                    assert_abs_diff_eq!(cov.call(&x, &y), cov.call(&y, &x), epsilon = 1e-15);
                    assert!(cov.call(&x, &y) < cov.call(&x, &x));
                    assert!(cov.call(&x, &z) < cov.call(&x, &y));
                    assert!(cov.call(&x, &z) > 0.);
                }
            }
        };
    }

    test_covariance!(SquaredExponential);
    test_covariance!(Exponential);
    test_covariance!(Matern32);
    test_covariance!(Matern52);

    #[test]
    fn test_squared_exponential_value() {
        let cov = SquaredExponential::new(2., 1.5);
        let x = array![0.];
        let y = array![2.];
        assert_abs_diff_eq!(cov.call(&x, &y), 2.25 * f64::exp(-1.), epsilon = 1e-12);
    }

    #[test]
    fn test_additive() {
        let cov = Additive::new(Exponential::new(1., 1.), Constant::new(0.5));
        let x = array![0.];
        let y = array![1.];
        assert_abs_diff_eq!(cov.call(&x, &y), f64::exp(-1.) + 0.25, epsilon = 1e-12);
        assert_eq!(
            cov.to_string(),
            "Exponential(length_scale=1, sigma=1) + Constant(sigma=0.5)"
        );
    }
}
