use crate::covariance_functions::CovarianceFunction;
use crate::errors::{GpError, Result};
use linfa::{Float, ParamGuard};

/// A set of validated GP parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct GpValidParams<F: Float, Cov: CovarianceFunction<F>> {
    /// Covariance function `k(x, x')` of the zero mean prior
    pub(crate) cov: Cov,
    /// Observation noise variance added to the training covariance diagonal
    pub(crate) nugget: F,
}

impl<F: Float, Cov: CovarianceFunction<F> + Default> Default for GpValidParams<F, Cov> {
    fn default() -> GpValidParams<F, Cov> {
        GpValidParams {
            cov: Cov::default(),
            nugget: F::cast(100.0) * F::epsilon(),
        }
    }
}

impl<F: Float, Cov: CovarianceFunction<F>> GpValidParams<F, Cov> {
    /// Get covariance function k(x, x')
    pub fn cov(&self) -> &Cov {
        &self.cov
    }

    /// Get nugget
    pub fn nugget(&self) -> F {
        self.nugget
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [GP algorithm](struct.GaussianProcess.html).
pub struct GpParams<F: Float, Cov: CovarianceFunction<F>>(GpValidParams<F, Cov>);

impl<F: Float, Cov: CovarianceFunction<F>> GpParams<F, Cov> {
    /// A constructor for GP parameters given a covariance function
    pub fn new(cov: Cov) -> GpParams<F, Cov> {
        Self(GpValidParams {
            cov,
            nugget: F::cast(100.0) * F::epsilon(),
        })
    }

    /// Set covariance function.
    pub fn cov(mut self, cov: Cov) -> Self {
        self.0.cov = cov;
        self
    }

    /// Set nugget.
    ///
    /// Nugget is the observation noise variance, it also improves numerical stability
    pub fn nugget(mut self, nugget: F) -> Self {
        self.0.nugget = nugget;
        self
    }
}

impl<F: Float, Cov: CovarianceFunction<F>> From<GpValidParams<F, Cov>> for GpParams<F, Cov> {
    fn from(valid: GpValidParams<F, Cov>) -> Self {
        GpParams(valid)
    }
}

impl<F: Float, Cov: CovarianceFunction<F>> ParamGuard for GpParams<F, Cov> {
    type Checked = GpValidParams<F, Cov>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let nugget = self.0.nugget;
        if !nugget.is_finite() || nugget < F::zero() {
            return Err(GpError::InvalidValueError(format!(
                "`nugget` should be a finite non negative value, got {}",
                nugget
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covariance_functions::SquaredExponential;

    #[test]
    fn test_gp_params_check() {
        let params = GpParams::new(SquaredExponential::new(1., 1.)).nugget(1e-6);
        let valid = params.check().expect("valid params");
        assert_eq!(valid.nugget(), 1e-6);

        let params = GpParams::new(SquaredExponential::new(1., 1.)).nugget(-1.);
        assert!(matches!(
            params.check_ref(),
            Err(GpError::InvalidValueError(_))
        ));
        let params = GpParams::new(SquaredExponential::new(1., 1.)).nugget(f64::NAN);
        assert!(params.check().is_err());
    }
}
